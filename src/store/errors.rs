// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

use crate::proto::errorpb;
use crate::proto::kvrpcpb;

/// Responses that can carry a region error. `region_error` takes the error
/// out of the response.
pub trait HasRegionError {
    fn region_error(&mut self) -> Option<errorpb::Error>;
}

/// Allows putting a region error back on a response type.
///
/// The retry driver takes the region error out to classify it; errors it does
/// not consume (the region-miss group) are re-attached so the operation
/// helper can apply its own disposition.
pub trait SetRegionError {
    fn set_region_error(&mut self, error: errorpb::Error);
}

/// Responses of raw operations, which report errors as a plain string.
pub trait HasErrorString {
    fn error_string(&mut self) -> Option<String>;
}

macro_rules! has_region_error {
    ($type:ident) => {
        impl HasRegionError for kvrpcpb::$type {
            fn region_error(&mut self) -> Option<errorpb::Error> {
                self.region_error.take()
            }
        }

        impl SetRegionError for kvrpcpb::$type {
            fn set_region_error(&mut self, error: errorpb::Error) {
                self.region_error = Some(error);
            }
        }
    };
}

has_region_error!(GetResponse);
has_region_error!(BatchGetResponse);
has_region_error!(ScanResponse);
has_region_error!(RawGetResponse);
has_region_error!(RawPutResponse);
has_region_error!(RawBatchPutResponse);
has_region_error!(RawDeleteResponse);
has_region_error!(RawScanResponse);

macro_rules! has_error_string {
    ($type:ident) => {
        impl HasErrorString for kvrpcpb::$type {
            fn error_string(&mut self) -> Option<String> {
                if self.error.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.error))
                }
            }
        }
    };
}

has_error_string!(RawGetResponse);
has_error_string!(RawPutResponse);
has_error_string!(RawBatchPutResponse);
has_error_string!(RawDeleteResponse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_error_take_and_set_round_trip() {
        let mut resp = kvrpcpb::GetResponse::default();
        assert!(resp.region_error().is_none());

        let e = errorpb::Error {
            message: "stale".to_owned(),
            ..Default::default()
        };
        resp.set_region_error(e.clone());
        assert_eq!(resp.region_error(), Some(e));
        assert!(resp.region_error().is_none());
    }

    #[test]
    fn error_string_is_none_for_empty() {
        let mut resp = kvrpcpb::RawPutResponse::default();
        assert!(resp.error_string().is_none());

        resp.error = "boom".to_owned();
        assert_eq!(resp.error_string().as_deref(), Some("boom"));
        assert!(resp.error_string().is_none());
    }
}
