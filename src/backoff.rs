// Copyright 2026 RangeKV Project Authors. Licensed under Apache-2.0.

//! Budgeted, per-category exponential backoff.
//!
//! A [`BackOffer`] is owned by the caller of one logical call and threaded
//! through every retry loop (including the lock resolver's), so the total
//! time spent sleeping is bounded by one budget.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use rand::thread_rng;
use rand::Rng;
use tokio::time::sleep;

use crate::Error;
use crate::Result;

/// The failure category a backoff sleep is charged to. Each category has its
/// own sleep schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffKind {
    /// Stale or missing routing; the cluster needs a moment to converge.
    RegionMiss,
    /// A read blocked on a transaction lock that did not resolve fully.
    TxnLockFast,
    /// An RPC failed at the transport level.
    Transport,
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackoffKind::RegionMiss => "regionMiss",
            BackoffKind::TxnLockFast => "txnLockFast",
            BackoffKind::Transport => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jitter {
    NoJitter,
    EqualJitter,
}

#[derive(Debug, Clone, Copy)]
struct BackoffFnCfg {
    base_ms: u64,
    cap_ms: u64,
    jitter: Jitter,
}

impl BackoffFnCfg {
    const fn new(base_ms: u64, cap_ms: u64, jitter: Jitter) -> Self {
        Self {
            base_ms,
            cap_ms,
            jitter,
        }
    }
}

const BO_REGION_MISS: BackoffFnCfg = BackoffFnCfg::new(2, 500, Jitter::NoJitter);
const BO_TXN_LOCK_FAST: BackoffFnCfg = BackoffFnCfg::new(10, 3000, Jitter::EqualJitter);
const BO_TRANSPORT: BackoffFnCfg = BackoffFnCfg::new(100, 2000, Jitter::EqualJitter);

impl BackoffKind {
    fn fn_cfg(self) -> BackoffFnCfg {
        match self {
            BackoffKind::RegionMiss => BO_REGION_MISS,
            BackoffKind::TxnLockFast => BO_TXN_LOCK_FAST,
            BackoffKind::Transport => BO_TRANSPORT,
        }
    }
}

#[derive(Debug)]
struct BackoffFnState {
    base_ms: u64,
    cap_ms: u64,
    jitter: Jitter,
    attempts: u32,
}

impl BackoffFnState {
    fn new(cfg: BackoffFnCfg) -> Self {
        // Keep the jitter helpers' ranges non-empty.
        let base_ms = cfg.base_ms.max(2);
        let cap_ms = cfg.cap_ms.max(base_ms);
        Self {
            base_ms,
            cap_ms,
            jitter: cfg.jitter,
            attempts: 0,
        }
    }

    fn next_sleep_ms(&mut self) -> u64 {
        let sleep_ms = match self.jitter {
            Jitter::NoJitter => expo(self.base_ms, self.cap_ms, self.attempts),
            Jitter::EqualJitter => {
                let v = expo(self.base_ms, self.cap_ms, self.attempts);
                let half = v / 2;
                half + thread_rng().gen_range(0..half.max(1))
            }
        };
        self.attempts += 1;
        sleep_ms
    }
}

fn expo(base_ms: u64, cap_ms: u64, attempts: u32) -> u64 {
    let mul = 1u64.checked_shl(attempts).unwrap_or(u64::MAX);
    base_ms.saturating_mul(mul).min(cap_ms)
}

/// A caller-owned retry-time budget with per-category sleep schedules.
///
/// `do_backoff` sleeps the next step of the category's exponential schedule,
/// clamped to the remaining budget. Once the budget is spent it fails with
/// [`Error::BackoffExhausted`] exactly once; the caller propagates that as a
/// fatal timeout-class error.
#[derive(Debug)]
pub struct BackOffer {
    max_sleep_ms: u64,
    total_sleep_ms: u64,
    errors: Vec<String>,
    times: HashMap<BackoffKind, u64>,
    fns: HashMap<BackoffKind, BackoffFnState>,
}

impl BackOffer {
    /// Create a backoffer with a total sleep budget in milliseconds.
    pub fn new(max_sleep_ms: u64) -> Self {
        Self {
            max_sleep_ms,
            total_sleep_ms: 0,
            errors: Vec::new(),
            times: HashMap::new(),
            fns: HashMap::new(),
        }
    }

    /// Sleep the next step of `kind`'s schedule, or fail if the budget is
    /// exhausted. `cause` is recorded for the exhaustion report.
    pub async fn do_backoff(&mut self, kind: BackoffKind, cause: Error) -> Result<()> {
        let cause = cause.to_string();
        self.errors.push(cause.clone());

        let remaining = self.max_sleep_ms.saturating_sub(self.total_sleep_ms);
        if remaining == 0 {
            return Err(Error::BackoffExhausted { kind, cause });
        }

        let state = self
            .fns
            .entry(kind)
            .or_insert_with(|| BackoffFnState::new(kind.fn_cfg()));
        let sleep_ms = state.next_sleep_ms().min(remaining);

        log::debug!("backoff {kind} for {sleep_ms}ms: {cause}");
        sleep(Duration::from_millis(sleep_ms)).await;
        self.total_sleep_ms += sleep_ms;
        *self.times.entry(kind).or_default() += 1;

        if self.total_sleep_ms >= self.max_sleep_ms {
            return Err(Error::BackoffExhausted { kind, cause });
        }
        Ok(())
    }

    /// Total time slept so far, in milliseconds.
    pub fn total_sleep_ms(&self) -> u64 {
        self.total_sleep_ms
    }

    /// How many sleeps have been charged to `kind`.
    pub fn times(&self, kind: BackoffKind) -> u64 {
        self.times.get(&kind).copied().unwrap_or(0)
    }

    /// The causes recorded by every `do_backoff` call, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}
