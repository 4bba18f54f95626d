//! Request-scoped state.
//!
//! Each user action (one document, or one batch) gets its own
//! [`RequestContext`]. Nothing here is shared between requests and nothing
//! outlives the request that created it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

/// Where timestamps come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock UTC time, truncated to whole seconds.
    System,
    /// Every read returns the same instant. Used for reproducible output.
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now().trunc_subsecs(0),
            Clock::Fixed(ts) => *ts,
        }
    }
}

/// Cooperative cancellation flag, checked between batch iterations.
///
/// Clones share the same flag, so the caller keeps one handle and passes
/// another into the request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub clock: Clock,
    pub cancel: CancellationToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            clock: Clock::System,
            cancel: CancellationToken::new(),
        }
    }

    /// A context whose clock is pinned to `timestamp`.
    pub fn fixed(timestamp: DateTime<Utc>) -> Self {
        Self {
            clock: Clock::Fixed(timestamp),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_is_stable() {
        let ts = Utc.with_ymd_and_hms(2024, 4, 15, 12, 0, 0).unwrap();
        let ctx = RequestContext::fixed(ts);
        assert_eq!(ctx.now(), ts);
        assert_eq!(ctx.now(), ctx.now());
    }

    #[test]
    fn system_clock_has_whole_seconds() {
        assert_eq!(Clock::System.now().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        assert!(!ctx.cancel.is_cancelled());
        token.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
