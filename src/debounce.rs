use std::time::{Duration, Instant};
use tracing::trace;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

/// Deferred action that only fires once input has been idle for `delay`.
/// Every `schedule` replaces the pending token, so only the last one survives.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    next_token: u64,
    pending: Option<(DebounceToken, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_token: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) -> DebounceToken {
        self.next_token += 1;
        let token = DebounceToken(self.next_token);
        if let Some((old, _)) = self.pending.replace((token, now + self.delay)) {
            trace!("Debounce token {:?} replaced by {:?}", old, token);
        }
        token
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> Option<DebounceToken> {
        match self.pending {
            Some((token, deadline)) if now >= deadline => {
                self.pending = None;
                Some(token)
            }
            _ => None,
        }
    }

    pub fn flush(&mut self) -> Option<DebounceToken> {
        self.pending.take().map(|(token, _)| token)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}
