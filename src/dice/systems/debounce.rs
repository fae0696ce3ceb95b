//! Shake cooldown gate
//!
//! A sustained shake produces many samples above threshold; the gate lets
//! only one of them through per cooldown window. Decisions depend on elapsed
//! time alone, never on how many samples arrived.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DebounceGate {
    cooldown: Duration,
    last_accepted_at: Option<Instant>,
}

impl DebounceGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted_at: None,
        }
    }

    /// Accept `now` if nothing was accepted yet or the cooldown has elapsed.
    ///
    /// A rejected candidate leaves the gate untouched, so it does not extend
    /// the window.
    pub fn try_accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted_at {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_accepted_at = Some(now);
        true
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_accepted_at(&self) -> Option<Instant> {
        self.last_accepted_at
    }

    /// Forget the last accepted event
    pub fn reset(&mut self) {
        self.last_accepted_at = None;
    }
}
