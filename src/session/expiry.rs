//! Sliding-expiration state machine.

/// Absolute ceiling on a session's lifetime: 7 days.
pub const MAX_TTL: u64 = 7 * 24 * 3600;

/// Outcome of an expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Access is within the window; the window slides forward to `now`.
    Fresh,
    /// Window has passed; the session must be rotated.
    Stale,
}

impl Freshness {
    /// Check if the session must be rotated.
    pub fn requires_rotation(&self) -> bool {
        matches!(self, Freshness::Stale)
    }
}

/// Decides, per access, whether a session is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    ttl_seconds: u64,
}

impl ExpiryPolicy {
    /// Create a policy with the given window, clamped to [`MAX_TTL`].
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds: ttl_seconds.min(MAX_TTL),
        }
    }

    /// Get the window length in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Evaluate a record last touched at `last_touch` with its own stored
    /// `ttl_seconds`, at time `now`.
    ///
    /// The record's ttl is clamped to the policy window so a token carrying
    /// an inflated `_ttl` cannot outlive the configured lifetime.
    pub fn check(&self, last_touch: f64, ttl_seconds: u64, now: f64) -> Freshness {
        let ttl = ttl_seconds.min(self.ttl_seconds) as f64;
        let deadline = last_touch + ttl;

        if now <= deadline {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(MAX_TTL)
    }
}
