//! Session identifier type and generator.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng, TryRngCore};
use tracing::warn;
use uuid::Uuid;

use crate::error::SessionError;

/// Mixed into fallback seeds so back-to-back calls never share one.
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
///
/// Wraps 128 random bits. The identifier is displayed as 32 lowercase hex
/// digits, which is both its storage key and its transported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a SessionId from raw bytes.
    ///
    /// This is primarily for testing and deserialization.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Get the 32-character hex form used for storage keys.
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    /// Accepts the simple hex form as well as the hyphenated UUID form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(SessionId)
            .map_err(|_| SessionError::InvalidIdentifier(s.into()))
    }
}

/// Randomness source an identifier was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entropy {
    /// Operating system CSPRNG.
    Secure,
    /// Clock-seeded non-cryptographic generator. Identifiers drawn from it
    /// are guessable by an attacker who can estimate the seed.
    Fallback,
}

impl Entropy {
    /// Check if the identifier came from a cryptographically secure source.
    pub fn is_secure(&self) -> bool {
        matches!(self, Entropy::Secure)
    }
}

/// Produces unguessable session identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    force_fallback: bool,
}

impl IdGenerator {
    /// Create a generator backed by the operating system CSPRNG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that always uses the non-cryptographic fallback.
    ///
    /// Only meant for tests and environments known to lack an OS source.
    pub fn fallback_only() -> Self {
        Self {
            force_fallback: true,
        }
    }

    /// Generate a fresh identifier and report which source it came from.
    pub fn generate(&self) -> (SessionId, Entropy) {
        let mut bytes = [0u8; 16];

        if !self.force_fallback {
            match OsRng.try_fill_bytes(&mut bytes) {
                Ok(()) => return (SessionId::from_bytes(bytes), Entropy::Secure),
                Err(e) => {
                    warn!(error = %e, "OS randomness unavailable, session ids are guessable");
                }
            }
        }

        fallback_rng().fill_bytes(&mut bytes);
        (SessionId::from_bytes(bytes), Entropy::Fallback)
    }
}

fn fallback_rng() -> SmallRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    SmallRng::seed_from_u64(nanos ^ counter.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
