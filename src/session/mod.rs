//! Session management module.
//!
//! This module provides the session identifier, the persisted record, the
//! sliding-expiration policy and the per-request handle that ties them to a
//! codec, a store and a cookie transport.

mod clock;
mod expiry;
mod handle;
mod id;
mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiry::{ExpiryPolicy, Freshness, MAX_TTL};
pub use handle::{Session, SessionManager};
pub use id::{Entropy, IdGenerator, SessionId};
pub use record::{is_reserved, SessionRecord, KEY_SID, KEY_TTL, KEY_UTM, RESERVED_KEYS};
