//! # px-session
//!
//! Server-side session engine with signed tokens, pluggable storage and
//! sliding expiration.
//!
//! A session is a key/value map named by an unguessable identifier. The
//! identifier travels to the client in a cookie; the map lives server-side,
//! encoded as a token that is HMAC-signed when a secret is configured.
//!
//! ## Features
//!
//! - **Unguessable identifiers**: 128 bits from the OS CSPRNG, with the
//!   non-cryptographic fallback reported rather than hidden
//! - **Tamper-evident tokens**: HMAC-SHA256, verified before parsing
//! - **File-backed storage**: one file per session, atomic replace-on-write
//! - **Sliding expiration**: every access extends the window; stale sessions
//!   rotate to a new identifier with empty data
//!
//! ## Quick Start
//!
//! ```no_run
//! use px_session::{CookieJar, SessionManager, SessionSection};
//!
//! fn main() -> px_session::Result<()> {
//!     px_session::logging::try_init().ok();
//!
//!     let settings = SessionSection {
//!         secret_key: Some("change-me".into()),
//!         cookie_lifetime: Some(600),
//!         ..SessionSection::default()
//!     };
//!     let manager = SessionManager::from_settings(settings)?;
//!
//!     // One request
//!     let mut jar = CookieJar::new();
//!     let mut session = manager.open(&mut jar)?;
//!     let count = session.get_or("count", 0)?.as_i64().unwrap_or(0) + 1;
//!     session.set("count", count)?;
//!     session.save()?;
//!
//!     println!("visit #{} for session {}", count, session.id());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use codec::SignedCodec;
pub use config::{ensure_unique_keywords, Config, ConfigError, SessionSection};
pub use error::{Result, SessionError};
pub use serde_json::Value;
pub use session::{
    Clock, Entropy, ExpiryPolicy, Freshness, IdGenerator, ManualClock, Session, SessionId,
    SessionManager, SessionRecord, SystemClock, MAX_TTL,
};
pub use store::{BlockingStore, FileStore, MemoryStore, SessionStore};
pub use transport::{CookieJar, CookieTransport, CookieWrite, SetCookie};
