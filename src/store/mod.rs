//! Session persistence backends.
//!
//! A store maps a [`SessionId`] to the token bytes produced by the codec.
//! Stores never interpret tokens.
//!
//! ## Concurrency
//!
//! Two requests from the same client may load, modify and save the same
//! identifier at once. Stores make each individual `save`/`delete` atomic
//! (readers see the old token or the new one, never a torn write), but the
//! load-modify-save sequence is not transactional: the last writer wins, and
//! a save that races a delete can bring the record back.

mod blocking;
mod file;
mod locks;
mod memory;

use std::sync::Arc;

use crate::session::SessionId;
use crate::Result;

pub use blocking::BlockingStore;
pub use file::{FileStore, FILE_PREFIX};
pub use memory::MemoryStore;

/// Persists and retrieves tokens keyed by identifier.
pub trait SessionStore: Send + Sync {
    /// Load the token for `id`. `Ok(None)` means no record exists.
    fn load(&self, id: &SessionId) -> Result<Option<Vec<u8>>>;

    /// Store `token` under `id`, replacing any previous token.
    fn save(&self, id: &SessionId, token: &[u8]) -> Result<()>;

    /// Remove the record for `id`. Removing a missing record succeeds.
    fn delete(&self, id: &SessionId) -> Result<()>;

    /// List every stored identifier.
    fn list_ids(&self) -> Result<Vec<SessionId>>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn load(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        (**self).load(id)
    }

    fn save(&self, id: &SessionId, token: &[u8]) -> Result<()> {
        (**self).save(id, token)
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        (**self).delete(id)
    }

    fn list_ids(&self) -> Result<Vec<SessionId>> {
        (**self).list_ids()
    }
}
