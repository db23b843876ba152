//! Per-identifier mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;
use crate::session::SessionId;
use crate::Result;

/// Table of per-identifier locks.
///
/// Slots are created on demand and dropped once no caller holds them, so the
/// table only grows with the number of identifiers being written right now.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    slots: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `id`.
    pub(crate) fn with_lock<T, F>(&self, id: &SessionId, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| SessionError::LockPoisoned)?;
            Arc::clone(slots.entry(*id).or_default())
        };

        let result = {
            let _guard = slot.lock().map_err(|_| SessionError::LockPoisoned)?;
            f()
        };

        let mut slots = self.slots.lock().map_err(|_| SessionError::LockPoisoned)?;
        // Only the table and this call hold the slot
        if Arc::strong_count(&slot) == 2 {
            slots.remove(id);
        }

        result
    }

    /// Number of live slots.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
