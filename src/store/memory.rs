//! In-process session store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::SessionStore;
use crate::error::SessionError;
use crate::session::SessionId;
use crate::Result;

/// Thread-safe in-memory store keyed by identifier.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: RwLock<HashMap<SessionId, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored sessions.
    pub fn count(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Check if a session exists.
    pub fn contains(&self, id: &SessionId) -> Result<bool> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(tokens.contains_key(id))
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(tokens.get(id).cloned())
    }

    fn save(&self, id: &SessionId, token: &[u8]) -> Result<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        tokens.insert(*id, token.to_vec());
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        tokens.remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<SessionId>> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(tokens.keys().copied().collect())
    }
}
