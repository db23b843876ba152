//! Async facade over a synchronous store.

use std::sync::Arc;

use tokio::task;

use super::SessionStore;
use crate::error::SessionError;
use crate::session::SessionId;
use crate::Result;

/// Runs store calls on the tokio blocking pool so file I/O never stalls an
/// async executor thread.
#[derive(Debug)]
pub struct BlockingStore<S> {
    inner: Arc<S>,
}

impl<S> Clone for BlockingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SessionStore + 'static> BlockingStore<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap a store that is already shared.
    pub fn from_arc(store: Arc<S>) -> Self {
        Self { inner: store }
    }

    /// Get the wrapped store for synchronous use.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?
    }

    pub async fn load(&self, id: SessionId) -> Result<Option<Vec<u8>>> {
        self.run(move |s| s.load(&id)).await
    }

    pub async fn save(&self, id: SessionId, token: Vec<u8>) -> Result<()> {
        self.run(move |s| s.save(&id, &token)).await
    }

    pub async fn delete(&self, id: SessionId) -> Result<()> {
        self.run(move |s| s.delete(&id)).await
    }

    pub async fn list_ids(&self) -> Result<Vec<SessionId>> {
        self.run(|s| s.list_ids()).await
    }
}
