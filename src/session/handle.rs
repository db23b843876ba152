//! Per-request session handle and the engine that opens it.

use std::sync::Arc;

use serde_json::{map, Value};
use tracing::{debug, info, warn};

use super::{
    Clock, Entropy, ExpiryPolicy, Freshness, IdGenerator, SessionId, SessionRecord, SystemClock,
};
use crate::codec::SignedCodec;
use crate::config::SessionSection;
use crate::store::{FileStore, SessionStore};
use crate::transport::CookieTransport;
use crate::Result;

const COOKIE_PATH: &str = "/";

/// Session engine: configuration plus the codec, store, clock and
/// identifier generator every request shares.
pub struct SessionManager<S> {
    settings: SessionSection,
    codec: SignedCodec,
    policy: ExpiryPolicy,
    store: S,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
}

impl SessionManager<FileStore> {
    /// Build an engine backed by files in `settings.session_dir`.
    pub fn from_settings(settings: SessionSection) -> Result<Self> {
        let store = FileStore::new(&settings.session_dir)?;
        Self::new(settings, store)
    }
}

impl<S: SessionStore> SessionManager<S> {
    /// Build an engine over `store`. Invalid settings are rejected here, once,
    /// rather than on each request.
    pub fn new(settings: SessionSection, store: S) -> Result<Self> {
        settings.validate()?;

        if settings.secret_key.is_none() {
            warn!("no secret configured, session tokens are stored unsigned");
        }

        Ok(Self {
            codec: SignedCodec::new(settings.secret_bytes()),
            policy: ExpiryPolicy::new(settings.ttl_seconds()),
            settings,
            store,
            clock: Arc::new(SystemClock),
            ids: IdGenerator::new(),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the identifier generator.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn settings(&self) -> &SessionSection {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &SignedCodec {
        &self.codec
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Open the session for one request.
    ///
    /// Reads the cookie once. A missing, unparsable, tampered or unknown
    /// identifier yields a brand-new session; store I/O failures are returned.
    pub fn open<'a, T>(&'a self, transport: &'a mut T) -> Result<Session<'a, S, T>>
    where
        T: CookieTransport + ?Sized,
    {
        let raw = transport.get_cookie(&self.settings.cookie_name, self.settings.secret_bytes());

        let existing = match raw {
            Some(raw) => self.load_existing(&raw)?,
            None => None,
        };

        let (record, entropy) = match existing {
            Some(record) => (record, None),
            None => {
                let (record, entropy) = self.allocate(&mut *transport)?;
                (record, Some(entropy))
            }
        };

        Ok(Session {
            manager: self,
            transport,
            record,
            entropy,
        })
    }

    fn load_existing(&self, raw: &str) -> Result<Option<SessionRecord>> {
        let id: SessionId = match raw.parse() {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "ignoring cookie that is not a session id");
                return Ok(None);
            }
        };

        let Some(token) = self.store.load(&id)? else {
            debug!(session = %id, "no stored record for cookie");
            return Ok(None);
        };

        match self.codec.decode(id, &token) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_recoverable() => {
                warn!(session = %id, error = %e, "rejecting stored session token");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn allocate<T>(&self, transport: &mut T) -> Result<(SessionRecord, Entropy)>
    where
        T: CookieTransport + ?Sized,
    {
        let (id, entropy) = self.ids.generate();
        let record = SessionRecord::new(id, self.policy.ttl_seconds(), self.clock.now());

        self.persist(&record)?;
        self.set_cookie(transport, id);

        debug!(session = %id, secure = entropy.is_secure(), "allocated session");
        Ok((record, entropy))
    }

    fn persist(&self, record: &SessionRecord) -> Result<()> {
        let token = self.codec.encode(record)?;
        self.store.save(&record.id(), &token)
    }

    fn set_cookie<T>(&self, transport: &mut T, id: SessionId)
    where
        T: CookieTransport + ?Sized,
    {
        transport.set_cookie(
            &self.settings.cookie_name,
            &id.to_hex(),
            self.settings.secret_bytes(),
            self.settings.max_age(),
            COOKIE_PATH,
        );
    }
}

impl<S> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Map-like view of one session for the duration of a request.
///
/// Data accessors run the expiry check first: a fresh session slides its
/// window forward, a stale one is rotated to a new, empty session before the
/// access proceeds. Changes reach the store only on [`Session::save`].
pub struct Session<'a, S, T: ?Sized> {
    manager: &'a SessionManager<S>,
    transport: &'a mut T,
    record: SessionRecord,
    entropy: Option<Entropy>,
}

impl<'a, S, T> Session<'a, S, T>
where
    S: SessionStore,
    T: CookieTransport + ?Sized,
{
    /// Current identifier.
    pub fn id(&self) -> SessionId {
        self.record.id()
    }

    /// Randomness source of the identifier, or `None` for a session loaded
    /// from the transport.
    pub fn entropy(&self) -> Option<Entropy> {
        self.entropy
    }

    /// Check if this session was allocated during this request.
    pub fn is_new(&self) -> bool {
        self.entropy.is_some()
    }

    /// Underlying record.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    fn expire(&mut self) -> Result<()> {
        let now = self.manager.clock.now();
        let freshness = self.manager.policy.check(
            self.record.last_touch(),
            self.record.ttl_seconds(),
            now,
        );

        match freshness {
            Freshness::Fresh => {
                self.record.touch(now);
                Ok(())
            }
            Freshness::Stale => {
                info!(session = %self.id(), "session expired, rotating");
                self.regenerate()
            }
        }
    }

    pub fn contains(&mut self, key: &str) -> Result<bool> {
        self.expire()?;
        Ok(self.record.contains(key))
    }

    /// Get a value. `Ok(None)` means the key is absent.
    pub fn get(&mut self, key: &str) -> Result<Option<&Value>> {
        self.expire()?;
        Ok(self.record.get(key))
    }

    /// Get a value or `default` when absent.
    pub fn get_or(&mut self, key: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get(key)?.cloned().unwrap_or_else(|| default.into()))
    }

    /// Set a value, returning the previous one.
    ///
    /// Writes to `_sid`, `_ttl` and `_utm` are rejected with
    /// [`SessionError::ReservedKey`](crate::SessionError::ReservedKey).
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        let key = key.into();
        if super::is_reserved(&key) {
            return Err(crate::SessionError::ReservedKey(key));
        }
        self.expire()?;
        self.record.insert(key, value.into())
    }

    /// Remove a value, returning it.
    pub fn delete(&mut self, key: &str) -> Result<Option<Value>> {
        if super::is_reserved(key) {
            return Err(crate::SessionError::ReservedKey(key.to_string()));
        }
        self.expire()?;
        self.record.remove(key)
    }

    /// Number of entries, reserved keys included. Does not touch the session.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    /// Check if the session holds no caller data. Does not touch the session.
    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Iterate over `(key, value)` pairs, reserved keys included.
    ///
    /// Each call starts a fresh pass over the current data.
    pub fn iter(&mut self) -> Result<map::Iter<'_>> {
        self.expire()?;
        Ok(self.record.as_map().iter())
    }

    /// Keys, reserved keys included.
    pub fn keys(&mut self) -> Result<map::Keys<'_>> {
        self.expire()?;
        Ok(self.record.as_map().keys())
    }

    /// Values, reserved keys included.
    pub fn values(&mut self) -> Result<map::Values<'_>> {
        self.expire()?;
        Ok(self.record.as_map().values())
    }

    /// Persist the record and refresh the cookie.
    pub fn save(&mut self) -> Result<()> {
        self.manager.persist(&self.record)?;
        self.manager.set_cookie(&mut *self.transport, self.record.id());
        Ok(())
    }

    /// Remove the record and clear the cookie.
    ///
    /// The cookie is cleared even when the store fails so the client stops
    /// presenting the identifier; the store error is still returned.
    pub fn destroy(self) -> Result<()> {
        let id = self.record.id();
        let deleted = self.manager.store.delete(&id);
        self.transport.delete_cookie(&self.manager.settings.cookie_name);

        debug!(session = %id, "destroyed session");
        deleted
    }

    /// Replace this session with a new identifier and empty data.
    ///
    /// The new cookie replaces the old one on the client, so the transport is
    /// written once.
    pub fn regenerate(&mut self) -> Result<()> {
        let old = self.record.id();
        self.manager.store.delete(&old)?;

        let (record, entropy) = self.manager.allocate(&mut *self.transport)?;
        debug!(old = %old, new = %record.id(), "regenerated session");

        self.record = record;
        self.entropy = Some(entropy);
        Ok(())
    }
}
