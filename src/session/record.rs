//! The persisted unit of session state.

use serde_json::{Map, Value};

use super::SessionId;
use crate::error::{Result, SessionError};

/// Reserved key mirroring the session identifier.
pub const KEY_SID: &str = "_sid";
/// Reserved key mirroring the lifetime in seconds.
pub const KEY_TTL: &str = "_ttl";
/// Reserved key mirroring the last-touch timestamp.
pub const KEY_UTM: &str = "_utm";

/// Keys the engine manages. Callers may read them but never write them.
pub const RESERVED_KEYS: [&str; 3] = [KEY_SID, KEY_TTL, KEY_UTM];

/// Check if `key` is engine-managed.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Session state: caller data plus the reserved `_sid`, `_ttl`, `_utm` keys.
///
/// The reserved keys always live in `data` alongside the typed fields so the
/// map view, the serialized form and the typed accessors agree.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    id: SessionId,
    ttl_seconds: u64,
    last_touch: f64,
    data: Map<String, Value>,
}

impl SessionRecord {
    /// Allocate an empty record for a fresh identifier.
    pub fn new(id: SessionId, ttl_seconds: u64, now: f64) -> Self {
        let mut data = Map::new();
        data.insert(KEY_SID.to_string(), Value::String(id.to_hex()));
        data.insert(KEY_TTL.to_string(), Value::from(ttl_seconds));
        data.insert(KEY_UTM.to_string(), Value::from(now));

        Self {
            id,
            ttl_seconds,
            last_touch: now,
            data,
        }
    }

    /// Rebuild a record from a decoded map, checking the reserved keys.
    ///
    /// `expected` is the identifier the map was loaded under; a record naming
    /// any other identifier is rejected.
    pub fn from_map(expected: SessionId, data: Map<String, Value>) -> Result<Self> {
        let sid = data
            .get(KEY_SID)
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::MalformedToken("missing _sid".into()))?;
        let sid: SessionId = sid
            .parse()
            .map_err(|_| SessionError::MalformedToken("unparsable _sid".into()))?;
        if sid != expected {
            return Err(SessionError::MalformedToken(
                "_sid does not match identifier".into(),
            ));
        }

        let ttl_seconds = data
            .get(KEY_TTL)
            .and_then(Value::as_u64)
            .ok_or_else(|| SessionError::MalformedToken("missing or invalid _ttl".into()))?;
        let last_touch = data
            .get(KEY_UTM)
            .and_then(Value::as_f64)
            .ok_or_else(|| SessionError::MalformedToken("missing or invalid _utm".into()))?;

        Ok(Self {
            id: sid,
            ttl_seconds,
            last_touch,
            data,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn last_touch(&self) -> f64 {
        self.last_touch
    }

    /// Slide the window forward to `now`.
    pub fn touch(&mut self, now: f64) {
        self.last_touch = now;
        self.data.insert(KEY_UTM.to_string(), Value::from(now));
    }

    /// Full map view, reserved keys included.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Insert a caller value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(SessionError::ReservedKey(key));
        }
        Ok(self.data.insert(key, value))
    }

    /// Remove a caller value.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        if is_reserved(key) {
            return Err(SessionError::ReservedKey(key.to_string()));
        }
        Ok(self.data.remove(key))
    }

    /// Number of entries, reserved keys included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the record holds no caller data.
    pub fn is_empty(&self) -> bool {
        self.data.keys().all(|k| is_reserved(k))
    }
}
