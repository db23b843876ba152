//! Cookie transport boundary.
//!
//! The HTTP layer lives outside this crate; it plugs in through
//! [`CookieTransport`]. [`CookieJar`] is an in-memory implementation used by
//! tests and the demo binary.

use std::collections::HashMap;

use tracing::debug;

use crate::codec;

/// Carries the session identifier between client and server.
pub trait CookieTransport {
    /// Read an incoming cookie. With a secret, a value whose signature does
    /// not verify is reported as absent.
    fn get_cookie(&self, name: &str, secret: Option<&[u8]>) -> Option<String>;

    /// Queue an outgoing cookie.
    fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        secret: Option<&[u8]>,
        max_age: Option<u64>,
        path: &str,
    );

    /// Queue removal of a cookie on the client.
    fn delete_cookie(&mut self, name: &str);
}

/// An outgoing `Set-Cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    /// Wire value, already signed when a secret was supplied.
    pub value: String,
    pub max_age: Option<u64>,
    pub path: String,
}

impl SetCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        if let Some(max_age) = self.max_age {
            header.push_str(&format!("; Max-Age={}", max_age));
        }
        header.push_str(&format!("; Path={}", self.path));
        header
    }
}

/// A queued transport write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieWrite {
    Set(SetCookie),
    Delete(String),
}

/// In-memory cookie transport for one request.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    incoming: HashMap<String, String>,
    writes: Vec<CookieWrite>,
}

impl CookieJar {
    /// Create an empty jar, as for a first-time visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a jar carrying one incoming cookie with a raw wire value.
    pub fn with_cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut jar = Self::new();
        jar.incoming.insert(name.into(), value.into());
        jar
    }

    /// Parse a `Cookie` request header (`a=1; b=2`).
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    jar.incoming
                        .insert(name.to_string(), value.trim().to_string());
                }
            }
        }
        jar
    }

    /// Raw wire value of an incoming cookie.
    pub fn incoming(&self, name: &str) -> Option<&str> {
        self.incoming.get(name).map(String::as_str)
    }

    /// All transport writes, in order.
    pub fn writes(&self) -> &[CookieWrite] {
        &self.writes
    }

    /// The most recent `Set-Cookie` for `name`, if the last write to it was a set.
    pub fn last_set(&self, name: &str) -> Option<&SetCookie> {
        self.writes.iter().rev().find_map(|w| match w {
            CookieWrite::Set(c) if c.name == name => Some(Some(c)),
            CookieWrite::Delete(n) if n == name => Some(None),
            _ => None,
        })?
    }

    /// Check if the most recent write to `name` removed it.
    pub fn was_deleted(&self, name: &str) -> bool {
        matches!(
            self.writes.iter().rev().find(|w| match w {
                CookieWrite::Set(c) => c.name == name,
                CookieWrite::Delete(n) => n == name,
            }),
            Some(CookieWrite::Delete(_))
        )
    }

    /// Build the jar the client would present on its next request.
    pub fn next_request(&self) -> Self {
        let mut next = Self {
            incoming: self.incoming.clone(),
            writes: Vec::new(),
        };
        for write in &self.writes {
            match write {
                CookieWrite::Set(c) => {
                    next.incoming.insert(c.name.clone(), c.value.clone());
                }
                CookieWrite::Delete(name) => {
                    next.incoming.remove(name);
                }
            }
        }
        next
    }
}

impl CookieTransport for CookieJar {
    fn get_cookie(&self, name: &str, secret: Option<&[u8]>) -> Option<String> {
        let raw = self.incoming.get(name)?;
        match secret {
            None => Some(raw.clone()),
            Some(secret) => match codec::verify(raw.as_bytes(), secret) {
                Ok(payload) => String::from_utf8(payload).ok(),
                Err(e) => {
                    debug!(cookie = name, error = %e, "discarding unverifiable cookie");
                    None
                }
            },
        }
    }

    fn set_cookie(
        &mut self,
        name: &str,
        value: &str,
        secret: Option<&[u8]>,
        max_age: Option<u64>,
        path: &str,
    ) {
        let value = match secret {
            None => value.to_string(),
            Some(secret) => match codec::sign(value.as_bytes(), secret) {
                Ok(signed) => String::from_utf8_lossy(&signed).into_owned(),
                Err(e) => {
                    debug!(cookie = name, error = %e, "cookie signing failed");
                    return;
                }
            },
        };

        self.writes.push(CookieWrite::Set(SetCookie {
            name: name.to_string(),
            value,
            max_age,
            path: path.to_string(),
        }));
    }

    fn delete_cookie(&mut self, name: &str) {
        self.writes.push(CookieWrite::Delete(name.to_string()));
    }
}
