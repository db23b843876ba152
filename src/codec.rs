//! Token encoding with optional HMAC integrity protection.
//!
//! Signed tokens have the shape `!<tag>?<body>` where `body` is the base64
//! JSON object and `tag` is the base64 HMAC-SHA256 of `body` under the
//! secret. The tag is verified before `body` is decoded or parsed.
//!
//! Without a secret the token is the bare JSON object. That mode has **no
//! tamper resistance**: anyone who can write the token can rewrite the
//! session. It is still safe to parse, since the value model is a closed set
//! of JSON shapes and never names a type to construct.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::error::{Result, SessionError};
use crate::session::{SessionId, SessionRecord};

type HmacSha256 = Hmac<Sha256>;

const SIGNED_PREFIX: u8 = b'!';
const SEPARATOR: u8 = b'?';

/// Serializes session state to tokens and back.
#[derive(Clone, Default)]
pub struct SignedCodec {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for SignedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedCodec")
            .field("signed", &self.is_signed())
            .finish()
    }
}

impl SignedCodec {
    /// Create a codec; `None` selects the unsigned raw mode.
    pub fn new(secret: Option<&[u8]>) -> Self {
        Self {
            secret: secret.map(<[u8]>::to_vec),
        }
    }

    /// Create a codec that signs with `secret`.
    pub fn signed(secret: impl AsRef<[u8]>) -> Self {
        Self::new(Some(secret.as_ref()))
    }

    /// Create a codec without integrity protection.
    pub fn unsigned() -> Self {
        Self::new(None)
    }

    /// Check if tokens carry an integrity tag.
    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    /// Encode a mapping to token bytes.
    pub fn encode_map(&self, data: &Map<String, Value>) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(data)
            .map_err(|e| SessionError::MalformedToken(format!("unserializable value: {}", e)))?;

        match &self.secret {
            Some(secret) => sign(&json, secret),
            None => Ok(json),
        }
    }

    /// Decode token bytes to a mapping.
    pub fn decode_map(&self, token: &[u8]) -> Result<Map<String, Value>> {
        let json = match &self.secret {
            Some(secret) => verify(token, secret)?,
            None => token.to_vec(),
        };

        match serde_json::from_slice::<Value>(&json) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SessionError::MalformedToken("token is not an object".into())),
            Err(e) => Err(SessionError::MalformedToken(e.to_string())),
        }
    }

    /// Encode a session record.
    pub fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>> {
        self.encode_map(record.as_map())
    }

    /// Decode a token loaded under `id` into a session record.
    pub fn decode(&self, id: SessionId, token: &[u8]) -> Result<SessionRecord> {
        SessionRecord::from_map(id, self.decode_map(token)?)
    }
}

fn mac(secret: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| SessionError::MalformedToken(format!("unusable secret: {}", e)))
}

/// Wrap `payload` in a signed envelope.
pub fn sign(payload: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    let body = STANDARD.encode(payload);

    let mut mac = mac(secret)?;
    mac.update(body.as_bytes());
    let tag = STANDARD.encode(mac.finalize().into_bytes());

    let mut token = Vec::with_capacity(tag.len() + body.len() + 2);
    token.push(SIGNED_PREFIX);
    token.extend_from_slice(tag.as_bytes());
    token.push(SEPARATOR);
    token.extend_from_slice(body.as_bytes());
    Ok(token)
}

/// Check a signed envelope and return its payload.
///
/// Every failure up to and including the tag comparison is an
/// [`SessionError::Integrity`]; only an authentic body that fails to decode
/// is reported as malformed.
pub fn verify(token: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    let rest = token
        .strip_prefix(&[SIGNED_PREFIX])
        .ok_or(SessionError::Integrity)?;
    let split = rest
        .iter()
        .position(|&b| b == SEPARATOR)
        .ok_or(SessionError::Integrity)?;
    let (tag, body) = (&rest[..split], &rest[split + 1..]);

    let tag = STANDARD.decode(tag).map_err(|_| SessionError::Integrity)?;

    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&tag).map_err(|_| SessionError::Integrity)?;

    STANDARD
        .decode(body)
        .map_err(|e| SessionError::MalformedToken(format!("invalid body encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Map<String, Value> {
        let value = json!({
            "count": 1,
            "ratio": 0.5,
            "name": "ada",
            "admin": false,
            "tags": ["a", "b"],
            "profile": {"lang": "en", "nested": [1, {"deep": null}]}
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_roundtrip_signed_and_unsigned() {
        for codec in [SignedCodec::signed("k3y"), SignedCodec::unsigned()] {
            let token = codec.encode_map(&sample()).unwrap();
            assert_eq!(codec.decode_map(&token).unwrap(), sample());
        }
    }

    #[test]
    fn test_signed_token_shape() {
        let token = SignedCodec::signed("k3y").encode_map(&sample()).unwrap();
        assert_eq!(token[0], b'!');
        assert!(token.contains(&b'?'));
    }

    #[test]
    fn test_any_flipped_byte_is_rejected() {
        let codec = SignedCodec::signed("k3y");
        let token = codec.encode_map(&sample()).unwrap();

        for i in 0..token.len() {
            let mut tampered = token.clone();
            tampered[i] ^= 0x01;
            let err = codec.decode_map(&tampered).unwrap_err();
            assert!(
                matches!(err, SessionError::Integrity),
                "byte {} produced {:?}",
                i,
                err
            );
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = SignedCodec::signed("k3y").encode_map(&sample()).unwrap();
        let err = SignedCodec::signed("other").decode_map(&token).unwrap_err();
        assert!(matches!(err, SessionError::Integrity));
    }

    #[test]
    fn test_unsigned_token_rejected_by_signed_codec() {
        let token = SignedCodec::unsigned().encode_map(&sample()).unwrap();
        let err = SignedCodec::signed("k3y").decode_map(&token).unwrap_err();
        assert!(matches!(err, SessionError::Integrity));
    }

    #[test]
    fn test_unsigned_malformed() {
        let codec = SignedCodec::unsigned();
        assert!(matches!(
            codec.decode_map(b"{not json").unwrap_err(),
            SessionError::MalformedToken(_)
        ));
        assert!(matches!(
            codec.decode_map(b"[1,2,3]").unwrap_err(),
            SessionError::MalformedToken(_)
        ));
    }

    #[test]
    fn test_authentic_garbage_body_is_malformed() {
        let secret = b"k3y";
        let token = sign(b"definitely not json", secret).unwrap();
        let err = SignedCodec::signed(secret).decode_map(&token).unwrap_err();
        assert!(matches!(err, SessionError::MalformedToken(_)));
    }

    #[test]
    fn test_sign_verify_payload() {
        let token = sign(b"0123abcd", b"secret").unwrap();
        assert_eq!(verify(&token, b"secret").unwrap(), b"0123abcd");
        assert!(verify(&token, b"SECRET").is_err());
        assert!(verify(b"", b"secret").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", SignedCodec::signed("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("signed: true"));
    }

    #[test]
    fn test_record_roundtrip() {
        let id = SessionId::from_bytes([3; 16]);
        let mut record = SessionRecord::new(id, 60, 1234.5);
        record.insert("count", json!(1)).unwrap();

        let codec = SignedCodec::signed("k3y");
        let token = codec.encode(&record).unwrap();
        assert_eq!(codec.decode(id, &token).unwrap(), record);

        let other = SessionId::from_bytes([4; 16]);
        assert!(matches!(
            codec.decode(other, &token).unwrap_err(),
            SessionError::MalformedToken(_)
        ));
    }
}
