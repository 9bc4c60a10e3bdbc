//! Signed statements and receipts.
//!
//! A [`SignedStatement`] is an opaque COSE_Sign1 envelope. The client never
//! verifies signatures; it only needs a handful of header fields (issuer,
//! subject, meta-map attributes) and, for counter-signed envelopes, the
//! embedded payload. The original bytes are kept verbatim so that a statement
//! read back from a transparency service can be compared byte-for-byte with
//! what was submitted.

use crate::error::StatementError;
use serde_cbor::Value;
use std::collections::BTreeMap;

const COSE_SIGN1_TAG: u8 = 0xD2;

pub const HEADER_ALG: i128 = 1;
pub const HEADER_CONTENT_TYPE: i128 = 3;
pub const HEADER_CWT_CLAIMS: i128 = 13;
pub const HEADER_META_MAP: i128 = -6804;
const META_MAP_KEY: &str = "meta_map";

const CLAIM_ISSUER: i128 = 1;
const CLAIM_SUBJECT: i128 = 2;

const ALG_ES256: i128 = -7;

type HeaderMap = BTreeMap<Value, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedStatement {
    bytes: Vec<u8>,
    issuer: Option<String>,
    subject: Option<String>,
    meta: BTreeMap<String, String>,
    payload: Option<Vec<u8>>,
}

impl SignedStatement {
    /// Decode a COSE_Sign1 envelope, tagged (18) or untagged.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, StatementError> {
        let bytes = bytes.into();
        let untagged = match bytes.split_first() {
            Some((&COSE_SIGN1_TAG, rest)) => rest,
            Some(_) => bytes.as_slice(),
            None => return Err(StatementError::Decode("empty envelope".into())),
        };

        let value: Value =
            serde_cbor::from_slice(untagged).map_err(|e| StatementError::Decode(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(StatementError::NotSign1("top-level item is not an array".into()));
        };
        let [protected, unprotected, payload, signature] = <[Value; 4]>::try_from(items)
            .map_err(|items| {
                StatementError::NotSign1(format!("expected 4 elements, found {}", items.len()))
            })?;

        let protected = match protected {
            Value::Bytes(raw) if raw.is_empty() => HeaderMap::new(),
            Value::Bytes(raw) => match serde_cbor::from_slice::<Value>(&raw) {
                Ok(Value::Map(map)) => map,
                Ok(_) => {
                    return Err(StatementError::NotSign1(
                        "protected header is not a map".into(),
                    ));
                }
                Err(e) => return Err(StatementError::Decode(e.to_string())),
            },
            _ => {
                return Err(StatementError::NotSign1(
                    "protected header is not a byte string".into(),
                ));
            }
        };
        let Value::Map(unprotected) = unprotected else {
            return Err(StatementError::NotSign1(
                "unprotected header is not a map".into(),
            ));
        };
        let payload = match payload {
            Value::Bytes(raw) => Some(raw),
            Value::Null => None,
            _ => {
                return Err(StatementError::NotSign1(
                    "payload is neither bytes nor nil".into(),
                ));
            }
        };
        if !matches!(signature, Value::Bytes(_)) {
            return Err(StatementError::NotSign1(
                "signature is not a byte string".into(),
            ));
        }

        let claims = header(&protected, &unprotected, &Value::Integer(HEADER_CWT_CLAIMS));
        let claim = |label: i128| match claims {
            Some(Value::Map(claims)) => match claims.get(&Value::Integer(label)) {
                Some(Value::Text(text)) => Some(text.clone()),
                _ => None,
            },
            _ => None,
        };
        let issuer = claim(CLAIM_ISSUER);
        let subject = claim(CLAIM_SUBJECT);

        let meta = header(&protected, &unprotected, &Value::Text(META_MAP_KEY.into()))
            .or_else(|| header(&protected, &unprotected, &Value::Integer(HEADER_META_MAP)))
            .map(stringify_meta)
            .unwrap_or_default();

        Ok(Self {
            bytes,
            issuer,
            subject,
            meta,
            payload,
        })
    }

    pub fn builder() -> SignedStatementBuilder {
        SignedStatementBuilder::default()
    }

    /// The envelope exactly as it was supplied.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Strip one counter-signing layer: decode this envelope's payload as the
    /// statement it wraps.
    pub fn unwrap_envelope(&self) -> Result<Self, StatementError> {
        let inner = self.payload.as_ref().ok_or(StatementError::DetachedPayload)?;
        Self::from_bytes(inner.clone())
    }
}

fn header<'a>(protected: &'a HeaderMap, unprotected: &'a HeaderMap, key: &Value) -> Option<&'a Value> {
    protected.get(key).or_else(|| unprotected.get(key))
}

fn stringify_meta(value: &Value) -> BTreeMap<String, String> {
    let Value::Map(map) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let Value::Text(key) = key else {
                return None;
            };
            let value = match value {
                Value::Text(text) => text.clone(),
                Value::Integer(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Float(f) => f.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Assembles a tagged COSE_Sign1 envelope from header fields.
///
/// The signature is carried as given; producing a valid one is the caller's
/// business.
#[derive(Debug, Clone, Default)]
pub struct SignedStatementBuilder {
    issuer: Option<String>,
    subject: Option<String>,
    content_type: Option<String>,
    meta: BTreeMap<String, String>,
    payload: Option<Vec<u8>>,
    signature: Vec<u8>,
}

impl SignedStatementBuilder {
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn build(self) -> Result<SignedStatement, StatementError> {
        let mut protected = HeaderMap::new();
        protected.insert(Value::Integer(HEADER_ALG), Value::Integer(ALG_ES256));
        if let Some(content_type) = self.content_type {
            protected.insert(Value::Integer(HEADER_CONTENT_TYPE), Value::Text(content_type));
        }

        let mut claims = HeaderMap::new();
        if let Some(issuer) = self.issuer {
            claims.insert(Value::Integer(CLAIM_ISSUER), Value::Text(issuer));
        }
        if let Some(subject) = self.subject {
            claims.insert(Value::Integer(CLAIM_SUBJECT), Value::Text(subject));
        }
        if !claims.is_empty() {
            protected.insert(Value::Integer(HEADER_CWT_CLAIMS), Value::Map(claims));
        }

        if !self.meta.is_empty() {
            let meta = self
                .meta
                .into_iter()
                .map(|(k, v)| (Value::Text(k), Value::Text(v)))
                .collect();
            protected.insert(Value::Text(META_MAP_KEY.into()), Value::Map(meta));
        }

        let protected = serde_cbor::to_vec(&Value::Map(protected))
            .map_err(|e| StatementError::Encode(e.to_string()))?;
        let envelope = Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(HeaderMap::new()),
            self.payload.map_or(Value::Null, Value::Bytes),
            Value::Bytes(self.signature),
        ]);

        let mut bytes = vec![COSE_SIGN1_TAG];
        bytes.extend(
            serde_cbor::to_vec(&envelope).map_err(|e| StatementError::Encode(e.to_string()))?,
        );
        SignedStatement::from_bytes(bytes)
    }
}

/// Opaque receipt blob proving inclusion of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt(Vec<u8>);

impl Receipt {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
