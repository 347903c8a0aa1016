use crate::error::CreelError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub type FieldName = CompactString;

/// A single field value inside a stored document. Numbers are kept as f64
/// with total ordering so index keys sort deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Number(f64),
    Text(CompactString),
    Array(Vec<FieldValue>),
    Object(BTreeMap<FieldName, FieldValue>),
}

impl FieldValue {
    fn kind_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Boolean(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::Array(_) => 4,
            FieldValue::Object(_) => 5,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Object(_) => "object",
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }

        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Array(a), FieldValue::Array(b)) => a.cmp(b),
            (FieldValue::Object(a), FieldValue::Object(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(b),
            serde_json::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => FieldValue::Text(s.into()),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(entries) => FieldValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (FieldName::from(k), FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The value side of one object: a flat-to-nested field map, the unit a
/// batch Put writes and a pre-trigger may rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub fields: BTreeMap<FieldName, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts a JSON object into a document. Non-object values are
    /// rejected since an object's value is always a field map.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CreelError> {
        match FieldValue::from(value) {
            FieldValue::Object(fields) => Ok(Self { fields }),
            other => Err(CreelError::Validation(format!(
                "document must be a JSON object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Canonical byte encoding (msgpack), used for etag derivation and as
    /// the wire form of stored values.
    pub fn encode(&self) -> Result<Vec<u8>, CreelError> {
        rmp_serde::to_vec(self).map_err(|e| CreelError::Encode(e.to_string()))
    }
}

/// Opaque content-version token. Distinct per (bucket, key, commit
/// sequence, value bytes); equal only when all four match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Etag(CompactString);

impl Etag {
    pub(crate) fn derive(bucket: &str, key: &str, seq: u64, encoded_value: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bucket.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(seq.to_be_bytes());
        hasher.update(encoded_value);
        let digest = hasher.finalize();
        Etag(hex::encode(&digest[..8]).into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for Etag {
    fn from(value: &str) -> Self {
        Etag(value.into())
    }
}

/// One object as read back out of a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub bucket: CompactString,
    pub key: CompactString,
    pub value: Document,
    pub etag: Etag,
    pub seq: u64,
}

#[cfg(test)]
mod tests {
    use super::{Document, Etag, FieldValue};

    #[test]
    fn field_values_order_across_kinds() {
        let mut values = vec![
            FieldValue::Text("a".into()),
            FieldValue::Number(3.0),
            FieldValue::Boolean(true),
            FieldValue::Null,
        ];
        values.sort();
        assert_eq!(values[0], FieldValue::Null);
        assert_eq!(values[3], FieldValue::Text("a".into()));
    }

    #[test]
    fn number_ordering_is_total() {
        let neg = FieldValue::Number(-1.5);
        let pos = FieldValue::Number(2.0);
        let nan = FieldValue::Number(f64::NAN);
        assert!(neg < pos);
        assert!(pos < nan, "NaN sorts after all finite values");
        assert_eq!(nan, FieldValue::Number(f64::NAN));
    }

    #[test]
    fn document_builder_and_json_conversion_agree() {
        let built = Document::new()
            .set("name", "laggar")
            .set("count", 4i64)
            .set("live", true);
        let parsed = Document::from_json(serde_json::json!({
            "name": "laggar",
            "count": 4,
            "live": true,
        }))
        .expect("object json");
        assert_eq!(built, parsed);
        assert_eq!(built.get("count"), Some(&FieldValue::Number(4.0)));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = Document::from_json(serde_json::json!([1, 2])).expect_err("array");
        assert_eq!(err.code_str(), "validation");
    }

    #[test]
    fn document_encoding_roundtrips() {
        let doc = Document::new().set("a", 1i64).set("b", "two");
        let bytes = doc.encode().expect("encode");
        let decoded: Document = rmp_serde::from_slice(&bytes).expect("decode");
        assert_eq!(doc, decoded);
    }

    #[test]
    fn etag_tracks_every_input() {
        let bytes = Document::new().set("a", 1i64).encode().expect("encode");
        let base = Etag::derive("b", "k", 7, &bytes);
        assert_eq!(base, Etag::derive("b", "k", 7, &bytes));
        assert_ne!(base, Etag::derive("b2", "k", 7, &bytes));
        assert_ne!(base, Etag::derive("b", "k2", 7, &bytes));
        assert_ne!(base, Etag::derive("b", "k", 8, &bytes));
        assert_ne!(base, Etag::derive("b", "k", 7, b"other"));
        assert_eq!(base.as_str().len(), 16);
    }
}
