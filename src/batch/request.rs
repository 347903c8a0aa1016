use crate::object::{Document, Etag};
use compact_str::CompactString;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Closed set of batch operations. Anything else submitted on the wire
/// lands on `Unrecognized` carrying the literal tag, so rejection can name
/// exactly what the caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BatchOperation {
    #[default]
    Put,
    Delete,
    Unrecognized(String),
}

impl BatchOperation {
    pub fn as_str(&self) -> &str {
        match self {
            BatchOperation::Put => "put",
            BatchOperation::Delete => "delete",
            BatchOperation::Unrecognized(op) => op,
        }
    }
}

impl Serialize for BatchOperation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BatchOperation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "put" => BatchOperation::Put,
            "delete" => BatchOperation::Delete,
            _ => BatchOperation::Unrecognized(tag),
        })
    }
}

/// One write request inside a batch. `operation` defaults to Put when
/// absent from the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub operation: BatchOperation,
    pub bucket: CompactString,
    pub key: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_etag: Option<Etag>,
}

impl BatchRequest {
    pub fn put(
        bucket: impl Into<CompactString>,
        key: impl Into<CompactString>,
        value: Document,
    ) -> Self {
        Self {
            operation: BatchOperation::Put,
            bucket: bucket.into(),
            key: key.into(),
            value: Some(value),
            expected_etag: None,
        }
    }

    pub fn delete(bucket: impl Into<CompactString>, key: impl Into<CompactString>) -> Self {
        Self {
            operation: BatchOperation::Delete,
            bucket: bucket.into(),
            key: key.into(),
            value: None,
            expected_etag: None,
        }
    }

    pub fn with_expected_etag(mut self, etag: Etag) -> Self {
        self.expected_etag = Some(etag);
        self
    }
}

/// Per-request result entry. `etag` is present for Put-class results and
/// absent for Delete; `key` is the literal request key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtagEntry {
    pub bucket: CompactString,
    pub key: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<Etag>,
}

/// Ordered results of one batch call, positionally matching the input
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub etags: Vec<EtagEntry>,
}
