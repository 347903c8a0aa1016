use compact_str::CompactString;
use std::fmt;

/// Derived value used only to check cross-request consistency within one
/// batch call. Not the storage key; compared across buckets as a plain
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformKey(CompactString);

impl TransformKey {
    pub fn new(value: impl Into<CompactString>) -> Self {
        TransformKey(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Per-bucket key resolution rule. Must be a pure function of the bucket
/// name and literal key; implementations must not consult stored state.
pub trait KeyTransform: Send + Sync {
    fn transform(&self, bucket: &str, key: &str) -> TransformKey;
}

/// Default rule: the transform key is the literal key.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeKey;

impl KeyTransform for WholeKey {
    fn transform(&self, _bucket: &str, key: &str) -> TransformKey {
        TransformKey::new(key)
    }
}

/// Container grouping: the transform key is the key segment before the
/// first delimiter, or the whole key when no delimiter is present. Keys
/// under one prefix resolve to the same transform key.
#[derive(Debug, Clone, Copy)]
pub struct KeyPrefix {
    pub delimiter: char,
}

impl KeyPrefix {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }
}

impl KeyTransform for KeyPrefix {
    fn transform(&self, _bucket: &str, key: &str) -> TransformKey {
        match key.find(self.delimiter) {
            Some(pos) => TransformKey::new(&key[..pos]),
            None => TransformKey::new(key),
        }
    }
}
