pub mod index;

use crate::bucket::BucketSchema;
use crate::error::CreelError;
use crate::object::{Document, Etag, FieldName, FieldValue};
use compact_str::CompactString;
use im::OrdMap;
use index::{SecondaryIndex, index_entries};

/// One persisted object version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub value: Document,
    pub etag: Etag,
    pub seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketData {
    pub objects: OrdMap<CompactString, StoredObject>,
    pub indexes: im::HashMap<FieldName, SecondaryIndex>,
}

/// In-memory object state for every bucket. All inner maps are persistent
/// structures, so cloning a keyspace is cheap and a clone can be mutated
/// and swapped in as one atomic transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyspace {
    buckets: im::HashMap<CompactString, BucketData>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<&StoredObject> {
        self.buckets.get(bucket)?.objects.get(key)
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .get(bucket)
            .map(|data| data.objects.len())
            .unwrap_or(0)
    }

    /// Key currently holding `value` under a unique index on `field`.
    pub fn unique_owner(&self, bucket: &str, field: &str, value: &FieldValue) -> Option<&CompactString> {
        self.buckets
            .get(bucket)?
            .indexes
            .get(field)?
            .unique_owner(value)
    }

    /// Writes one object and maintains the bucket's secondary indexes.
    /// Fails with a unique violation when another live key already holds
    /// one of the object's unique field values. Callers stage writes on a
    /// keyspace clone, so a failure mid-way leaves the visible state
    /// untouched.
    pub fn insert(
        &mut self,
        schema: &BucketSchema,
        bucket: &str,
        key: &str,
        object: StoredObject,
    ) -> Result<(), CreelError> {
        let mut data = self.buckets.get(bucket).cloned().unwrap_or_default();

        if let Some(previous) = data.objects.get(key).cloned() {
            unindex_object(&mut data, schema, key, &previous.value);
        }

        for (field, value) in index_entries(schema, &object.value) {
            let declared = &schema.indexed_fields[field];
            if declared.unique {
                let owner = data
                    .indexes
                    .get(field.as_str())
                    .and_then(|idx| idx.unique_owner(value));
                if owner.is_some_and(|owner| owner != key) {
                    return Err(CreelError::UniqueViolation {
                        bucket: bucket.to_string(),
                        field: field.to_string(),
                    });
                }
            }
            let mut idx = data
                .indexes
                .get(field.as_str())
                .cloned()
                .unwrap_or_else(|| SecondaryIndex::new(declared.unique));
            idx.insert(value.clone(), key.into());
            data.indexes.insert(field.clone(), idx);
        }

        data.objects.insert(key.into(), object);
        self.buckets.insert(bucket.into(), data);
        Ok(())
    }

    /// Removes one object and its index entries. Returns the removed
    /// version, or None when the key was absent.
    pub fn remove(&mut self, schema: &BucketSchema, bucket: &str, key: &str) -> Option<StoredObject> {
        let mut data = self.buckets.get(bucket).cloned()?;
        let removed = data.objects.remove(key)?;
        unindex_object(&mut data, schema, key, &removed.value);
        self.buckets.insert(bucket.into(), data);
        Some(removed)
    }

    pub fn drop_bucket(&mut self, bucket: &str) {
        self.buckets.remove(bucket);
    }
}

fn unindex_object(data: &mut BucketData, schema: &BucketSchema, key: &str, value: &Document) {
    for (field, field_value) in index_entries(schema, value) {
        let Some(mut idx) = data.indexes.get(field.as_str()).cloned() else {
            continue;
        };
        idx.remove(field_value, key);
        data.indexes.insert(field.clone(), idx);
    }
}
