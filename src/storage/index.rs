use crate::bucket::BucketSchema;
use crate::object::{Document, FieldName, FieldValue};
use compact_str::CompactString;
use im::{OrdMap, OrdSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryIndexStore {
    Multi(OrdMap<FieldValue, OrdSet<CompactString>>),
    Unique(OrdMap<FieldValue, CompactString>),
}

/// One secondary index over a single declared field. Entries map the field
/// value to the object key(s) currently holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub store: SecondaryIndexStore,
}

impl SecondaryIndex {
    pub fn new(unique: bool) -> Self {
        let store = if unique {
            SecondaryIndexStore::Unique(OrdMap::new())
        } else {
            SecondaryIndexStore::Multi(OrdMap::new())
        };
        Self { store }
    }

    pub fn insert(&mut self, value: FieldValue, key: CompactString) {
        match &mut self.store {
            SecondaryIndexStore::Multi(entries) => {
                let mut keys = entries.get(&value).cloned().unwrap_or_default();
                keys.insert(key);
                entries.insert(value, keys);
            }
            SecondaryIndexStore::Unique(entries) => {
                entries.insert(value, key);
            }
        }
    }

    pub fn remove(&mut self, value: &FieldValue, key: &str) {
        match &mut self.store {
            SecondaryIndexStore::Multi(entries) => {
                let Some(mut keys) = entries.get(value).cloned() else {
                    return;
                };
                keys.remove(key);
                if keys.is_empty() {
                    entries.remove(value);
                } else {
                    entries.insert(value.clone(), keys);
                }
            }
            SecondaryIndexStore::Unique(entries) => {
                if entries.get(value).is_some_and(|owner| owner == key) {
                    entries.remove(value);
                }
            }
        }
    }

    /// Key currently holding `value` in a unique index, if any.
    pub fn unique_owner(&self, value: &FieldValue) -> Option<&CompactString> {
        match &self.store {
            SecondaryIndexStore::Unique(entries) => entries.get(value),
            SecondaryIndexStore::Multi(_) => None,
        }
    }

    pub fn keys_eq(&self, value: &FieldValue) -> Vec<CompactString> {
        match &self.store {
            SecondaryIndexStore::Multi(entries) => entries
                .get(value)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default(),
            SecondaryIndexStore::Unique(entries) => entries
                .get(value)
                .map(|key| vec![key.clone()])
                .unwrap_or_default(),
        }
    }
}

/// Indexed (field, value) pairs a document contributes. Fields absent from
/// the document are simply not indexed.
pub fn index_entries<'a>(
    schema: &'a BucketSchema,
    value: &'a Document,
) -> impl Iterator<Item = (&'a FieldName, &'a FieldValue)> {
    schema
        .indexed_fields
        .keys()
        .filter_map(move |field| value.get(field).map(|v| (field, v)))
}
