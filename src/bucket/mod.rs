pub mod transform;
pub mod triggers;

use crate::error::CreelError;
use crate::object::{FieldName, FieldValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use transform::{KeyTransform, WholeKey};
use triggers::{PostTrigger, PreTrigger};

/// Declared type of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }

    pub fn matches(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::String, FieldValue::Text(_))
                | (FieldType::Number, FieldValue::Number(_))
                | (FieldType::Boolean, FieldValue::Boolean(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedField {
    pub field_type: FieldType,
    pub unique: bool,
}

/// What to do when a post-commit trigger fails. The write is durable
/// either way; the policy only controls whether the caller hears about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostTriggerPolicy {
    #[default]
    Report,
    Ignore,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketOptions {
    /// Serialize same-key operations in request order inside one batch
    /// transaction. When unset, relative ordering among same-key
    /// operations is unspecified.
    pub guarantee_order: bool,
    pub post_trigger_policy: PostTriggerPolicy,
}

/// Per-bucket declaration: indexed fields, lifecycle triggers, options,
/// and the key transform used for the batch consistency check. Read-only
/// to the batch engine during a call.
#[derive(Clone)]
pub struct BucketSchema {
    pub indexed_fields: BTreeMap<FieldName, IndexedField>,
    pub pre_triggers: Vec<Arc<dyn PreTrigger>>,
    pub post_triggers: Vec<Arc<dyn PostTrigger>>,
    pub options: BucketOptions,
    pub key_transform: Arc<dyn KeyTransform>,
}

impl Default for BucketSchema {
    fn default() -> Self {
        Self {
            indexed_fields: BTreeMap::new(),
            pre_triggers: Vec::new(),
            post_triggers: Vec::new(),
            options: BucketOptions::default(),
            key_transform: Arc::new(WholeKey),
        }
    }
}

impl fmt::Debug for BucketSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketSchema")
            .field("indexed_fields", &self.indexed_fields)
            .field("pre_triggers", &self.pre_triggers.len())
            .field("post_triggers", &self.post_triggers.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BucketSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(
        mut self,
        field: impl Into<FieldName>,
        field_type: FieldType,
        unique: bool,
    ) -> Self {
        self.indexed_fields
            .insert(field.into(), IndexedField { field_type, unique });
        self
    }

    pub fn with_pre_trigger(mut self, trigger: Arc<dyn PreTrigger>) -> Self {
        self.pre_triggers.push(trigger);
        self
    }

    pub fn with_post_trigger(mut self, trigger: Arc<dyn PostTrigger>) -> Self {
        self.post_triggers.push(trigger);
        self
    }

    pub fn with_key_transform(mut self, transform: Arc<dyn KeyTransform>) -> Self {
        self.key_transform = transform;
        self
    }

    pub fn with_guarantee_order(mut self, guarantee_order: bool) -> Self {
        self.options.guarantee_order = guarantee_order;
        self
    }

    pub fn with_post_trigger_policy(mut self, policy: PostTriggerPolicy) -> Self {
        self.options.post_trigger_policy = policy;
        self
    }

    fn validate(&self) -> Result<(), CreelError> {
        for field in self.indexed_fields.keys() {
            if field.is_empty() {
                return Err(CreelError::Validation(
                    "indexed field name cannot be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Registry owning bucket schemas. Schemas are handed out as Arcs so a
/// batch call observes one consistent schema even across concurrent DDL.
#[derive(Default)]
pub struct BucketRegistry {
    buckets: RwLock<HashMap<CompactString, Arc<BucketSchema>>>,
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, name: impl Into<CompactString>, schema: BucketSchema) -> Result<(), CreelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CreelError::Validation("bucket name cannot be empty".into()));
        }
        schema.validate()?;
        let mut buckets = self.buckets.write();
        if buckets.contains_key(&name) {
            return Err(CreelError::BucketAlreadyExists(name.into()));
        }
        buckets.insert(name, Arc::new(schema));
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), CreelError> {
        let mut buckets = self.buckets.write();
        if buckets.remove(name).is_none() {
            return Err(CreelError::BucketNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<BucketSchema>, CreelError> {
        self.buckets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CreelError::BucketNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buckets.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<CompactString> {
        let mut names: Vec<CompactString> = self.buckets.read().keys().cloned().collect();
        names.sort();
        names
    }
}
