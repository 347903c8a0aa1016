use crate::object::{Document, Etag};
use compact_str::CompactString;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a trigger through its completion future.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TriggerError(pub String);

impl TriggerError {
    pub fn new(message: impl Into<String>) -> Self {
        TriggerError(message.into())
    }
}

pub type TriggerFuture<'a> = BoxFuture<'a, Result<(), TriggerError>>;

/// The mutable candidate handed to pre-commit triggers. Bucket and key are
/// fixed for the lifetime of the record; only the value may be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    bucket: CompactString,
    key: CompactString,
    pub value: Document,
}

impl CandidateRecord {
    pub fn new(
        bucket: impl Into<CompactString>,
        key: impl Into<CompactString>,
        value: Document,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            value,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn into_value(self) -> Document {
        self.value
    }
}

/// The immutable view handed to post-commit triggers after the write is
/// durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedRecord {
    pub bucket: CompactString,
    pub key: CompactString,
    pub value: Document,
    pub etag: Etag,
}

/// Pre-commit hook. Hooks for one object run sequentially in declared
/// order; a failure aborts the batch before any mutation.
pub trait PreTrigger: Send + Sync {
    fn name(&self) -> &str {
        "pre-trigger"
    }

    fn run<'a>(&'a self, record: &'a mut CandidateRecord) -> TriggerFuture<'a>;
}

/// Post-commit hook. Runs after the durable write; a failure cannot unwind
/// the write and is reported per the bucket's post-trigger policy.
pub trait PostTrigger: Send + Sync {
    fn name(&self) -> &str {
        "post-trigger"
    }

    fn run<'a>(&'a self, record: &'a CommittedRecord) -> TriggerFuture<'a>;
}

struct FnPreTrigger<F> {
    name: String,
    f: F,
}

impl<F> PreTrigger for FnPreTrigger<F>
where
    F: Fn(&mut CandidateRecord) -> Result<(), TriggerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, record: &'a mut CandidateRecord) -> TriggerFuture<'a> {
        let result = (self.f)(record);
        Box::pin(async move { result })
    }
}

struct FnPostTrigger<F> {
    name: String,
    f: F,
}

impl<F> PostTrigger for FnPostTrigger<F>
where
    F: Fn(&CommittedRecord) -> Result<(), TriggerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, record: &'a CommittedRecord) -> TriggerFuture<'a> {
        let result = (self.f)(record);
        Box::pin(async move { result })
    }
}

/// Wraps a synchronous closure as a pre-commit trigger. Triggers doing
/// async work implement [`PreTrigger`] directly.
pub fn pre_trigger_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn PreTrigger>
where
    F: Fn(&mut CandidateRecord) -> Result<(), TriggerError> + Send + Sync + 'static,
{
    Arc::new(FnPreTrigger {
        name: name.into(),
        f,
    })
}

/// Wraps a synchronous closure as a post-commit trigger.
pub fn post_trigger_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn PostTrigger>
where
    F: Fn(&CommittedRecord) -> Result<(), TriggerError> + Send + Sync + 'static,
{
    Arc::new(FnPostTrigger {
        name: name.into(),
        f,
    })
}

impl fmt::Debug for dyn PreTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreTrigger({})", self.name())
    }
}

impl fmt::Debug for dyn PostTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostTrigger({})", self.name())
    }
}
