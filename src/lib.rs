pub mod batch;
pub mod bucket;
pub mod config;
pub mod error;
#[cfg(test)]
mod lib_tests;
pub mod object;
pub mod storage;

use crate::batch::executor::CommittedWrite;
use crate::storage::Keyspace;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use crate::batch::request::{BatchOperation, BatchRequest, BatchResult, EtagEntry};
pub use crate::bucket::transform::{KeyPrefix, KeyTransform, TransformKey, WholeKey};
pub use crate::bucket::triggers::{
    CandidateRecord, CommittedRecord, PostTrigger, PreTrigger, TriggerError, TriggerFuture,
    post_trigger_fn, pre_trigger_fn,
};
pub use crate::bucket::{
    BucketOptions, BucketRegistry, BucketSchema, FieldType, IndexedField, PostTriggerPolicy,
};
pub use crate::config::CreelConfig;
pub use crate::error::{CreelError, CreelErrorCode};
pub use crate::object::{Document, Etag, FieldName, FieldValue, ObjectRecord};

use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub expected_etag: Option<Etag>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub expected_etag: Option<Etag>,
}

#[derive(Debug, Default)]
struct EngineTelemetry {
    batches_total: AtomicU64,
    batch_errors: AtomicU64,
    conflict_rejections: AtomicU64,
    objects_written: AtomicU64,
    objects_deleted: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMetrics {
    pub batches_total: u64,
    pub batch_errors: u64,
    pub conflict_rejections: u64,
    pub objects_written: u64,
    pub objects_deleted: u64,
}

struct EngineState {
    keyspace: Keyspace,
    commit_seq: u64,
}

/// A creel store: named buckets of key/document objects with secondary
/// indexes, written through an atomic batch engine.
pub struct CreelInstance {
    config: CreelConfig,
    registry: BucketRegistry,
    state: Mutex<EngineState>,
    telemetry: EngineTelemetry,
}

impl Default for CreelInstance {
    fn default() -> Self {
        Self::open(CreelConfig::default())
    }
}

impl CreelInstance {
    pub fn open(config: CreelConfig) -> Self {
        info!(
            max_batch_requests = config.max_batch_requests,
            "creel instance opened"
        );
        Self {
            config,
            registry: BucketRegistry::new(),
            state: Mutex::new(EngineState {
                keyspace: Keyspace::new(),
                commit_seq: 0,
            }),
            telemetry: EngineTelemetry::default(),
        }
    }

    pub fn create_bucket(
        &self,
        name: &str,
        schema: BucketSchema,
    ) -> Result<(), CreelError> {
        self.registry.create(name, schema)?;
        info!(bucket = name, "bucket created");
        Ok(())
    }

    /// Drops the bucket's schema and every object stored under it.
    pub async fn delete_bucket(&self, name: &str) -> Result<(), CreelError> {
        self.registry.delete(name)?;
        let mut state = self.state.lock().await;
        state.keyspace.drop_bucket(name);
        info!(bucket = name, "bucket deleted");
        Ok(())
    }

    pub fn get_bucket(&self, name: &str) -> Result<Arc<BucketSchema>, CreelError> {
        self.registry.get(name)
    }

    pub fn bucket_names(&self) -> Vec<compact_str::CompactString> {
        self.registry.names()
    }

    /// Submits a list of write requests as one atomic unit. One call, one
    /// resolution: either every request's effect is visible and the
    /// per-request etags come back in input order, or the call fails and
    /// nothing was applied (post-trigger failures are the one reported
    /// exception, the write below them being already durable).
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> Result<BatchResult, CreelError> {
        self.telemetry.batches_total.fetch_add(1, Ordering::Relaxed);
        match self.run_batch(requests).await {
            Ok(result) => Ok(result),
            Err(err) => {
                self.telemetry.batch_errors.fetch_add(1, Ordering::Relaxed);
                if matches!(
                    err.code(),
                    CreelErrorCode::UniqueViolation | CreelErrorCode::EtagConflict
                ) {
                    self.telemetry
                        .conflict_rejections
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(code = err.code_str(), "batch rejected on commit conflict");
                }
                Err(err)
            }
        }
    }

    async fn run_batch(&self, requests: Vec<BatchRequest>) -> Result<BatchResult, CreelError> {
        let resolved = batch::validation::validate_batch(&self.registry, &self.config, requests)?;
        debug!(requests = resolved.len(), "batch admitted");
        let prepared = batch::pipeline::run_pre_triggers(resolved).await?;

        let written = {
            let mut state = self.state.lock().await;
            batch::constraints::check_constraints(&state.keyspace, &prepared)?;
            let seq = state.commit_seq + 1;
            let (staged, written) = batch::executor::execute(&state.keyspace, seq, &prepared)?;
            state.keyspace = staged;
            state.commit_seq = seq;
            written
        };
        self.count_writes(&written);

        batch::pipeline::run_post_triggers(&written).await?;
        Ok(batch::assemble_results(written))
    }

    fn count_writes(&self, written: &[CommittedWrite]) {
        let puts = written.iter().filter(|w| w.etag.is_some()).count() as u64;
        let deletes = written.len() as u64 - puts;
        self.telemetry
            .objects_written
            .fetch_add(puts, Ordering::Relaxed);
        self.telemetry
            .objects_deleted
            .fetch_add(deletes, Ordering::Relaxed);
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectRecord, CreelError> {
        self.registry.get(bucket)?;
        let state = self.state.lock().await;
        let object = state
            .keyspace
            .get(bucket, key)
            .ok_or_else(|| CreelError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(ObjectRecord {
            bucket: bucket.into(),
            key: key.into(),
            value: object.value.clone(),
            etag: object.etag.clone(),
            seq: object.seq,
        })
    }

    /// Single-object write, routed through the batch pipeline so triggers,
    /// index constraints, and etag semantics match `batch()` exactly.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        value: Document,
        options: PutOptions,
    ) -> Result<Etag, CreelError> {
        let mut request = BatchRequest::put(bucket, key, value);
        request.expected_etag = options.expected_etag;
        let mut result = self.batch(vec![request]).await?;
        result
            .etags
            .pop()
            .and_then(|entry| entry.etag)
            .ok_or_else(|| CreelError::Unavailable {
                message: "put produced no etag entry".into(),
            })
    }

    pub async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        options: DeleteOptions,
    ) -> Result<(), CreelError> {
        let mut request = BatchRequest::delete(bucket, key);
        request.expected_etag = options.expected_etag;
        self.batch(vec![request]).await?;
        Ok(())
    }

    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            batches_total: self.telemetry.batches_total.load(Ordering::Relaxed),
            batch_errors: self.telemetry.batch_errors.load(Ordering::Relaxed),
            conflict_rejections: self.telemetry.conflict_rejections.load(Ordering::Relaxed),
            objects_written: self.telemetry.objects_written.load(Ordering::Relaxed),
            objects_deleted: self.telemetry.objects_deleted.load(Ordering::Relaxed),
        }
    }
}
