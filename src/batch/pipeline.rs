use crate::batch::executor::CommittedWrite;
use crate::batch::request::BatchOperation;
use crate::batch::validation::ResolvedRequest;
use crate::bucket::BucketSchema;
use crate::bucket::triggers::{CandidateRecord, CommittedRecord};
use crate::bucket::PostTriggerPolicy;
use crate::error::CreelError;
use crate::object::{Document, Etag};
use compact_str::CompactString;
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use tracing::warn;

/// A request whose pre-commit phase is complete: the candidate value holds
/// every pre-trigger rewrite and is what the executor will persist.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub index: usize,
    pub bucket: CompactString,
    pub key: CompactString,
    pub schema: Arc<BucketSchema>,
    pub action: PreparedAction,
    pub expected_etag: Option<Etag>,
}

#[derive(Debug, Clone)]
pub enum PreparedAction {
    Put(Document),
    Delete,
}

/// Runs every object's pre-trigger chain. Chains for distinct objects run
/// concurrently; hooks within one chain run sequentially in declared order
/// since later hooks may depend on earlier mutations. Any failure aborts
/// the batch before any mutation is staged.
pub async fn run_pre_triggers(
    resolved: Vec<ResolvedRequest>,
) -> Result<Vec<PreparedRequest>, CreelError> {
    try_join_all(resolved.into_iter().map(prepare_one)).await
}

async fn prepare_one(resolved: ResolvedRequest) -> Result<PreparedRequest, CreelError> {
    let ResolvedRequest {
        index,
        request,
        schema,
        ..
    } = resolved;
    let action = match request.operation {
        BatchOperation::Put => {
            let value = request.value.ok_or_else(|| CreelError::ValueRequired {
                bucket: request.bucket.to_string(),
                key: request.key.to_string(),
            })?;
            let mut record =
                CandidateRecord::new(request.bucket.clone(), request.key.clone(), value);
            for trigger in &schema.pre_triggers {
                trigger
                    .run(&mut record)
                    .await
                    .map_err(|e| CreelError::PreTriggerFailed {
                        bucket: request.bucket.to_string(),
                        key: request.key.to_string(),
                        trigger: trigger.name().to_string(),
                        message: e.to_string(),
                    })?;
            }
            PreparedAction::Put(record.into_value())
        }
        // Deletes carry no value, so there is nothing for a hook to
        // transform; they skip the pipeline entirely.
        BatchOperation::Delete => PreparedAction::Delete,
        BatchOperation::Unrecognized(operation) => {
            return Err(CreelError::OperationNotAllowed { operation });
        }
    };
    Ok(PreparedRequest {
        index,
        bucket: request.bucket,
        key: request.key,
        schema,
        action,
        expected_etag: request.expected_etag,
    })
}

/// Runs post-commit chains for every written object. The writes are
/// already durable; a failure here is surfaced (or logged, per the
/// bucket's policy) but never unwinds the transaction. The first failing
/// object in input order is the one reported.
pub async fn run_post_triggers(written: &[CommittedWrite]) -> Result<(), CreelError> {
    let outcomes = join_all(written.iter().map(post_chain_for)).await;
    match outcomes.into_iter().find_map(Result::err) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn post_chain_for(write: &CommittedWrite) -> Result<(), CreelError> {
    let (Some(value), Some(etag)) = (&write.value, &write.etag) else {
        return Ok(());
    };
    if write.schema.post_triggers.is_empty() {
        return Ok(());
    }
    let record = CommittedRecord {
        bucket: write.bucket.clone(),
        key: write.key.clone(),
        value: value.clone(),
        etag: etag.clone(),
    };
    for trigger in &write.schema.post_triggers {
        if let Err(e) = trigger.run(&record).await {
            match write.schema.options.post_trigger_policy {
                PostTriggerPolicy::Report => {
                    return Err(CreelError::PostTriggerFailed {
                        bucket: write.bucket.to_string(),
                        key: write.key.to_string(),
                        trigger: trigger.name().to_string(),
                        message: e.to_string(),
                    });
                }
                PostTriggerPolicy::Ignore => {
                    warn!(
                        bucket = %write.bucket,
                        key = %write.key,
                        trigger = trigger.name(),
                        error = %e,
                        "post-trigger failed after durable write, ignoring per bucket policy"
                    );
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{PreparedAction, run_pre_triggers};
    use crate::batch::request::BatchRequest;
    use crate::batch::validation::ResolvedRequest;
    use crate::bucket::BucketSchema;
    use crate::bucket::triggers::{CandidateRecord, TriggerError, pre_trigger_fn};
    use crate::object::{Document, FieldValue};
    use std::sync::Arc;

    fn resolved_put(schema: BucketSchema, key: &str, value: Document) -> ResolvedRequest {
        let schema = Arc::new(schema);
        let transform_key = schema.key_transform.transform("b", key);
        ResolvedRequest {
            index: 0,
            request: BatchRequest::put("b", key, value),
            schema,
            transform_key,
        }
    }

    #[tokio::test]
    async fn pre_triggers_run_in_declared_order() {
        let schema = BucketSchema::new()
            .with_pre_trigger(pre_trigger_fn("first", |r: &mut CandidateRecord| {
                r.value.insert("trail", "first");
                Ok(())
            }))
            .with_pre_trigger(pre_trigger_fn("second", |r: &mut CandidateRecord| {
                let Some(FieldValue::Text(prior)) = r.value.get("trail").cloned() else {
                    return Err(TriggerError::new("first trigger has not run"));
                };
                r.value.insert("trail", format!("{prior},second").as_str());
                Ok(())
            }));
        let prepared = run_pre_triggers(vec![resolved_put(schema, "k", Document::new())])
            .await
            .expect("pipeline");
        let PreparedAction::Put(value) = &prepared[0].action else {
            panic!("expected put");
        };
        assert_eq!(
            value.get("trail"),
            Some(&FieldValue::Text("first,second".into()))
        );
    }

    #[tokio::test]
    async fn pre_trigger_failure_carries_object_and_trigger_names() {
        let schema = BucketSchema::new().with_pre_trigger(pre_trigger_fn(
            "guard",
            |_: &mut CandidateRecord| Err(TriggerError::new("nope")),
        ));
        let err = run_pre_triggers(vec![resolved_put(schema, "k1", Document::new())])
            .await
            .expect_err("must fail");
        assert_eq!(err.code_str(), "pre_trigger_failed");
        assert_eq!(
            err.to_string(),
            "pre-trigger 'guard' failed for b/k1: nope"
        );
    }

    #[tokio::test]
    async fn deletes_skip_pre_triggers() {
        let schema = BucketSchema::new().with_pre_trigger(pre_trigger_fn(
            "never",
            |_: &mut CandidateRecord| Err(TriggerError::new("should not run")),
        ));
        let schema = Arc::new(schema);
        let request = BatchRequest::delete("b", "k");
        let transform_key = schema.key_transform.transform("b", "k");
        let prepared = run_pre_triggers(vec![ResolvedRequest {
            index: 0,
            request,
            schema,
            transform_key,
        }])
        .await
        .expect("delete bypasses hooks");
        assert!(matches!(prepared[0].action, PreparedAction::Delete));
    }
}
