use crate::batch::request::{BatchOperation, BatchRequest};
use crate::bucket::transform::TransformKey;
use crate::bucket::{BucketRegistry, BucketSchema};
use crate::config::CreelConfig;
use crate::error::CreelError;
use std::sync::Arc;

/// A request that passed whole-batch validation, carrying its bucket
/// schema and transform key forward into the pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub index: usize,
    pub request: BatchRequest,
    pub schema: Arc<BucketSchema>,
    pub transform_key: TransformKey,
}

/// Validates a batch as a unit. Operation legality is checked across the
/// whole batch before the transform-key invariant, so an unsupported
/// operation fails fast even alongside otherwise-consistent requests. On
/// any failure nothing is executed and there is no partial result.
pub fn validate_batch(
    registry: &BucketRegistry,
    config: &CreelConfig,
    requests: Vec<BatchRequest>,
) -> Result<Vec<ResolvedRequest>, CreelError> {
    if requests.is_empty() {
        return Err(CreelError::EmptyBatch);
    }
    if requests.len() > config.max_batch_requests {
        return Err(CreelError::Validation(format!(
            "batch of {} requests exceeds maximum {}",
            requests.len(),
            config.max_batch_requests
        )));
    }

    for request in &requests {
        if let BatchOperation::Unrecognized(operation) = &request.operation {
            return Err(CreelError::OperationNotAllowed {
                operation: operation.clone(),
            });
        }
    }

    let mut resolved = Vec::with_capacity(requests.len());
    for (index, request) in requests.into_iter().enumerate() {
        let schema = registry.get(&request.bucket)?;
        let transform_key = schema.key_transform.transform(&request.bucket, &request.key);
        resolved.push(ResolvedRequest {
            index,
            request,
            schema,
            transform_key,
        });
    }

    let first_key = &resolved[0].transform_key;
    if resolved.iter().any(|r| &r.transform_key != first_key) {
        return Err(CreelError::TransformKeyMismatch);
    }

    for entry in &resolved {
        check_request_shape(config, &entry.request)?;
    }

    Ok(resolved)
}

fn check_request_shape(config: &CreelConfig, request: &BatchRequest) -> Result<(), CreelError> {
    if request.key.is_empty() {
        return Err(CreelError::Validation(format!(
            "request for bucket '{}' has an empty key",
            request.bucket
        )));
    }
    if request.key.len() > config.max_key_bytes {
        return Err(CreelError::Validation(format!(
            "key size {} exceeds maximum {}",
            request.key.len(),
            config.max_key_bytes
        )));
    }
    match request.operation {
        BatchOperation::Put => {
            let Some(value) = &request.value else {
                return Err(CreelError::ValueRequired {
                    bucket: request.bucket.to_string(),
                    key: request.key.to_string(),
                });
            };
            let encoded_len = value.encode()?.len();
            if encoded_len > config.max_value_bytes {
                return Err(CreelError::Validation(format!(
                    "value size {} exceeds maximum {}",
                    encoded_len, config.max_value_bytes
                )));
            }
        }
        // Delete ignores any submitted value.
        BatchOperation::Delete => {}
        BatchOperation::Unrecognized(_) => {}
    }
    Ok(())
}
