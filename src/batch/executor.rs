use crate::batch::pipeline::{PreparedAction, PreparedRequest};
use crate::bucket::BucketSchema;
use crate::error::CreelError;
use crate::object::{Document, Etag};
use crate::storage::{Keyspace, StoredObject};
use compact_str::CompactString;
use std::sync::Arc;

/// One applied operation, stamped with its post-commit etag (Puts only).
#[derive(Debug, Clone)]
pub struct CommittedWrite {
    pub index: usize,
    pub bucket: CompactString,
    pub key: CompactString,
    pub schema: Arc<BucketSchema>,
    pub value: Option<Document>,
    pub etag: Option<Etag>,
}

/// Applies every prepared operation as one transaction. All mutation
/// happens on a clone of the keyspace; the clone is returned for the
/// caller to swap in only on full success, so a failure anywhere leaves
/// the visible state untouched. Expected-etag and unique-index checks run
/// here, against staged state, which is what makes them commit-time
/// verifications rather than advisory ones.
pub fn execute(
    keyspace: &Keyspace,
    commit_seq: u64,
    prepared: &[PreparedRequest],
) -> Result<(Keyspace, Vec<CommittedWrite>), CreelError> {
    let mut staged = keyspace.clone();
    let mut written: Vec<Option<CommittedWrite>> = vec![None; prepared.len()];

    for position in application_order(prepared) {
        let request = &prepared[position];
        check_expected_etag(&staged, request)?;
        let write = match &request.action {
            PreparedAction::Put(value) => {
                let encoded = value.encode()?;
                let etag = Etag::derive(&request.bucket, &request.key, commit_seq, &encoded);
                staged.insert(
                    &request.schema,
                    &request.bucket,
                    &request.key,
                    StoredObject {
                        value: value.clone(),
                        etag: etag.clone(),
                        seq: commit_seq,
                    },
                )?;
                CommittedWrite {
                    index: request.index,
                    bucket: request.bucket.clone(),
                    key: request.key.clone(),
                    schema: Arc::clone(&request.schema),
                    value: Some(value.clone()),
                    etag: Some(etag),
                }
            }
            PreparedAction::Delete => {
                if staged
                    .remove(&request.schema, &request.bucket, &request.key)
                    .is_none()
                {
                    return Err(CreelError::ObjectNotFound {
                        bucket: request.bucket.to_string(),
                        key: request.key.to_string(),
                    });
                }
                CommittedWrite {
                    index: request.index,
                    bucket: request.bucket.clone(),
                    key: request.key.clone(),
                    schema: Arc::clone(&request.schema),
                    value: None,
                    etag: None,
                }
            }
        };
        written[position] = Some(write);
    }

    let written = written
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CreelError::Unavailable {
            message: "transaction produced an incomplete write set".into(),
        })?;
    Ok((staged, written))
}

/// Application order inside the transaction. Buckets with guarantee_order
/// keep strict request order for their operations. For the rest, deletes
/// are applied ahead of puts; relative ordering among same-key operations
/// in those buckets is unspecified by contract.
fn application_order(prepared: &[PreparedRequest]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..prepared.len()).collect();
    order.sort_by_key(|&position| {
        let request = &prepared[position];
        let early_delete = !request.schema.options.guarantee_order
            && matches!(request.action, PreparedAction::Delete);
        (if early_delete { 0u8 } else { 1 }, position)
    });
    order
}

fn check_expected_etag(staged: &Keyspace, request: &PreparedRequest) -> Result<(), CreelError> {
    let Some(expected) = &request.expected_etag else {
        return Ok(());
    };
    let actual = staged
        .get(&request.bucket, &request.key)
        .map(|object| object.etag.clone());
    match &actual {
        Some(etag) if etag == expected => Ok(()),
        _ => Err(CreelError::EtagConflict {
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            expected: expected.clone(),
            actual,
        }),
    }
}
