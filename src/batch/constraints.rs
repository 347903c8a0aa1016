use crate::batch::pipeline::{PreparedAction, PreparedRequest};
use crate::error::CreelError;
use crate::storage::Keyspace;
use std::collections::HashSet;

/// Validation-time pass over index constraints: declared field types must
/// match the (post-trigger) candidate values, and unique fields must not
/// collide with live objects. A key deleted earlier in the same batch does
/// not count as a holder. Uniqueness is re-verified transactionally at
/// commit, so a conflict that slips past this pass still cannot be
/// persisted.
pub fn check_constraints(
    keyspace: &Keyspace,
    prepared: &[PreparedRequest],
) -> Result<(), CreelError> {
    let deleted: HashSet<(&str, &str)> = prepared
        .iter()
        .filter(|r| matches!(r.action, PreparedAction::Delete))
        .map(|r| (r.bucket.as_str(), r.key.as_str()))
        .collect();

    for request in prepared {
        let PreparedAction::Put(value) = &request.action else {
            continue;
        };
        for (field, declared) in &request.schema.indexed_fields {
            let Some(field_value) = value.get(field) else {
                continue;
            };
            if !declared.field_type.matches(field_value) {
                return Err(CreelError::TypeMismatch {
                    bucket: request.bucket.to_string(),
                    field: field.to_string(),
                    expected: declared.field_type.as_str().to_string(),
                    actual: field_value.type_name().to_string(),
                });
            }
            if !declared.unique {
                continue;
            }
            let holder = keyspace.unique_owner(&request.bucket, field, field_value);
            let conflicting = holder.is_some_and(|holder| {
                holder != &request.key
                    && !deleted.contains(&(request.bucket.as_str(), holder.as_str()))
            });
            if conflicting {
                return Err(CreelError::UniqueViolation {
                    bucket: request.bucket.to_string(),
                    field: field.to_string(),
                });
            }
        }
    }
    Ok(())
}
