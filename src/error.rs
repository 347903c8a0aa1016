use crate::object::Etag;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreelErrorCode {
    Encode,
    Decode,
    Validation,
    EmptyBatch,
    OperationNotAllowed,
    TransformKeyMismatch,
    ValueRequired,
    BucketAlreadyExists,
    BucketNotFound,
    ObjectNotFound,
    TypeMismatch,
    UniqueViolation,
    EtagConflict,
    PreTriggerFailed,
    PostTriggerFailed,
    Unavailable,
}

impl CreelErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CreelErrorCode::Encode => "encode",
            CreelErrorCode::Decode => "decode",
            CreelErrorCode::Validation => "validation",
            CreelErrorCode::EmptyBatch => "empty_batch",
            CreelErrorCode::OperationNotAllowed => "operation_not_allowed",
            CreelErrorCode::TransformKeyMismatch => "transform_key_mismatch",
            CreelErrorCode::ValueRequired => "value_required",
            CreelErrorCode::BucketAlreadyExists => "bucket_already_exists",
            CreelErrorCode::BucketNotFound => "bucket_not_found",
            CreelErrorCode::ObjectNotFound => "object_not_found",
            CreelErrorCode::TypeMismatch => "type_mismatch",
            CreelErrorCode::UniqueViolation => "unique_violation",
            CreelErrorCode::EtagConflict => "etag_conflict",
            CreelErrorCode::PreTriggerFailed => "pre_trigger_failed",
            CreelErrorCode::PostTriggerFailed => "post_trigger_failed",
            CreelErrorCode::Unavailable => "unavailable",
        }
    }
}

fn fmt_etag(etag: &Option<Etag>) -> String {
    match etag {
        Some(etag) => etag.to_string(),
        None => "(absent)".to_string(),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CreelError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("batch must contain at least one request")]
    EmptyBatch,
    #[error("\"{operation}\" is not an allowed batch operation")]
    OperationNotAllowed { operation: String },
    #[error("all requests must transform to the same key")]
    TransformKeyMismatch,
    #[error("put request for {bucket}/{key} requires a value")]
    ValueRequired { bucket: String, key: String },
    #[error("bucket '{0}' already exists")]
    BucketAlreadyExists(String),
    #[error("bucket '{0}' not found")]
    BucketNotFound(String),
    #[error("object {bucket}/{key} not found")]
    ObjectNotFound { bucket: String, key: String },
    #[error(
        "type mismatch: field '{field}' in bucket '{bucket}' expected {expected}, got {actual}"
    )]
    TypeMismatch {
        bucket: String,
        field: String,
        expected: String,
        actual: String,
    },
    #[error("unique constraint violation on field '{field}' in bucket '{bucket}'")]
    UniqueViolation { bucket: String, field: String },
    #[error("etag conflict on {bucket}/{key}: expected {expected}, found {}", fmt_etag(.actual))]
    EtagConflict {
        bucket: String,
        key: String,
        expected: Etag,
        actual: Option<Etag>,
    },
    #[error("pre-trigger '{trigger}' failed for {bucket}/{key}: {message}")]
    PreTriggerFailed {
        bucket: String,
        key: String,
        trigger: String,
        message: String,
    },
    #[error("post-trigger '{trigger}' failed for {bucket}/{key} after commit: {message}")]
    PostTriggerFailed {
        bucket: String,
        key: String,
        trigger: String,
        message: String,
    },
    #[error("resource unavailable: {message}")]
    Unavailable { message: String },
}

impl CreelError {
    pub fn code(&self) -> CreelErrorCode {
        match self {
            CreelError::Encode(_) => CreelErrorCode::Encode,
            CreelError::Decode(_) => CreelErrorCode::Decode,
            CreelError::Validation(_) => CreelErrorCode::Validation,
            CreelError::EmptyBatch => CreelErrorCode::EmptyBatch,
            CreelError::OperationNotAllowed { .. } => CreelErrorCode::OperationNotAllowed,
            CreelError::TransformKeyMismatch => CreelErrorCode::TransformKeyMismatch,
            CreelError::ValueRequired { .. } => CreelErrorCode::ValueRequired,
            CreelError::BucketAlreadyExists(_) => CreelErrorCode::BucketAlreadyExists,
            CreelError::BucketNotFound(_) => CreelErrorCode::BucketNotFound,
            CreelError::ObjectNotFound { .. } => CreelErrorCode::ObjectNotFound,
            CreelError::TypeMismatch { .. } => CreelErrorCode::TypeMismatch,
            CreelError::UniqueViolation { .. } => CreelErrorCode::UniqueViolation,
            CreelError::EtagConflict { .. } => CreelErrorCode::EtagConflict,
            CreelError::PreTriggerFailed { .. } => CreelErrorCode::PreTriggerFailed,
            CreelError::PostTriggerFailed { .. } => CreelErrorCode::PostTriggerFailed,
            CreelError::Unavailable { .. } => CreelErrorCode::Unavailable,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    /// True for failures detected before any mutation was staged. A batch
    /// rejected with one of these has had zero effect on stored state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code(),
            CreelErrorCode::Validation
                | CreelErrorCode::EmptyBatch
                | CreelErrorCode::OperationNotAllowed
                | CreelErrorCode::TransformKeyMismatch
                | CreelErrorCode::ValueRequired
                | CreelErrorCode::BucketNotFound
        )
    }
}
