pub mod constraints;
pub mod executor;
pub mod pipeline;
pub mod request;
pub mod validation;

use executor::CommittedWrite;
use request::{BatchResult, EtagEntry};

/// Builds the ordered result set mirroring the input request order. Put
/// entries carry the post-commit etag; Delete entries carry the literal
/// request key with no etag.
pub(crate) fn assemble_results(mut written: Vec<CommittedWrite>) -> BatchResult {
    written.sort_by_key(|write| write.index);
    BatchResult {
        etags: written
            .into_iter()
            .map(|write| EtagEntry {
                bucket: write.bucket,
                key: write.key,
                etag: write.etag,
            })
            .collect(),
    }
}
