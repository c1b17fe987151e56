use crate::error::PipelineError;

/// Flickr's search index only returns an accurate listing for roughly the
/// first 4000 results. Any reported total above this is rejected outright.
pub const RESULT_CEILING: u64 = 3999;

/// Reject a listing whose reported total exceeds `ceiling`.
pub fn check_result_size(total: u64, ceiling: u64) -> Result<(), PipelineError> {
    if total > ceiling {
        tracing::warn!(total, ceiling, "Result set too large to list accurately");
        return Err(PipelineError::TooManyItems { total });
    }
    Ok(())
}
