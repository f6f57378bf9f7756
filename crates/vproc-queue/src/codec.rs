//! JSON wire format of job messages.

use vproc_models::VideoJob;

use crate::error::QueueResult;

/// Serialise a job as the message value.
pub fn encode_job(job: &VideoJob) -> QueueResult<Vec<u8>> {
    Ok(serde_json::to_vec(job)?)
}

/// Parse a message value into a job.
pub fn decode_job(payload: &[u8]) -> QueueResult<VideoJob> {
    Ok(serde_json::from_slice(payload)?)
}
