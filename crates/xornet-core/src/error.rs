//! Error types for the core sync logic.

use thiserror::Error;

/// Why an entity fetch failed.
///
/// `Clone` because one coalesced fetch fans its result out to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The id is empty; nothing was requested.
    #[error("invalid entity id")]
    InvalidId,

    /// Could not reach the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The response body was not a valid entity.
    #[error("decode error: {0}")]
    Decode(String),

    /// The fetch task died before settling.
    #[error("fetch aborted: {0}")]
    Aborted(String),
}
