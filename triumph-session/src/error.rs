use docsync::{ClientError, FetchError, PathError};

use crate::resource::Resource;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{0} needs a signed-in user")]
    MissingUserId(Resource),
    #[error("could not encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid document path: {0}")]
    Path(#[from] PathError),
    #[error("the session was reset while the request was in flight")]
    Cancelled,
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// True for the "request went through, nothing was there" case.
    pub fn is_no_data(&self) -> bool {
        matches!(self, SessionError::Fetch(FetchError::NoData { .. }))
    }
}
