use thiserror::Error;

use crate::{fetcher::FeedError, repositories::StoreError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid article: {0}")]
    Invalid(String),

    #[error("ingest run aborted: {0}")]
    Aborted(String),
}

impl IngestError {
    /// Whether the next scheduled run may succeed where this one failed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Feed(e) => e.should_retry(),
            Self::Store(_) => true,
            Self::Invalid(_) | Self::Aborted(_) => false,
        }
    }
}
