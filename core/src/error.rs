use thiserror::Error;

#[derive(Error, Debug)]
pub enum MilestoneError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate milestone id '{id}' in catalog")]
    DuplicateMilestone { id: String },

    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MilestoneResult<T> = Result<T, MilestoneError>;
