use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum HippoError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("share link expired")]
    ShareExpired,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("render error: {0}")]
    Render(String),
}

impl HippoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        HippoError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        HippoError::NotFound(what.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        HippoError::Render(msg.into())
    }
}

impl From<serde_json::Error> for HippoError {
    fn from(err: serde_json::Error) -> Self {
        HippoError::Store(StoreError::from(err))
    }
}

pub type HippoResult<T> = Result<T, HippoError>;
