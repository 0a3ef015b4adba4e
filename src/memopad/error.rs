use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl MemoError {
    /// Re-labels a gateway failure as an auth failure, keeping auth errors as-is.
    pub(crate) fn into_auth(self) -> Self {
        match self {
            MemoError::Auth(_) => self,
            other => MemoError::Auth(other.to_string()),
        }
    }

    /// Re-labels a gateway failure as a store failure, keeping store errors as-is.
    pub(crate) fn into_store(self) -> Self {
        match self {
            MemoError::Store(_) => self,
            other => MemoError::Store(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoError>;
