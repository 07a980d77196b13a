use thiserror::Error;

use bwr_common::error::AppError;

#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::NotConfigured(what) => AppError::Config(format!("{} is not configured", what)),
            CommerceError::Signature(msg) => AppError::Signature(msg),
            other => AppError::Upstream(other.to_string()),
        }
    }
}
