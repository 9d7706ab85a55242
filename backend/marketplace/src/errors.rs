//! Application-wide error types.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::Namespace;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No document with id {id:?} in {namespace}")]
    NotFound { namespace: Namespace, id: String },

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Project {0:?} has no bids")]
    NoBids(String),

    #[error("Malformed request body: {0}")]
    Decode(String),
}

impl MarketError {
    /// HTTP status reported for this error.
    ///
    /// Only malformed bodies are a client error; every failure coming out of
    /// the store or the evaluator is reported as 500, not-found included.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
