use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::PrettyJson;

/// Low-level cause of a snapshot load/save failure.
#[derive(Error, Debug)]
pub enum SnapshotFault {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StampError {
    /// No entries were ever recorded for the requested day.
    #[error("stamps of day not found")]
    NotFound,

    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// The store refuses the operation (draining, or a writer panicked
    /// while holding the lock).
    #[error("stamp store unavailable: {0}")]
    Unavailable(&'static str),

    #[error("failed to load snapshot from {}: {source}", .path.display())]
    PersistenceLoad {
        path: PathBuf,
        #[source]
        source: SnapshotFault,
    },

    #[error("failed to save snapshot to {}: {source}", .path.display())]
    PersistenceSave {
        path: PathBuf,
        #[source]
        source: SnapshotFault,
    },
}

pub type Result<T> = std::result::Result<T, StampError>;

impl StampError {
    pub fn status(&self) -> StatusCode {
        match self {
            StampError::NotFound => StatusCode::NOT_FOUND,
            StampError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            StampError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StampError::PersistenceLoad { .. } | StampError::PersistenceSave { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for StampError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("request failed: {self}");
        }
        (status, PrettyJson(self.to_string())).into_response()
    }
}
