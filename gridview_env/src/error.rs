//! Error types for the environment seam.

use thiserror::Error;

use gridview_core::grid::GridError;
use gridview_core::params::ParamsError;
use gridview_core::snapshot::SnapshotError;

/// Errors that can occur while talking to a frame source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed (connection, status, body read).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-HTTP transport failure (used by scripted/test sources).
    #[error("transport failed: {0}")]
    Transport(String),

    /// Response body was not the expected JSON shape.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The intersection matrix failed validation.
    #[error("bad grid payload: {0}")]
    Grid(#[from] GridError),

    /// Run parameters were rejected before being sent.
    #[error("invalid run parameters: {0}")]
    Params(#[from] ParamsError),

    /// A frame failed structural validation.
    #[error(transparent)]
    Malformed(#[from] SnapshotError),
}

impl SourceError {
    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
