//! Error types shared across the workspace.

use thiserror::Error;

/// Workspace-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Packed GPU buffers do not match the source tree
    #[error("Packed buffers do not match source tree {index}")]
    PackMismatch {
        /// Index of the mismatching tree in the packed tree array.
        index: usize,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
