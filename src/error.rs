use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Nothing left to cluster after normalization or filtering.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// A single input row could not be turned into a building record.
    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn empty<S: Into<String>>(msg: S) -> Self {
        Error::EmptyDataset(msg.into())
    }

    pub fn malformed<S: Into<String>>(row: usize, reason: S) -> Self {
        Error::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }

    pub fn geometry<S: Into<String>>(msg: S) -> Self {
        Error::InvalidGeometry(msg.into())
    }

    pub fn parameter<S: Into<String>>(msg: S) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
