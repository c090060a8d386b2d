//! Error types for foureq

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum EqError {
    #[error("Invalid band index: {0} (valid range 0..=3)")]
    InvalidBandIndex(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("State error: {0}")]
    State(String),
}

/// Result type alias
pub type EqResult<T> = Result<T, EqError>;
