use std::error::Error;
use std::fmt;

/// Engine-level failures. `IllegalAction` is the expected rejection path
/// and leaves state untouched; the other variants indicate bugs or bad
/// setup and are logged before being surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    IllegalAction(String),
    InvalidState(String),
    InternalInvariant(String),
    Setup(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::IllegalAction(msg) => write!(f, "illegal action: {msg}"),
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::InternalInvariant(msg) => {
                write!(f, "internal invariant violated: {msg}")
            }
            EngineError::Setup(msg) => write!(f, "setup error: {msg}"),
        }
    }
}

impl Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;
