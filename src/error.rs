use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The request line could not be split into method, target and version
    #[error("Malformed request: {0}")]
    Decode(String),

    /// A resolved file lies outside of its site root
    #[error("Path escapes site root: {}", .0.display())]
    PathEscape(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session read error: {0}")]
    SessionRead(String),

    #[error("Session write error: {0}")]
    SessionWrite(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Buffer error: {0}")]
    Buffer(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
