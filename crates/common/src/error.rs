//! Error types for the Grapnel discovery engine.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrapnelError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("handshake error: {0}")]
    Handshake(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("wordlist error: {0}")]
    Wordlist(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("health check error: {0}")]
    Health(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for Grapnel operations.
pub type GrapnelResult<T> = Result<T, GrapnelError>;
