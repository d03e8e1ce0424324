//! Error types for betwire-client.

use std::fmt;

use thiserror::Error;

/// Point of the submission where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the connection.
    Connect,
    /// Serializing a bet record.
    Encode,
    /// Writing a batch or preamble.
    Send,
    /// Reading acks or the winners list.
    Receive,
    /// Interpreting received bytes.
    Decode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Encode => "encode",
            Stage::Send => "send",
            Stage::Receive => "receive",
            Stage::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Main error type for all betwire operations.
#[derive(Debug, Error)]
pub enum BetwireError {
    /// A string field does not fit its fixed wire width.
    #[error("Encoding error: field `{field}` is {len} bytes, maximum is {max}")]
    Encoding {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Received bytes do not form a valid record.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Received bytes break frame alignment or sentinel rules.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket closed early, zero-byte write or I/O fault.
    #[error("Connection error during {stage}: {source}")]
    Connection {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    /// Invalid client configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Bet file could not be read.
    #[error("Ingest error: {0}")]
    Ingest(#[from] csv::Error),

    /// Configuration file could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error outside the connection (files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BetwireError {
    pub(crate) fn connection(stage: Stage, source: std::io::Error) -> Self {
        BetwireError::Connection { stage, source }
    }

    /// Stage the error belongs to, when it belongs to the submission flow.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BetwireError::Encoding { .. } => Some(Stage::Encode),
            BetwireError::Decoding(_) | BetwireError::Protocol(_) => Some(Stage::Decode),
            BetwireError::Connection { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the connection itself failed.
    pub fn is_connection(&self) -> bool {
        matches!(self, BetwireError::Connection { .. })
    }
}

/// Result type alias using BetwireError.
pub type Result<T> = std::result::Result<T, BetwireError>;
