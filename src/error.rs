use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::logic::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN};

/// Errors raised by a record store.
///
/// A missing record is not an error: lookups return `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("name is too long (max {max} characters)")]
    NameTooLong { max: usize },

    #[error("description is too long (max {max} characters)")]
    DescriptionTooLong { max: usize },

    #[error("no ids left: the largest possible id is taken")]
    IdsExhausted,

    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode collection: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn name_too_long() -> Self {
        StoreError::NameTooLong { max: MAX_NAME_LEN }
    }

    pub fn description_too_long() -> Self {
        StoreError::DescriptionTooLong {
            max: MAX_DESCRIPTION_LEN,
        }
    }
}

/// Errors for calls the orchestrator gets wrong (not for bad record input).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown function: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Errors talking to the hosted chat-completion service.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("chat service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode chat response: {0}")]
    Decode(String),

    #[error("chat service returned no choices")]
    EmptyResponse,

    #[error("gave up after {0} rounds of function calls")]
    TooManyToolRounds(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}
