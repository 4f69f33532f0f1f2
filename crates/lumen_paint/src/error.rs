//! Paint error types

use thiserror::Error;

/// Errors from the path mini-language parser
///
/// Offsets are byte offsets into the source string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathParseError {
    /// A letter that is not a path command
    #[error("unknown path command '{command}' at offset {offset}")]
    UnknownCommand { command: char, offset: usize },

    /// A numeric token that does not parse as a number
    #[error("invalid number at offset {offset}")]
    InvalidNumber { offset: usize },

    /// A command ran out of arguments
    #[error("missing arguments for '{command}' at offset {offset}")]
    MissingArguments { command: char, offset: usize },

    /// An arc flag that is neither `0` nor `1`
    #[error("invalid arc flag at offset {offset}")]
    InvalidFlag { offset: usize },

    /// Path data must start with a move command
    #[error("path data must begin with a move command (offset {offset})")]
    ExpectedMoveTo { offset: usize },
}

/// Canvas configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a config file
    #[error("failed to read canvas config: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML
    #[error("failed to parse canvas config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value outside its valid range
    #[error("invalid canvas config: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;
