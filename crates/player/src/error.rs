//! Player errors

use std::io;

/// Errors from loading, saving or validating a [`crate::PlayerConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration key or environment variable
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{key} out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An operation needs the tile layout established by
    /// `update_viewport_size`
    #[error("frame has not been laid out")]
    NotLaidOut,
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewportSize { width: i32, height: i32 },
}
