use std::io;

/// Custom error type for push_build_hook operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging setup failed: {0}")]
    LoggingSetupFailed(String),

    #[error("Failed to launch build script '{script}': {source}")]
    DispatchFailed {
        script: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;
