use thiserror::Error;

/// Unified error type for configuration resolution, loading and refresh.
#[derive(Error, Debug)]
pub enum CfgError {
    // ── Startup: locator resolution ────────────────────────────
    #[error("invalid config locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("unsupported config provider: {0}")]
    UnsupportedProvider(String),

    #[error("remote config path '{0}' has no file extension to select a decoder")]
    MissingEncoding(String),

    // ── Startup: loading ───────────────────────────────────────
    #[error("config source unreadable: {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("config decode error ({format}): {reason}")]
    DecodeError { format: String, reason: String },

    // ── Runtime ────────────────────────────────────────────────
    #[error("config refresh failed: {0}")]
    RefreshFailed(String),

    #[error("config watcher error: {0}")]
    Watch(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CfgError {
    pub fn unreadable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(format: impl ToString, reason: impl ToString) -> Self {
        Self::DecodeError {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for the error kinds that can only occur while resolving or
    /// loading at startup.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::InvalidLocator { .. }
                | Self::UnsupportedProvider(_)
                | Self::MissingEncoding(_)
                | Self::SourceUnreadable { .. }
                | Self::DecodeError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CfgError>;
