//! Platform error types

use thiserror::Error;

/// Platform-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Session storage cannot be accessed (private browsing, disabled storage)
    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Session storage rejected a write
    #[error("Session storage quota exceeded")]
    QuotaExceeded,

    /// The reduced-motion accessibility signal cannot be queried or watched
    #[error("Accessibility signal unavailable: {0}")]
    SignalUnavailable(String),

    /// The render target was torn down before the write reached it
    #[error("Render target detached: {0}")]
    TargetDetached(&'static str),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
