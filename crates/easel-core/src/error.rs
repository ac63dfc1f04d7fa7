//! Error types for easel.

use thiserror::Error;

/// The main error type for host operations.
///
/// State errors are raised immediately by the operation that hit them. Nothing
/// is retried or queued for later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// `init` was called on a host that is already running, or the native
    /// binding already owns a live window.
    #[error("host has already been initialized")]
    AlreadyInitialized,

    /// The operation needs a running host (called before `init` or after `close`).
    #[error("host is not initialized; call Host::init() first")]
    NotInitialized,

    /// A blocking draw was issued from the UI thread itself.
    #[error("draw call issued from the UI thread would deadlock")]
    WrongThread,

    /// The native event loop could not be created or run.
    #[error("failed to create event loop: {0}")]
    EventLoopCreation(String),

    /// The native window could not be created.
    #[error("failed to create window: {0}")]
    WindowCreation(String),

    /// Presenting the canvas to the native surface failed.
    #[error("surface error: {0}")]
    Surface(String),

    /// The native binding cannot run its UI loop on a secondary thread here.
    #[error("native windowing is not supported on this platform")]
    UnsupportedPlatform,

    /// The timer thread could not be started.
    #[error("failed to start timer thread: {0}")]
    TimerThread(String),

    /// Invalid or unreadable host configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for HostError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized Result type for easel operations.
pub type Result<T> = std::result::Result<T, HostError>;
