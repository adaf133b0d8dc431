//! # Sync Error Types
//!
//! Error types for connectivity, submission, and queue-drain operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Submission          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  RejectedByServer       │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  ServerUnavailable      │ │
//! │  │  ConfigLoad/Save│  │  HttpTransport  │  │  InvalidResponse        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐ │
//! │  │    Storage      │  │     Internal                                │ │
//! │  │                 │  │                                             │ │
//! │  │  DatabaseError  │  │  InvalidSale, ShuttingDown, ChannelError    │ │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `is_retryable()` is the categorization the drain loop lives by: a
//! retryable error keeps the sale queued and stops the pass, anything
//! terminal is surfaced to the caller.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering connectivity, submission, and queue failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid server URL.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to reach the server (DNS, TCP, TLS).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out. Ambiguous: the server may or may not have
    /// processed it, which is why every submission carries an
    /// idempotency key.
    #[error("Request timed out")]
    Timeout,

    /// Other HTTP transport failure.
    #[error("HTTP transport error: {0}")]
    HttpTransport(String),

    /// Server responded with an unexpected status (5xx, 429, ...).
    /// Treated as transient: the sale stays queued.
    #[error("Server unavailable: HTTP {status}")]
    ServerUnavailable { status: u16 },

    // =========================================================================
    // Submission Errors
    // =========================================================================
    /// The server examined the sale and refused it. Terminal: retrying
    /// the identical payload can never succeed.
    #[error("Sale {local_id} rejected by server: {reason}")]
    RejectedByServer { local_id: String, reason: String },

    /// The server accepted the request but the response body was not
    /// understood.
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local queue storage failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Sale failed local validation before any network or storage work.
    #[error("Invalid sale: {0}")]
    InvalidSale(String),

    /// Engine is shutting down.
    #[error("Sync engine is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Internal engine error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<vela_db::DbError> for SyncError {
    fn from(err: vela_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<vela_core::CoreError> for SyncError {
    fn from(err: vela_core::CoreError) -> Self {
        SyncError::InvalidSale(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::InvalidResponse(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_connect() {
            SyncError::ConnectionFailed(err.to_string())
        } else {
            SyncError::HttpTransport(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the failed operation can be retried with the same
    /// payload and may then succeed.
    ///
    /// ## Retryable
    /// - Connection failures, timeouts, 5xx responses
    /// - Local storage hiccups
    ///
    /// ## Non-Retryable
    /// - Server rejections (the payload itself is refused)
    /// - Configuration and validation errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed(_)
                | SyncError::Timeout
                | SyncError::HttpTransport(_)
                | SyncError::ServerUnavailable { .. }
                | SyncError::DatabaseError(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
