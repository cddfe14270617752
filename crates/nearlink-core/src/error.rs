//! Unified error types for the nearlink core library.
//!
//! This module provides a unified error type [`NearlinkError`] that covers all
//! failure modes across nearlink. Each module also has its own specific error
//! types (`ConfigError`, `CredentialStoreError`, `SyncError`, ...) for
//! internal use; they convert into [`NearlinkError`] with `?`.
//!
//! Medium normalization never fails. Errors arise only at boundaries: parsing
//! configuration tokens, drawing randomness, persisting credentials and
//! talking to the sync service.
//!
//! # Example
//!
//! ```rust
//! use nearlink_core::error::{NearlinkError, Result};
//! use nearlink_core::Strategy;
//!
//! fn parse_strategy(token: &str) -> Result<Strategy> {
//!     Ok(token.parse()?)
//! }
//!
//! assert!(parse_strategy("P2P_STAR").is_ok());
//! assert!(parse_strategy("P2P_RING").unwrap_err().is_options_error());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all nearlink operations.
#[derive(Debug, Error)]
pub enum NearlinkError {
    // =========================================================================
    // OPTIONS ERRORS
    // =========================================================================
    /// A strategy token was not recognized.
    #[error("Invalid strategy: '{0}'. Expected P2P_POINT_TO_POINT, P2P_STAR or P2P_CLUSTER.")]
    InvalidStrategy(String),

    /// A medium token was not recognized.
    #[error("Invalid medium: '{0}'")]
    InvalidMedium(String),

    // =========================================================================
    // IDENTITY ERRORS
    // =========================================================================
    /// The random source could not produce an endpoint id.
    #[error("Random source failed: {0}")]
    RandomSourceFailed(String),

    /// An endpoint id has the wrong shape.
    #[error("Invalid endpoint id: '{0}'")]
    InvalidEndpointId(String),

    /// A MAC address is malformed.
    #[error("Invalid MAC address: '{0}'. Expected format XX:XX:XX:XX:XX:XX.")]
    InvalidMacAddress(String),

    // =========================================================================
    // CREDENTIAL ERRORS
    // =========================================================================
    /// Nothing is stored for the requested account and credential kind.
    #[error("No credentials stored for account '{0}'")]
    CredentialsNotFound(String),

    /// The account name cannot address a store entry.
    #[error("Invalid account name: '{0}'")]
    InvalidAccountName(String),

    /// A selector field is invalid.
    #[error("Invalid credential selector: {0}")]
    InvalidCredentialSelector(String),

    /// The credential store cannot be reached.
    #[error("Credential store unavailable: {0}")]
    CredentialStoreUnavailable(String),

    // =========================================================================
    // SYNC ERRORS
    // =========================================================================
    /// The HTTP exchange with the sync service failed.
    #[error("Sync transport failed: {0}")]
    SyncTransport(String),

    /// The sync service answered with a non-success status.
    #[error("Sync service returned {code} {text}")]
    SyncRejected {
        /// Status code.
        code: u16,
        /// Reason phrase.
        text: String,
    },

    /// The sync response could not be decoded.
    #[error("Failed to decode sync response: {0}")]
    SyncDecode(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for nearlink operations.
pub type Result<T> = std::result::Result<T, NearlinkError>;

/// Short alias for [`NearlinkError`].
pub type Error = NearlinkError;

impl NearlinkError {
    /// Returns `true` if this error comes from an option token.
    #[inline]
    #[must_use]
    pub const fn is_options_error(&self) -> bool {
        matches!(self, Self::InvalidStrategy(_) | Self::InvalidMedium(_))
    }

    /// Returns `true` if this error is related to identity generation.
    #[inline]
    #[must_use]
    pub const fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Self::RandomSourceFailed(_) | Self::InvalidEndpointId(_) | Self::InvalidMacAddress(_)
        )
    }

    /// Returns `true` if this error is related to credential storage.
    #[inline]
    #[must_use]
    pub const fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::CredentialsNotFound(_)
                | Self::InvalidAccountName(_)
                | Self::InvalidCredentialSelector(_)
                | Self::CredentialStoreUnavailable(_)
        )
    }

    /// Returns `true` if this error is related to credential sync.
    #[inline]
    #[must_use]
    pub const fn is_sync_error(&self) -> bool {
        matches!(
            self,
            Self::SyncTransport(_) | Self::SyncRejected { .. } | Self::SyncDecode(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::IoError(_))
    }

    /// Returns `true` if retrying the same request later may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::SyncTransport(_) | Self::CredentialStoreUnavailable(_) => true,
            Self::SyncRejected { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidStrategy(_)
            | Self::InvalidMedium(_)
            | Self::InvalidEndpointId(_)
            | Self::InvalidMacAddress(_)
            | Self::InvalidAccountName(_)
            | Self::InvalidCredentialSelector(_) => 400,

            // 404 Not Found
            Self::CredentialsNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error - server-side issues
            Self::RandomSourceFailed(_) | Self::PersistenceError(_) | Self::IoError(_) => 500,

            // 502 Bad Gateway - upstream answered badly
            Self::SyncRejected { .. } | Self::SyncDecode(_) => 502,

            // 503 Service Unavailable - dependency unreachable
            Self::SyncTransport(_) | Self::CredentialStoreUnavailable(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidStrategy(_) => "INVALID_STRATEGY",
            Self::InvalidMedium(_) => "INVALID_MEDIUM",
            Self::RandomSourceFailed(_) => "RANDOM_SOURCE_FAILED",
            Self::InvalidEndpointId(_) => "INVALID_ENDPOINT_ID",
            Self::InvalidMacAddress(_) => "INVALID_MAC_ADDRESS",
            Self::CredentialsNotFound(_) => "CREDENTIALS_NOT_FOUND",
            Self::InvalidAccountName(_) => "INVALID_ACCOUNT_NAME",
            Self::InvalidCredentialSelector(_) => "INVALID_CREDENTIAL_SELECTOR",
            Self::CredentialStoreUnavailable(_) => "CREDENTIAL_STORE_UNAVAILABLE",
            Self::SyncTransport(_) => "SYNC_TRANSPORT_FAILED",
            Self::SyncRejected { .. } => "SYNC_REJECTED",
            Self::SyncDecode(_) => "SYNC_DECODE_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::strategy::InvalidStrategy> for NearlinkError {
    fn from(err: crate::strategy::InvalidStrategy) -> Self {
        Self::InvalidStrategy(err.0)
    }
}

impl From<crate::medium::ParseMediumError> for NearlinkError {
    fn from(err: crate::medium::ParseMediumError) -> Self {
        Self::InvalidMedium(err.0)
    }
}

impl From<crate::types::InvalidMacAddress> for NearlinkError {
    fn from(err: crate::types::InvalidMacAddress) -> Self {
        Self::InvalidMacAddress(err.0)
    }
}

impl From<crate::identity::IdentityError> for NearlinkError {
    fn from(err: crate::identity::IdentityError) -> Self {
        use crate::identity::IdentityError;
        match err {
            IdentityError::RandomSourceFailed(message) => Self::RandomSourceFailed(message),
            IdentityError::InvalidEndpointId(id) => Self::InvalidEndpointId(id),
        }
    }
}

impl From<crate::credentials::CredentialStoreError> for NearlinkError {
    fn from(err: crate::credentials::CredentialStoreError) -> Self {
        use crate::credentials::CredentialStoreError;
        match err {
            CredentialStoreError::NotFound { account_name } => {
                Self::CredentialsNotFound(account_name)
            }
            CredentialStoreError::InvalidAccountName(name) => Self::InvalidAccountName(name),
            CredentialStoreError::InvalidSelector(message) => {
                Self::InvalidCredentialSelector(message)
            }
            CredentialStoreError::Unavailable(message) => Self::CredentialStoreUnavailable(message),
            CredentialStoreError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {}: {}", path.display(), source))
            }
            CredentialStoreError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            CredentialStoreError::ParseError { path, source } => {
                Self::PersistenceError(format!("Failed to parse {}: {}", path.display(), source))
            }
            CredentialStoreError::SerializeError(e) => Self::PersistenceError(e.to_string()),
        }
    }
}

impl From<crate::http::HttpError> for NearlinkError {
    fn from(err: crate::http::HttpError) -> Self {
        Self::SyncTransport(err.to_string())
    }
}

impl From<crate::sync::SyncError> for NearlinkError {
    fn from(err: crate::sync::SyncError) -> Self {
        use crate::sync::SyncError;
        match err {
            SyncError::InvalidUrl(url) => {
                Self::ConfigValidationError(format!("sync.base_url: cannot build URL from {url}"))
            }
            SyncError::Http(e) => e.into(),
            SyncError::Status { code, text } => Self::SyncRejected { code, text },
            SyncError::Decode(e) => Self::SyncDecode(e.to_string()),
            SyncError::Store(e) => e.into(),
        }
    }
}

impl From<crate::config::ConfigError> for NearlinkError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path.into()),
            ConfigError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {path}: {source}"))
            }
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
