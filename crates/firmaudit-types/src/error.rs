//! Error taxonomy for model routing and stage execution.
//!
//! [`AuditError`] carries the detail of a failure; [`ErrorKind`] is its
//! flat classification, which is what gets recorded in a
//! [`StageResult`](crate::stage::StageResult) and drives retry decisions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat classification of every failure the pipeline can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The stage configuration names a provider absent from the registry.
    UnknownProvider,
    /// The provider exists but is turned off.
    ProviderDisabled,
    /// The provider is enabled but its secret is not available.
    MissingCredential,
    /// The platform rejected the client setup (model, endpoint, key).
    ClientInitError,
    /// A transient failure during an in-flight call.
    ProviderError,
    /// A response arrived but did not match the stage schema.
    SchemaViolation,
    /// No enabled provider exists; the run never starts.
    NoProvidersAvailable,
}

impl ErrorKind {
    /// Only in-flight transient failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ProviderError)
    }

    /// Configuration-class errors are detected before any model call.
    pub fn is_configuration(self) -> bool {
        matches!(
            self,
            ErrorKind::UnknownProvider
                | ErrorKind::ProviderDisabled
                | ErrorKind::MissingCredential
                | ErrorKind::ClientInitError
        )
    }

    /// Stable identifier used in reports and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownProvider => "UnknownProvider",
            ErrorKind::ProviderDisabled => "ProviderDisabled",
            ErrorKind::MissingCredential => "MissingCredential",
            ErrorKind::ClientInitError => "ClientInitError",
            ErrorKind::ProviderError => "ProviderError",
            ErrorKind::SchemaViolation => "SchemaViolation",
            ErrorKind::NoProvidersAvailable => "NoProvidersAvailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while routing a stage to a model or executing it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("provider '{provider}' not found in registry")]
    UnknownProvider { provider: String },

    #[error("provider '{provider}' is not enabled")]
    ProviderDisabled { provider: String },

    #[error("no credential available for provider '{provider}'")]
    MissingCredential { provider: String },

    #[error("failed to initialize {provider}:{model}: {reason}")]
    ClientInit {
        provider: String,
        model: String,
        reason: String,
    },

    /// Transient call failure, after `attempts` calls were issued.
    #[error("provider call failed after {attempts} attempt(s): {message}")]
    Provider { message: String, attempts: u32 },

    #[error("response does not match the expected schema: {reason}")]
    SchemaViolation { reason: String },

    #[error("no models could be initialized: enable at least one provider and check your API keys")]
    NoProvidersAvailable,
}

impl AuditError {
    /// Project this error onto the flat taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuditError::UnknownProvider { .. } => ErrorKind::UnknownProvider,
            AuditError::ProviderDisabled { .. } => ErrorKind::ProviderDisabled,
            AuditError::MissingCredential { .. } => ErrorKind::MissingCredential,
            AuditError::ClientInit { .. } => ErrorKind::ClientInitError,
            AuditError::Provider { .. } => ErrorKind::ProviderError,
            AuditError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            AuditError::NoProvidersAvailable => ErrorKind::NoProvidersAvailable,
        }
    }

    /// Shorthand for a schema violation with a formatted reason.
    pub fn schema(reason: impl Into<String>) -> Self {
        AuditError::SchemaViolation {
            reason: reason.into(),
        }
    }
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AuditError>;
