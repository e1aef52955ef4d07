//! Error types and result aliases for berth operations.
//!
//! Provides a unified error type that covers every failure the admission
//! protocol can surface, from request-shape policy violations to wrapped
//! collaborator failures, with actionable messages.

use thiserror::Error;

/// Unified error type for all berth operations
#[derive(Error, Debug)]
pub enum BerthError {
    // Encoding errors
    #[error("Invalid digest '{input}': {reason}")]
    InvalidDigest { input: String, reason: String },

    #[error("Unsupported multihash code 0x{code:x} for {digest}")]
    UnsupportedHash { digest: String, code: u64 },

    #[error("Invalid DID '{input}': {reason}")]
    InvalidDid { input: String, reason: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    // Capability errors
    #[error("Capability {capability} rejected: {reason}")]
    PolicyViolation { capability: String, reason: String },

    #[error("Invocation of {command} is missing a required delegation proof")]
    MissingProof { command: String },

    #[error("Invalid signature on {what}")]
    InvalidSignature { what: String },

    #[error("No handler registered for {command}")]
    HandlerNotFound { command: String },

    #[error("Signing failed: {message}")]
    Signing { message: String },

    // Admission errors
    #[error("Missing allocation for write to: {digest}")]
    MissingAllocation { digest: String },

    #[error("Expired allocation for write to: {digest}")]
    AllocationExpired { digest: String },

    #[error("Data consistency check failed for {digest}: {reason}")]
    DataInconsistent { digest: String, reason: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Blob not found: {digest} (space {space})")]
    BlobNotFound { space: String, digest: String },

    #[error("{component} {operation} failed for {digest}")]
    Collaborator {
        component: &'static str,
        operation: &'static str,
        digest: String,
        #[source]
        source: Box<BerthError>,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    // Config errors
    #[error("Failed to parse config: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for berth operations
pub type BerthResult<T> = Result<T, BerthError>;

impl BerthError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an encoding error from any displayable cause
    pub fn encoding(message: impl std::fmt::Display) -> Self {
        Self::Encoding {
            message: message.to_string(),
        }
    }

    /// Wrap a collaborator failure with the component, operation and digest it concerns
    pub fn collaborator(
        component: &'static str,
        operation: &'static str,
        digest: impl std::fmt::Display,
        source: BerthError,
    ) -> Self {
        Self::Collaborator {
            component,
            operation,
            digest: digest.to_string(),
            source: Box::new(source),
        }
    }

    /// Check if this error is a not-found condition reported by a store
    pub fn is_not_found(&self) -> bool {
        matches!(self, BerthError::NotFound { .. })
    }

    /// Check if this error is recoverable by retrying at the transport level
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BerthError::Collaborator { .. } | BerthError::Io { .. } | BerthError::Cancelled { .. }
        )
    }

    /// Short machine-readable name, used in receipts
    pub fn name(&self) -> &'static str {
        match self {
            BerthError::InvalidDigest { .. } => "InvalidDigestError",
            BerthError::UnsupportedHash { .. } => "UnsupportedHashError",
            BerthError::InvalidDid { .. } => "InvalidDIDError",
            BerthError::Encoding { .. } => "EncodingError",
            BerthError::PolicyViolation { .. } => "PolicyViolationError",
            BerthError::MissingProof { .. } => "MissingProofError",
            BerthError::InvalidSignature { .. } => "InvalidSignatureError",
            BerthError::HandlerNotFound { .. } => "HandlerNotFoundError",
            BerthError::Signing { .. } => "SigningError",
            BerthError::MissingAllocation { .. } => "MissingAllocationError",
            BerthError::AllocationExpired { .. } => "AllocationExpiredError",
            BerthError::DataInconsistent { .. } => "DataInconsistentError",
            BerthError::NotFound { .. } => "NotFoundError",
            BerthError::BlobNotFound { .. } => "BlobNotFoundError",
            BerthError::Collaborator { .. } => "CollaboratorError",
            BerthError::Cancelled { .. } => "CancelledError",
            BerthError::TomlParse { .. } => "ConfigParseError",
            BerthError::ConfigValidation { .. } => "ConfigValidationError",
            BerthError::Io { .. } => "IOError",
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            BerthError::PolicyViolation { .. } => {
                Some("Blob size must be greater than 0 and at most 256 MiB")
            },
            BerthError::MissingAllocation { .. } | BerthError::AllocationExpired { .. } => {
                Some("Invoke /blob/allocate for this digest before uploading")
            },
            BerthError::DataInconsistent { .. } => {
                Some("Retry the upload with bytes matching the declared digest and size")
            },
            BerthError::BlobNotFound { .. } => Some("Upload the blob before invoking /blob/accept"),
            BerthError::MissingProof { .. } => {
                Some("Include the delegation chain authorizing the issuer in the invocation proofs")
            },
            BerthError::ConfigValidation { .. } | BerthError::TomlParse { .. } => {
                Some("Check the config file, BERTH_* environment variables and command line flags")
            },
            BerthError::Collaborator { .. } | BerthError::Io { .. } => {
                Some("This is usually transient; retry the request")
            },
            _ => None,
        }
    }
}
