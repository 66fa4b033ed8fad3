use thiserror::Error;
use trellis_core_types::{RequestId, TraceId};

use crate::model::ElementKind;

/// Result type alias using TrellisError
pub type Result<T> = std::result::Result<T, TrellisError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// in the Trellis system. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrErrorKind {
    // Addressing
    InvalidPath,
    NotFound,

    // Relationship policy
    IllegalRelationship,

    // Structured data
    Validation,
    UnableToValidate,

    // Backend
    Conflict,
    Backend,

    // Generic
    Serialization,
    Internal,
}

impl TrErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            TrErrorKind::InvalidPath => "ERR_INVALID_PATH",
            TrErrorKind::NotFound => "ERR_NOT_FOUND",
            TrErrorKind::IllegalRelationship => "ERR_ILLEGAL_RELATIONSHIP",
            TrErrorKind::Validation => "ERR_VALIDATION",
            TrErrorKind::UnableToValidate => "ERR_UNABLE_TO_VALIDATE",
            TrErrorKind::Conflict => "ERR_CONFLICT",
            TrErrorKind::Backend => "ERR_BACKEND",
            TrErrorKind::Serialization => "ERR_SERIALIZATION",
            TrErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Provides a structured representation of errors with classification fields
/// for programmatic handling and rich context for logging.
#[derive(Debug, Clone)]
pub struct TrError {
    kind: TrErrorKind,
    op: Option<String>,
    path: Option<String>,
    relationship: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl TrError {
    /// Create a new error with the specified kind
    pub fn new(kind: TrErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            relationship: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add canonical path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add relationship name context
    pub fn with_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationship = Some(name.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> TrErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the relationship context, if any
    pub fn relationship(&self) -> Option<&str> {
        self.relationship.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for TrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(relationship) = &self.relationship {
            write!(f, " (relationship: {})", relationship)?;
        }
        Ok(())
    }
}

impl std::error::Error for TrError {}

// ========== End Error Facility ==========

/// Severity of a single schema validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single finding produced by schema validation
///
/// Findings are ordered: validating the same payload against the same schema
/// always yields the same list in the same order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub message: String,
}

impl ValidationFinding {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Comprehensive error taxonomy for Trellis operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    // ===== Addressing Errors =====
    /// An attempted path extension violates the nesting grammar
    #[error("Cannot extend path: {kind} is not legal under {under}")]
    InvalidPathKind { kind: ElementKind, under: String },

    /// A relative path walked above the root while being resolved
    #[error("Relative path ascends above the root when applied to {origin}")]
    PathAscendsAboveRoot { origin: String },

    /// A path string could not be parsed
    #[error("Cannot parse path '{input}': {reason}")]
    PathParse { input: String, reason: String },

    // ===== Lookup Errors =====
    /// Requested path or position does not resolve to an entity
    #[error("Entity not found: {path}")]
    EntityNotFound { path: String },

    /// Requested relationship id does not resolve
    #[error("Relationship not found: {id}")]
    RelationshipNotFound { id: String },

    // ===== Relationship Policy Errors =====
    /// A proposed custom relationship violates the relationship rules
    #[error("Illegal relationship '{name}' from {source_path} to {target_path}: {reason}")]
    IllegalRelationship {
        name: String,
        source_path: String,
        target_path: String,
        reason: String,
    },

    // ===== Structured Data Errors =====
    /// A structured-data payload failed schema validation
    #[error("Validation of data at {path} failed with {} finding(s)", .findings.len())]
    Validation {
        path: String,
        findings: Vec<ValidationFinding>,
    },

    /// The schema or payload could not be processed at all
    ///
    /// Distinct from `Validation`: this is a read/parse failure, not a
    /// business rule violation.
    #[error("Unable to validate data at {path}: {message}")]
    UnableToValidate { path: String, message: String },

    // ===== Backend Errors =====
    /// A backend transaction aborted due to a concurrent conflicting write
    ///
    /// Conflicts are retriable up to the configured transaction retry bound.
    #[error("Backend transaction conflict: {message}")]
    Conflict { message: String },

    /// An opaque backend failure; fatal to the current transaction
    #[error("Backend failure: {message}")]
    Backend { message: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrellisError {
    /// Whether a failed transaction closure may be re-run for this error
    ///
    /// Only backend conflicts are safe to retry; business-level failures
    /// (not-found, validation, illegal relationship) are deterministic and
    /// must surface immediately.
    pub fn is_retriable(&self) -> bool {
        matches!(self, TrellisError::Conflict { .. })
    }
}

/// Conversion from TrellisError to the structured error facility
impl From<TrellisError> for TrError {
    fn from(err: TrellisError) -> Self {
        match err {
            TrellisError::InvalidPathKind { kind, under } => {
                TrError::new(TrErrorKind::InvalidPath)
                    .with_message(format!("{} is not legal under {}", kind, under))
            }

            TrellisError::PathAscendsAboveRoot { origin } => {
                TrError::new(TrErrorKind::InvalidPath)
                    .with_path(origin)
                    .with_message("Relative path ascends above the root")
            }

            TrellisError::PathParse { input, reason } => {
                TrError::new(TrErrorKind::InvalidPath)
                    .with_message(format!("Cannot parse '{}': {}", input, reason))
            }

            TrellisError::EntityNotFound { path } => TrError::new(TrErrorKind::NotFound)
                .with_path(path)
                .with_message("Entity not found"),

            TrellisError::RelationshipNotFound { id } => TrError::new(TrErrorKind::NotFound)
                .with_relationship(id)
                .with_message("Relationship not found"),

            TrellisError::IllegalRelationship {
                name,
                source_path,
                target_path,
                reason,
            } => TrError::new(TrErrorKind::IllegalRelationship)
                .with_relationship(name)
                .with_path(source_path)
                .with_message(format!("target {}: {}", target_path, reason)),

            TrellisError::Validation { path, findings } => {
                TrError::new(TrErrorKind::Validation)
                    .with_path(path)
                    .with_message(format!("{} finding(s)", findings.len()))
            }

            TrellisError::UnableToValidate { path, message } => {
                TrError::new(TrErrorKind::UnableToValidate)
                    .with_path(path)
                    .with_message(message)
            }

            TrellisError::Conflict { message } => {
                TrError::new(TrErrorKind::Conflict).with_message(message)
            }

            TrellisError::Backend { message } => {
                TrError::new(TrErrorKind::Backend).with_message(message)
            }

            TrellisError::Serialization { message } => {
                TrError::new(TrErrorKind::Serialization).with_message(message)
            }

            TrellisError::Internal { message } => {
                TrError::new(TrErrorKind::Internal).with_message(message)
            }
        }
    }
}
