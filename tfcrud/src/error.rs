//! Error types for tfcrud
//!
//! Each layer has its own error enum; [`TfcrudError`] wraps them and knows
//! how to turn itself into host diagnostics.

use crate::types::{AttributePath, Diagnostic};

/// Raised while building a schema. These are programming errors in a
/// resource definition, never user configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),

    #[error("attribute name 'id' is reserved for the external identifier")]
    ReservedAttribute,

    #[error("attribute '{0}' must be exactly one of required, optional or computed")]
    MissingMode(String),

    #[error("attribute '{attribute}': {rule} rule cannot apply to {kind} values")]
    RuleKindMismatch {
        attribute: String,
        rule: String,
        kind: String,
    },

    #[error("attribute '{attribute}': invalid regex: {message}")]
    InvalidRegex { attribute: String, message: String },

    #[error("attribute '{0}' is computed and cannot force recreation")]
    ComputedForcesRecreate(String),

    #[error("attribute '{attribute}': range minimum {min} exceeds maximum {max}")]
    InvalidRange {
        attribute: String,
        min: i64,
        max: i64,
    },

    #[error("resource '{0}' has an empty base path")]
    EmptyBasePath(String),

    #[error("resource '{0}' has an empty id path")]
    EmptyIdPath(String),
}

/// A single problem found in user configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required attribute '{attribute}'")]
    MissingRequired { attribute: AttributePath },

    #[error("invalid value for '{attribute}': {message}")]
    RuleViolation {
        attribute: AttributePath,
        message: String,
    },

    #[error("wrong type for '{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        attribute: AttributePath,
        expected: String,
        actual: String,
    },

    #[error("'{attribute}' is computed by the server and cannot be configured")]
    ComputedSet { attribute: AttributePath },

    #[error("unsupported attribute '{attribute}'")]
    UnknownAttribute { attribute: AttributePath },
}

impl ValidationError {
    pub fn attribute(&self) -> &AttributePath {
        match self {
            ValidationError::MissingRequired { attribute }
            | ValidationError::RuleViolation { attribute, .. }
            | ValidationError::TypeMismatch { attribute, .. }
            | ValidationError::ComputedSet { attribute }
            | ValidationError::UnknownAttribute { attribute } => attribute,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ValidationError::MissingRequired { .. } => "Missing required argument",
            ValidationError::RuleViolation { .. } => "Invalid attribute value",
            ValidationError::TypeMismatch { .. } => "Incorrect attribute value type",
            ValidationError::ComputedSet { .. } => "Invalid configuration for computed attribute",
            ValidationError::UnknownAttribute { .. } => "Unsupported argument",
        }
    }
}

/// The server answered with something the schema cannot represent, or a
/// request could not be built from the given attributes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response has no object under '{0}'")]
    MissingEnvelope(String),

    #[error("response did not contain an id at '{0}'")]
    MissingId(String),

    #[error("{operation} requires an external id but the resource has none")]
    NoExternalId { operation: String },

    #[error("'{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        attribute: AttributePath,
        expected: String,
        actual: String,
    },

    #[error("'{attribute}' is not known yet and cannot be sent")]
    UnknownValue { attribute: AttributePath },
}

impl MappingError {
    pub fn attribute(&self) -> Option<&AttributePath> {
        match self {
            MappingError::TypeMismatch { attribute, .. }
            | MappingError::UnknownValue { attribute } => Some(attribute),
            _ => None,
        }
    }
}

/// Failure talking to the REST backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request rejected (HTTP {status}): {body}")]
    Client { status: u16, body: String },

    #[error("server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("unexpected response (HTTP {status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Classify a non-2xx status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400..=499 => BackendError::Client { status, body },
            500..=599 => BackendError::Server { status, body },
            _ => BackendError::UnexpectedStatus { status, body },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Client { status, .. }
            | BackendError::Server { status, .. }
            | BackendError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether re-running the whole apply may succeed. Nothing in this crate
    /// retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Server { .. } | BackendError::Timeout(_) => true,
            BackendError::Request(e) => !e.is_builder(),
            BackendError::Client { .. }
            | BackendError::UnexpectedStatus { .. }
            | BackendError::Cancelled
            | BackendError::InvalidUrl(_) => false,
        }
    }
}

/// Error type for tfcrud operations
#[derive(Debug, thiserror::Error)]
pub enum TfcrudError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("data source not found: {0}")]
    DataSourceNotFound(String),

    #[error("provider not configured")]
    ProviderNotConfigured,

    #[error("configuration is invalid ({} problem(s))", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("{operation} not supported for {type_name}: {reason}")]
    UnsupportedOperation {
        type_name: String,
        operation: String,
        reason: String,
    },

    #[error("cannot {operation} while {from}")]
    InvalidTransition { from: String, operation: String },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for tfcrud operations
pub type Result<T> = std::result::Result<T, TfcrudError>;

impl From<Vec<ValidationError>> for TfcrudError {
    fn from(errors: Vec<ValidationError>) -> Self {
        TfcrudError::Validation(errors)
    }
}

impl TfcrudError {
    /// Convert into host diagnostics, scoped to an attribute where one is known
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            TfcrudError::Validation(errors) => errors
                .iter()
                .map(|e| {
                    Diagnostic::error(e.summary(), e.to_string()).with_attribute(e.attribute().clone())
                })
                .collect(),
            TfcrudError::Mapping(e) => {
                let diag = Diagnostic::error("Unexpected API response", e.to_string());
                vec![match e.attribute() {
                    Some(path) => diag.with_attribute(path.clone()),
                    None => diag,
                }]
            }
            TfcrudError::Backend(e) => {
                let summary = if e.is_transient() {
                    "API request failed (may succeed on retry)"
                } else {
                    "API request failed"
                };
                vec![Diagnostic::error(summary, e.to_string())]
            }
            TfcrudError::UnsupportedOperation { operation, .. } => vec![Diagnostic::error(
                format!("{} Not Supported", operation),
                self.to_string(),
            )],
            TfcrudError::Schema(e) => vec![Diagnostic::error("Invalid resource schema", e.to_string())],
            TfcrudError::ProviderNotConfigured => vec![Diagnostic::error(
                "Provider not configured",
                "the provider must be configured before resources can be used",
            )],
            other => vec![Diagnostic::error("Provider error", other.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_classifies_status() {
        assert!(matches!(
            BackendError::from_status(404, String::new()),
            BackendError::Client { status: 404, .. }
        ));
        assert!(matches!(
            BackendError::from_status(503, String::new()),
            BackendError::Server { status: 503, .. }
        ));
        assert!(matches!(
            BackendError::from_status(302, String::new()),
            BackendError::UnexpectedStatus { .. }
        ));
    }

    #[test]
    fn only_server_side_failures_are_transient() {
        assert!(BackendError::from_status(500, String::new()).is_transient());
        assert!(BackendError::Timeout(30).is_transient());
        assert!(!BackendError::from_status(400, String::new()).is_transient());
        assert!(!BackendError::Cancelled.is_transient());
    }

    #[test]
    fn backend_error_keeps_raw_body() {
        let err = BackendError::from_status(409, r#"{"error":"exists"}"#.to_string());
        assert_eq!(err.to_string(), r#"request rejected (HTTP 409): {"error":"exists"}"#);
    }

    #[test]
    fn validation_errors_become_attribute_diagnostics() {
        let err = TfcrudError::Validation(vec![
            ValidationError::MissingRequired {
                attribute: AttributePath::new("name"),
            },
            ValidationError::RuleViolation {
                attribute: AttributePath::new("access"),
                message: "must be one of: allow, block".to_string(),
            },
        ]);

        let diags = err.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("name")));
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[1].attribute, Some(AttributePath::new("access")));
        assert!(diags[1].detail.contains("allow, block"));
    }

    #[test]
    fn unsupported_operation_diagnostic_names_operation() {
        let err = TfcrudError::UnsupportedOperation {
            type_name: "guardrail_api_key".to_string(),
            operation: "Update".to_string(),
            reason: "every attribute forces replacement".to_string(),
        };

        let diags = err.diagnostics();
        assert_eq!(diags[0].summary, "Update Not Supported");
    }
}
