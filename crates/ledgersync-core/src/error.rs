//! Error types for ledgersync-core
//!
//! Reads fail soft (`Fetch`), form problems never leave the client
//! (`Validation`), writes to locked or rejected rows fail loud
//! (`Permission`), and superseded page responses are swallowed internally
//! (`StaleResponse`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::FormField;
use crate::models::TransactionId;
use rust_decimal::Decimal;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Read failed (transport, non-2xx, timeout, undecodable body)
    FetchError,
    /// Client-side form rule violation
    ValidationError,
    /// Mutation of a locked row, or a write the store rejected
    PermissionError,
    /// Response for a superseded page request
    StaleResponse,
    /// Single transaction lookup found nothing
    TransactionNotFound,
    /// The store accepted a write but its reply could not be read
    UnreadableAcknowledgment,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::FetchError => write!(f, "FETCH_ERROR"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::PermissionError => write!(f, "PERMISSION_ERROR"),
            ErrorCode::StaleResponse => write!(f, "STALE_RESPONSE"),
            ErrorCode::TransactionNotFound => write!(f, "TRANSACTION_NOT_FOUND"),
            ErrorCode::UnreadableAcknowledgment => write!(f, "UNREADABLE_ACKNOWLEDGMENT"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Debug information, never shown
    Debug,
    /// Informational
    Info,
    /// Warning - the view is degraded but usable
    Warning,
    /// Error - the requested operation failed
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Debug => write!(f, "debug"),
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Detailed error information for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// One broken form rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("no form is open")]
    FormClosed,

    #[error("{field} is required")]
    MissingField { field: FormField },

    #[error("{field} is not used by this transaction type")]
    HiddenField { field: FormField },

    #[error("amount '{value}' is not a number")]
    InvalidAmount { value: String },

    #[error("amount must be greater than 0")]
    NonPositiveAmount,

    #[error("amount must be at least {min}")]
    AmountTooSmall { min: Decimal },

    #[error("unknown transaction type '{value}'")]
    InvalidType { value: String },

    #[error("{field} '{account}' is not a known account")]
    UnknownAccount { field: FormField, account: String },

    #[error("cannot transfer to the same account")]
    SameAccount,

    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("page number and page size must be at least 1")]
    InvalidPage,
}

/// Main error type for ledgersync-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to fetch {resource}: {message}")]
    Fetch {
        resource: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Validation failed: {}", join_issues(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error("Permission denied: {message}")]
    Permission {
        id: Option<TransactionId>,
        message: String,
    },

    #[error("Stale response for page {requested} (selected page {selected})")]
    StaleResponse { requested: u32, selected: u32 },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: TransactionId },

    /// 2xx from the store with a body that is not a transaction
    #[error("Write accepted, but the store's reply could not be read: {message}")]
    UnreadableAcknowledgment {
        id: Option<TransactionId>,
        message: String,
    },
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    /// Read failure for `resource`
    pub fn fetch(resource: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Fetch {
            resource: resource.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Write on a locked row
    pub fn locked(id: TransactionId) -> Self {
        CoreError::Permission {
            id: Some(id),
            message: format!("transaction {} is locked and can no longer be changed", id),
        }
    }

    /// Single validation issue
    pub fn invalid(issue: ValidationIssue) -> Self {
        CoreError::Validation {
            issues: vec![issue],
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Fetch { .. } => ErrorCode::FetchError,
            CoreError::Validation { .. } => ErrorCode::ValidationError,
            CoreError::Permission { .. } => ErrorCode::PermissionError,
            CoreError::StaleResponse { .. } => ErrorCode::StaleResponse,
            CoreError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            CoreError::UnreadableAcknowledgment { .. } => ErrorCode::UnreadableAcknowledgment,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Fetch { .. } => ErrorSeverity::Warning,
            CoreError::Validation { .. } => ErrorSeverity::Warning,
            CoreError::Permission { .. } => ErrorSeverity::Error,
            CoreError::StaleResponse { .. } => ErrorSeverity::Debug,
            CoreError::TransactionNotFound { .. } => ErrorSeverity::Info,
            CoreError::UnreadableAcknowledgment { .. } => ErrorSeverity::Warning,
        }
    }

    /// Whether the store is known to have applied the write
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, CoreError::UnreadableAcknowledgment { .. })
    }

    /// Whether the presentation layer should ever see this error
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CoreError::StaleResponse { .. })
    }

    /// Validation issues carried by this error, if any
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            CoreError::Validation { issues } => issues,
            _ => &[],
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::Fetch { resource, status, .. } => {
                details = details.with_detail(serde_json::json!({
                    "resource": resource,
                    "status": status,
                }));
                details = details.with_suggestion(
                    "Check that the transaction store is reachable, then retry.".to_string(),
                );
            }
            CoreError::Validation { issues } => {
                details = details.with_detail(serde_json::json!({ "issues": issues }));
                details = details.with_suggestion(
                    "Correct the highlighted fields and submit again.".to_string(),
                );
            }
            CoreError::Permission { id, .. } => {
                details = details.with_detail(serde_json::json!({ "id": id }));
                details = details.with_suggestion(
                    "Locked transactions cannot be edited or deleted; create a new one instead."
                        .to_string(),
                );
            }
            CoreError::TransactionNotFound { .. } => {
                details = details.with_suggestion(
                    "The transaction may have been removed; refresh the list.".to_string(),
                );
            }
            CoreError::UnreadableAcknowledgment { id, .. } => {
                details = details.with_detail(serde_json::json!({ "id": id }));
                details = details.with_suggestion(
                    "The write went through; check the refreshed list before retrying.".to_string(),
                );
            }
            CoreError::StaleResponse { .. } => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

// ==================== Tests ====================
