//! Error types and handling
//!
//! Every failure a console operation can hit is expressed as an [`AppError`].
//! Validation problems found before anything is sent live in [`ValidationError`]
//! so that callers can tell "the form is wrong" apart from "the backend said no".

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::error;

/// Fallback text when the backend rejects a request without a message
pub const GENERIC_REJECTION_MESSAGE: &str = "The backend rejected the request";

/// Text shown for any transport-level failure
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Request failed, please try again";

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Input failed client-side validation; nothing was sent
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network or HTTP failure (non-200, unreadable body, timeout)
    #[error("Request failed: {0}")]
    Transport(String),

    /// HTTP 200 with a non-success status code; carries the backend message
    #[error("{0}")]
    DomainRejection(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spreadsheet export failed
    #[error("Export error: {0}")]
    Export(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a domain rejection from an optional backend message
    pub fn rejection(message: Option<&str>) -> Self {
        match message.map(str::trim) {
            Some(msg) if !msg.is_empty() => AppError::DomainRejection(msg.to_string()),
            _ => AppError::DomainRejection(GENERIC_REJECTION_MESSAGE.to_string()),
        }
    }

    /// Whether re-triggering the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::Validation(ValidationError::VerificationUnavailable(_))
        )
    }

    /// Notification text for the operator
    ///
    /// Transport failures never leak detail beyond "request failed"; domain
    /// rejections pass the backend message through unchanged.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::Transport(detail) => {
                error!(detail = %detail, "Transport failure");
                TRANSPORT_FAILURE_MESSAGE.to_string()
            }
            AppError::DomainRejection(message) => message.clone(),
            AppError::NotFound(what) => format!("{} does not exist", what),
            AppError::Config(_) | AppError::Export(_) | AppError::Internal(_) => self.to_string(),
        }
    }
}

/// Category of a rejected email address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmailIssue {
    /// Not a syntactically valid address
    Format,
    /// Valid syntax but not a registered user
    Unknown,
    /// Already a member of the enterprise being extended
    Duplicate,
}

/// Offending addresses grouped by what is wrong with them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailIssues {
    pub malformed: BTreeSet<String>,
    pub unregistered: BTreeSet<String>,
    pub duplicates: BTreeSet<String>,
}

impl EmailIssues {
    pub fn record(&mut self, issue: EmailIssue, email: impl Into<String>) {
        let email = email.into();
        match issue {
            EmailIssue::Format => self.malformed.insert(email),
            EmailIssue::Unknown => self.unregistered.insert(email),
            EmailIssue::Duplicate => self.duplicates.insert(email),
        };
    }

    pub fn is_empty(&self) -> bool {
        self.malformed.is_empty() && self.unregistered.is_empty() && self.duplicates.is_empty()
    }

    /// Every offending address regardless of category
    pub fn all(&self) -> BTreeSet<String> {
        self.malformed
            .iter()
            .chain(&self.unregistered)
            .chain(&self.duplicates)
            .cloned()
            .collect()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.malformed.contains(email)
            || self.unregistered.contains(email)
            || self.duplicates.contains(email)
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for EmailIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.malformed.is_empty() {
            parts.push(format!("invalid email format: {}", join(&self.malformed)));
        }
        if !self.unregistered.is_empty() {
            parts.push(format!(
                "not registered, ask them to register first: {}",
                join(&self.unregistered)
            ));
        }
        if !self.duplicates.is_empty() {
            parts.push(format!(
                "already enterprise members: {}",
                join(&self.duplicates)
            ));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Client-side validation failures that block submission
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one email address is required")]
    EmptyEmailSet,

    #[error("{0}")]
    InvalidEmailSet(EmailIssues),

    /// The registration lookup itself failed; retry before submitting
    #[error("Could not verify email registration: {0}")]
    VerificationUnavailable(String),

    #[error("Effective time {effective_at} must be before expire time {expire_at}")]
    InvalidWindow {
        effective_at: String,
        expire_at: String,
    },

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

impl ValidationError {
    /// Offending addresses when this is an email-set failure
    pub fn invalid_emails(&self) -> BTreeSet<String> {
        match self {
            ValidationError::InvalidEmailSet(issues) => issues.all(),
            _ => BTreeSet::new(),
        }
    }
}

// Implement From for common error types

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport("request timed out".to_string())
        } else if err.is_connect() {
            AppError::Transport("failed to connect to the backend".to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Transport(format!("failed to parse response: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::InvalidField(err.to_string()))
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Export(err.to_string())
    }
}

/// Result type alias for console operations
pub type AppResult<T> = Result<T, AppError>;
