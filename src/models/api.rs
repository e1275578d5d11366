//! Backend response envelope

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// The literal status code the backend uses to signal success
pub const SUCCESS_STATUS_CODE: i64 = 1000;

/// Envelope wrapping every backend response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Whether the status code equals the success sentinel
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS_CODE
    }

    /// Unwrap the payload of a successful response
    ///
    /// A non-sentinel status becomes [`AppError::DomainRejection`] carrying the
    /// backend message. A successful response without data is treated as a
    /// malformed reply.
    pub fn into_data(self) -> AppResult<T> {
        if !self.is_success() {
            return Err(AppError::rejection(self.message.as_deref()));
        }
        self.data.ok_or_else(|| {
            AppError::Transport("successful response carried no data".to_string())
        })
    }

    /// Check the sentinel and return the backend message, if any
    pub fn into_message(self) -> AppResult<Option<String>> {
        if self.is_success() {
            Ok(self.message.filter(|m| !m.trim().is_empty()))
        } else {
            Err(AppError::rejection(self.message.as_deref()))
        }
    }
}

impl<T> ApiResponse<T> {
    /// Build a response, mostly useful for tests and stubs
    pub fn new(status_code: i64, message: Option<&str>, data: Option<T>) -> Self {
        Self {
            status_code,
            error: None,
            message: message.map(str::to_string),
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(SUCCESS_STATUS_CODE, Some("ok"), Some(data))
    }
}

/// A page of results with an optional total count
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: Option<u64>,
}
