//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across frontends (HTTP,
//! WebSocket, replication) and the query/policy kernel, along with the HTTP
//! status mapping applied at the API boundary.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// A selector token cannot be decomposed into tag/origin per the grammar.
    /// Always a client input error; never retried.
    MalformedSelector { code: String, message: String },
    /// Unbalanced parentheses, empty alternatives, or a malformed token
    /// inside a query expression.
    InvalidQuery { code: String, message: String },
    /// An origin-only predicate was requested with a non-empty tag or a
    /// wildcard origin. This is a caller bug, not bad user input.
    UnsupportedSelector { code: String, message: String },
    Auth { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::MalformedSelector { code, .. }
            | AppError::InvalidQuery { code, .. }
            | AppError::UnsupportedSelector { code, .. }
            | AppError::Auth { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::MalformedSelector { message, .. }
            | AppError::InvalidQuery { message, .. }
            | AppError::UnsupportedSelector { message, .. }
            | AppError::Auth { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn malformed_selector<S: Into<String>>(msg: S) -> Self {
        AppError::MalformedSelector { code: "malformed_selector".into(), message: msg.into() }
    }
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        AppError::InvalidQuery { code: "invalid_query".into(), message: msg.into() }
    }
    pub fn unsupported_selector<S: Into<String>>(msg: S) -> Self {
        AppError::UnsupportedSelector { code: "unsupported_selector".into(), message: msg.into() }
    }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self {
        AppError::Auth { code: code.into(), message: msg.into() }
    }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self {
        AppError::NotFound { code: code.into(), message: msg.into() }
    }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self {
        AppError::Internal { code: code.into(), message: msg.into() }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::MalformedSelector { .. } => 400,
            AppError::InvalidQuery { .. } => 400,
            // Programming-contract violation inside the predicate library;
            // surfaced as a server fault, never blamed on the client.
            AppError::UnsupportedSelector { .. } => 500,
            AppError::Auth { .. } => 401,
            AppError::NotFound { .. } => 404,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
