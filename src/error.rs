use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;

use crate::response::server_error;

pub type Result<T> = std::result::Result<T, ThrottleError>;

#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("address {addr}: {kind}")]
    AddressParse { addr: String, kind: AddrErrorKind },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a source address could not be split into host and port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrErrorKind {
    MissingPort,
    TooManyColons,
    MissingClosingBracket,
    UnexpectedOpeningBracket,
    UnexpectedClosingBracket,
}

impl fmt::Display for AddrErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AddrErrorKind::MissingPort => "missing port in address",
            AddrErrorKind::TooManyColons => "too many colons in address",
            AddrErrorKind::MissingClosingBracket => "missing ']' in address",
            AddrErrorKind::UnexpectedOpeningBracket => "unexpected '[' in address",
            AddrErrorKind::UnexpectedClosingBracket => "unexpected ']' in address",
        };
        f.write_str(msg)
    }
}

impl ThrottleError {
    pub fn address(addr: &str, kind: AddrErrorKind) -> Self {
        ThrottleError::AddressParse {
            addr: addr.to_string(),
            kind,
        }
    }
}

impl IntoResponse for ThrottleError {
    fn into_response(self) -> Response {
        tracing::error!(target: "ipthrottle::error", error = %self, "Request failed");
        server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_address_error_display() {
        let err = ThrottleError::address("not-an-address", AddrErrorKind::MissingPort);
        assert_eq!(err.to_string(), "address not-an-address: missing port in address");
    }

    #[test]
    fn test_into_response_is_internal_error() {
        let err = ThrottleError::address("a:b:c", AddrErrorKind::TooManyColons);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
