// Errors raised by the hub, its managers and endpoint handlers

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no endpoint at {0}")]
    NotFound(String),

    #[error("method {0} not supported")]
    MethodNotAllowed(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("cannot instantiate endpoint {endpoint}: {reason}")]
    Instantiation { endpoint: String, reason: String },

    #[error("endpoint handler failed: {0}")]
    Handler(String),

    #[error("cannot serialize: {0}")]
    Serialization(String),

    #[error("cannot deserialize: {0}")]
    Deserialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn instantiation(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Instantiation {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Status a dispatcher answers with when this error escapes a handler
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::NotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::BadRequest(_) | Error::InvalidUri(_) | Error::Deserialization(_) => HttpStatus::BadRequest,
            Error::Instantiation { .. }
            | Error::Handler(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Internal(_) => HttpStatus::InternalServerError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::NotFound("/x".into()).status_code(), 404);
        assert_eq!(Error::MethodNotAllowed("PUT".into()).status_code(), 405);
        assert_eq!(Error::InvalidUri("::".into()).status_code(), 400);
        assert_eq!(Error::instantiation("a.b", "missing dependency").status_code(), 500);
        assert_eq!(Error::Handler("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::NotFound("/x".into()).is_client_error());
        assert!(!Error::NotFound("/x".into()).is_server_error());
        assert!(Error::Internal("x".into()).is_server_error());
    }

    #[test]
    fn test_instantiation_message() {
        let err = Error::instantiation("webcore.test.resource", "no database");
        assert_eq!(
            err.to_string(),
            "cannot instantiate endpoint webcore.test.resource: no database"
        );
    }
}
