use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EnvVar,
    Request,
    Upstream,
    Unexpected,
    TransportLost,
    InvalidJourneyId,
    MalformedUpdate,
    NotFound,
    InvalidInput,
}

impl ErrorKind {
    pub fn code(&self) -> i32 {
        match self {
            Self::EnvVar => 1,
            Self::Request => 3,
            Self::Upstream => 4,
            Self::Unexpected => 5,
            Self::TransportLost => 6,
            Self::InvalidJourneyId => 100,
            Self::MalformedUpdate => 101,
            Self::NotFound => 102,
            Self::InvalidInput => 103,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.code(), self.message)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        malformed_update_error(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.kind {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.message.as_str()),
            ErrorKind::Upstream | ErrorKind::TransportLost | ErrorKind::Request => {
                (StatusCode::BAD_GATEWAY, "Bad Gateway")
            }
            _ if self.code() < 100 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code(),
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_journey_id_error() -> Error {
    Error {
        kind: ErrorKind::InvalidJourneyId,
        message: "invalid journey id".into(),
    }
}

pub fn malformed_update_error(reason: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::MalformedUpdate,
        message: format!("malformed update: {}", reason.into()),
    }
}

pub fn not_found_error(journey_id: &str) -> Error {
    Error {
        kind: ErrorKind::NotFound,
        message: format!("journey {} not found", journey_id),
    }
}

pub fn invalid_input_error(reason: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::InvalidInput,
        message: reason.into(),
    }
}

pub fn transport_lost_error(reason: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::TransportLost,
        message: format!("transport lost: {}", reason.into()),
    }
}

pub fn env_var_error(err: env::VarError) -> Error {
    Error {
        kind: ErrorKind::EnvVar,
        message: format!("environment variable error: {}", err),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    Error {
        kind: ErrorKind::Request,
        message: format!("reqwest error: {}", err),
    }
}

pub fn upstream_error() -> Error {
    Error {
        kind: ErrorKind::Upstream,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        kind: ErrorKind::Unexpected,
        message: "unexpected error".into(),
    }
}
