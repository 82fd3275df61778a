use axum::extract::rejection::JsonRejection;
use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt::Debug;

use crate::geometry::ValidationError;

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // unique_violation: the coordinate backstop fired after validation passed
            if db_err.code().as_deref() == Some("23505") {
                tracing::warn!("duplicate coordinate rejected by store constraint");
                return ValidationError::Duplicate.into();
            }
        }

        Error::database_error(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::Malformed(_) => 101,
            ValidationError::WrongGeometryType(_) => 102,
            ValidationError::OutOfRange { .. } => 103,
            ValidationError::Duplicate => 104,
        };

        Error {
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(err: JsonRejection) -> Self {
        Error {
            code: 100,
            message: format!("invalid input: {}", err),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            200..=299 => (StatusCode::NOT_FOUND, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl Error {
    pub fn invalid_field_error(field: &str, reason: &str) -> Self {
        Self {
            code: 105,
            message: format!("{}: {}", field, reason),
        }
    }

    pub fn missing_field_error(field: &str) -> Self {
        Self::invalid_field_error(field, "this field is required")
    }

    pub fn invalid_coordinates_error() -> Self {
        Self {
            code: 106,
            message: "invalid coordinates".into(),
        }
    }

    pub fn not_found_error() -> Self {
        Self {
            code: 200,
            message: "not found".into(),
        }
    }

    pub fn no_places_error() -> Self {
        Self {
            code: 201,
            message: "no places found".into(),
        }
    }

    pub fn database_error<T: Debug>(err: T) -> Self {
        tracing::error!("database error: {:?}", err);

        Self {
            code: 2,
            message: "database error".into(),
        }
    }

    pub fn config_error(key: &str) -> Self {
        Self {
            code: 3,
            message: format!("invalid configuration value for {}", key),
        }
    }

    pub fn server_error<T: Debug>(err: T) -> Self {
        tracing::error!("server error: {:?}", err);

        Self {
            code: 4,
            message: "server error".into(),
        }
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == 200
    }

    pub fn is_validation_error(&self) -> bool {
        (100..=199).contains(&self.code)
    }
}

#[test]
fn validation_errors_map_to_bad_request() {
    let err: Error = ValidationError::Duplicate.into();
    assert_eq!(err.code, 104);
    assert!(err.is_validation_error());

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn not_found_errors_map_to_not_found() {
    assert_eq!(
        Error::not_found_error().into_response().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        Error::no_places_error().into_response().status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn internal_errors_hide_details() {
    let response = Error::database_error("connection reset").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn startup_errors_are_internal() {
    let config = Error::config_error("GEOPLACES_MAX_CONNECTIONS");
    assert_eq!(config.code, 3);
    assert!(config.message.contains("GEOPLACES_MAX_CONNECTIONS"));
    assert_eq!(
        config.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let server = Error::server_error("address in use");
    assert_eq!(server.code, 4);
    assert_eq!(
        server.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
