use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("payment provider request failed: {0}")]
    ExternalProvider(String),
    #[error("storage error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl ApiError {
    pub fn from_validation(errors: &ValidationErrors) -> Self {
        ApiError::Validation(field_error_list(errors))
    }
}

/// Flattens validator output into the wire shape: one entry per failed field
/// (named as it appears on the wire), sorted so the order is stable.
pub fn field_error_list(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut list: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |err| FieldError {
                field: wire_field(field),
                message: err
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            })
        })
        .collect();
    list.sort_by(|a, b| a.field.cmp(&b.field));
    list
}

/// Request bodies are camelCase on the wire; validator reports Rust field
/// names. Convert so the error list matches what the caller sent.
fn wire_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ExternalProvider(_) | ApiError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(errors) => {
                HttpResponse::BadRequest().json(json!({ "errors": errors }))
            }
            ApiError::Unauthorized(message) => {
                HttpResponse::Unauthorized().json(json!({ "message": message }))
            }
            ApiError::NotFound(message) => {
                HttpResponse::NotFound().json(json!({ "message": message }))
            }
            ApiError::ExternalProvider(_) | ApiError::Persistence(_) => {
                error!("{self}");
                HttpResponse::InternalServerError().json(json!({ "message": "Server error" }))
            }
        }
    }
}
