use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;

use crate::types::ReservationStatus;

/// Everything a booking operation can reject with. None of these are fatal.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("reservation cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("{operation} is not allowed: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict: {0}")]
    ConstraintViolation(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DomainError::NotFound { entity, key: key.to_string() }
    }
}

impl From<DieselError> for DomainError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => DomainError::not_found("record", "requested"),
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation => {
                    let constraint = info.constraint_name().unwrap_or("unnamed");
                    DomainError::ConstraintViolation(format!("{} ({constraint})", info.message()))
                }
                _ => DomainError::Storage(info.message().to_owned()),
            },
            other => DomainError::Storage(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for DomainError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DomainError::Storage(format!("Failed to establish connection: {err}"))
    }
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions to {0}")]
    Forbidden(&'static str),

    #[error("Unable to reach the database worker: {0}")]
    Mailbox(#[from] actix::MailboxError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::InvalidTransition { .. }
                | DomainError::InvalidState { .. }
                | DomainError::ConstraintViolation(_) => StatusCode::CONFLICT,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Mailbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Unable to perform action".to_owned()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let validation = ApiError::from(DomainError::Validation("phone is required".into()));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);

        let transition = ApiError::from(DomainError::InvalidTransition {
            from: ReservationStatus::Completed,
            to: ReservationStatus::Pending,
        });
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);

        let missing = ApiError::from(DomainError::not_found("restaurant", "le-test"));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "restaurant le-test not found");
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err = ApiError::from(DomainError::Storage("connection reset by peer".into()));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn diesel_not_found_becomes_domain_not_found() {
        assert!(matches!(
            DomainError::from(DieselError::NotFound),
            DomainError::NotFound { .. }
        ));
    }
}
