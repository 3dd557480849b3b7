use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::{Value, json};

/// Crate-wide error taxonomy. Every handler failure path maps onto one of
/// these; the state-conflict variants carry the current record so the client
/// can render it without a follow-up fetch.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Unauthenticated(String),

    #[display(fmt = "{}", _0)]
    PermissionDenied(String),

    #[display(fmt = "{}: {}", field, message)]
    Validation { field: String, message: String },

    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn { current: Value },

    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut { current: Value },

    #[display(fmt = "No check-in found for today")]
    NoCheckInFound,

    #[display(fmt = "An attendance record already exists for this user and date")]
    DuplicateRecord { current: Value },

    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Machine-readable code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::PermissionDenied(_) => "permission_denied",
            ApiError::Validation { .. } => "validation_error",
            ApiError::AlreadyCheckedIn { .. } => "already_checked_in",
            ApiError::AlreadyCheckedOut { .. } => "already_checked_out",
            ApiError::NoCheckInFound => "no_check_in_found",
            ApiError::DuplicateRecord { .. } => "duplicate_record",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal => "internal",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::Validation { .. }
            | ApiError::AlreadyCheckedIn { .. }
            | ApiError::AlreadyCheckedOut { .. }
            | ApiError::NoCheckInFound
            | ApiError::DuplicateRecord { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });

        match self {
            ApiError::Validation { field, .. } => {
                body["field"] = json!(field);
            }
            ApiError::AlreadyCheckedIn { current }
            | ApiError::AlreadyCheckedOut { current }
            | ApiError::DuplicateRecord { current } => {
                body["current"] = current.clone();
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        ApiError::Internal
    }
}

/// MySQL reports unique-key violations as SQLSTATE 23000. The attendance
/// unique key on (user_id, date) is what makes concurrent check-ins safe, so
/// callers translate this into the matching state-conflict error instead of
/// a generic 500.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::PermissionDenied("students only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::validation("date", "required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::AlreadyCheckedIn { current: json!({}) }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NoCheckInFound.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_errors_carry_current_state() {
        let current = json!({"check_in_time": "2026-01-05T07:50:00", "status": "present"});
        let err = ApiError::AlreadyCheckedIn {
            current: current.clone(),
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(resp.into_body());
        let body = futures::executor::block_on(body).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "already_checked_in");
        assert_eq!(parsed["current"], current);
    }

    #[test]
    fn validation_error_names_the_field() {
        let resp = ApiError::validation("check_in", "must not be in the future").error_response();
        let body = futures::executor::block_on(actix_web::body::to_bytes(resp.into_body())).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "validation_error");
        assert_eq!(parsed["field"], "check_in");
    }

    #[test]
    fn internal_error_leaks_no_detail() {
        let resp = ApiError::Internal.error_response();
        let body = futures::executor::block_on(actix_web::body::to_bytes(resp.into_body())).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["message"], "Internal Server Error");
        assert!(parsed.get("current").is_none());
    }
}
