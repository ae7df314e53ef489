use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Every rejection the API can produce. Field staff see `message`, clients
/// branch on `error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("GPS accuracy {accuracy:.0}m is too low; this location allows at most {allowed}m")]
    InsufficientAccuracy { accuracy: f64, allowed: u32 },

    #[error("{}", outside_message(.distance_m))]
    OutsideGeofence { distance_m: Option<f64> },

    #[error("Location is not assigned to this employee")]
    LocationNotAssigned,

    #[error("Already checked in; check out first")]
    AlreadyCheckedIn { record_id: u64 },

    #[error("No open check-in found")]
    NoOpenRecord,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn outside_message(distance_m: &Option<f64>) -> String {
    match distance_m {
        Some(d) => format!("Outside the allowed zone ({d:.0}m from the nearest assigned location)"),
        None => "Outside the allowed zone of every assigned location".to_string(),
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "outside_geofence")]
    pub error: &'static str,
    #[schema(example = "Outside the allowed zone (62m from the nearest assigned location)")]
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InsufficientAccuracy { .. } => "insufficient_accuracy",
            AppError::OutsideGeofence { .. } => "outside_geofence",
            AppError::LocationNotAssigned => "location_not_assigned",
            AppError::AlreadyCheckedIn { .. } => "already_checked_in",
            AppError::NoOpenRecord => "no_open_record",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Database(_) => "internal_error",
        }
    }

    /// True when the storage layer rejected a write on a unique key.
    /// Foreign-key and other integrity violations share SQLSTATE 23000, so
    /// the driver's error kind decides.
    pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InsufficientAccuracy { .. }
            | AppError::OutsideGeofence { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::LocationNotAssigned | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NoOpenRecord | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyCheckedIn { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::Validation("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::OutsideGeofence { distance_m: Some(60.0) }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::AlreadyCheckedIn { record_id: 1 }.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NoOpenRecord.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::LocationNotAssigned.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn messages_explain_the_rejection() {
        let e = AppError::InsufficientAccuracy { accuracy: 80.0, allowed: 50 };
        assert_eq!(e.to_string(), "GPS accuracy 80m is too low; this location allows at most 50m");

        let e = AppError::OutsideGeofence { distance_m: Some(60.4) };
        assert_eq!(e.to_string(), "Outside the allowed zone (60m from the nearest assigned location)");
    }

    #[derive(Debug)]
    struct IntegrityError {
        unique: bool,
    }

    impl std::fmt::Display for IntegrityError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("integrity constraint violation")
        }
    }

    impl std::error::Error for IntegrityError {}

    impl sqlx::error::DatabaseError for IntegrityError {
        fn message(&self) -> &str {
            "integrity constraint violation"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some("23000".into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::ForeignKeyViolation
            }
        }
    }

    #[test]
    fn only_unique_violations_count_as_duplicates() {
        let unique = sqlx::Error::Database(Box::new(IntegrityError { unique: true }));
        let foreign_key = sqlx::Error::Database(Box::new(IntegrityError { unique: false }));
        assert!(AppError::is_duplicate_key(&unique));
        assert!(!AppError::is_duplicate_key(&foreign_key));
        assert!(!AppError::is_duplicate_key(&sqlx::Error::RowNotFound));
    }
}
