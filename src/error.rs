use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Request-scoped failures. None of these are fatal to the process.
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "{}", _0)]
    InvalidInput(String),
    #[display(fmt = "Role tidak boleh absen")]
    RoleNotAllowed,
    #[display(fmt = "User tidak ditemukan")]
    UserNotFound,
    #[display(fmt = "QR Code tidak valid")]
    InvalidCode,
    #[display(fmt = "QR Code bukan milik departemen kamu")]
    DepartmentMismatch,
    #[display(fmt = "Kamu sudah check-in hari ini")]
    AlreadyCheckedIn,
    #[display(fmt = "Belum ada check-in hari ini")]
    NotCheckedIn,
    #[display(fmt = "Kamu sudah check-out hari ini")]
    AlreadyCheckedOut,
    #[display(fmt = "Alasan wajib diisi jika pulang lebih awal")]
    ReasonRequired,
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "internal error: {}", _0)]
    Internal(anyhow::Error),
}

impl std::error::Error for AttendanceError {}

impl AttendanceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Machine readable code returned next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::RoleNotAllowed => "ROLE_NOT_ALLOWED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidCode => "INVALID_CODE",
            Self::DepartmentMismatch => "DEPARTMENT_MISMATCH",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::NotCheckedIn => "NOT_CHECKED_IN",
            Self::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(key) => Self::Conflict(format!("Data sudah ada ({key})")),
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::ReasonRequired => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RoleNotAllowed
            | Self::InvalidCode
            | Self::DepartmentMismatch
            | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::NotCheckedIn | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyCheckedIn | Self::AlreadyCheckedOut | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal(e) = self {
            tracing::error!(error = ?e, "Unhandled internal error");
            return HttpResponse::InternalServerError().json(json!({
                "error": self.code(),
                "message": "Something went wrong, Contact with system admin"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = resp.into_body().try_into_bytes().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn business_rejections_map_to_client_errors() {
        assert_eq!(AttendanceError::AlreadyCheckedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(AttendanceError::NotCheckedIn.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AttendanceError::ReasonRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AttendanceError::DepartmentMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AttendanceError::RoleNotAllowed.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn body_carries_code_and_message() {
        let body = body_json(AttendanceError::AlreadyCheckedOut.error_response());
        assert_eq!(body["error"], "ALREADY_CHECKED_OUT");
        assert_eq!(body["message"], "Kamu sudah check-out hari ini");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AttendanceError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp);
        assert_eq!(body["error"], "INTERNAL");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));
    }
}
