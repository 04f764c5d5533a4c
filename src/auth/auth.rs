use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::{
    error::AttendanceError,
    model::role::Role,
    models::Claims,
    service::policy::{Action, can_perform},
};

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AttendanceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AttendanceError::Unauthorized("Token tidak ditemukan".into())),
        )
    }
}

impl AuthUser {
    pub fn require(&self, action: Action) -> Result<(), AttendanceError> {
        if can_perform(self.role, action, None) {
            Ok(())
        } else {
            Err(AttendanceError::forbidden("Akses ditolak"))
        }
    }

    /// Attendance is recorded by the account itself only.
    pub fn require_self(&self, user_id: &str) -> Result<(), AttendanceError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AttendanceError::forbidden(
                "Tidak boleh mencatat absensi untuk user lain",
            ))
        }
    }
}
