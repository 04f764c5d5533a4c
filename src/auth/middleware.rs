use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use tracing::debug;

use crate::{auth::auth::AuthUser, auth::jwt::verify_token, config::Config, error::AttendanceError};

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = AttendanceError::Unauthorized(message.to_string()).error_response();
    req.into_response(resp)
}

/// Bearer-token check for the protected scope.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization").map(|h| h.to_str()) {
        Some(Ok(h)) => h,
        Some(Err(_)) => return Ok(reject(req, "Header Authorization tidak valid")),
        None => return Ok(reject(req, "Header Authorization wajib diisi")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(req, "Header Authorization harus diawali Bearer"));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected token");
            return Ok(reject(req, "Token tidak valid atau kedaluwarsa"));
        }
    };

    req.extensions_mut().insert(AuthUser::from(claims));

    next.call(req).await
}
