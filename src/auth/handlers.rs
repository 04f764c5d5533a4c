use actix_web::{HttpResponse, web};
use tracing::{debug, info, instrument};

use crate::{
    auth::jwt::generate_access_token,
    config::Config,
    error::AttendanceError,
    models::{LoginReqDto, LoginResponse},
    service::users::UserAdmin,
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(users, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    users: web::Data<UserAdmin>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AttendanceError::invalid("Username dan password wajib diisi"));
    }

    let account = users.authenticate(&user.username, &user.password).await?;

    debug!(user_id = %account.id, "Generating access token");
    let access_token = generate_access_token(&account, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| AttendanceError::Internal(e.into()))?;

    info!(user_id = %account.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        user: account,
    }))
}
