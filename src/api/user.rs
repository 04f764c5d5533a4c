use actix_web::{HttpResponse, web};
use tracing::instrument;

use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    model::user::User,
    service::users::{NewUser, UserAdmin, UserPatch},
};

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All accounts", body = [User]),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    users: web::Data<UserAdmin>,
) -> Result<HttpResponse, AttendanceError> {
    Ok(HttpResponse::Ok().json(users.list(auth.role).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Missing department, position or short password"),
        (status = 403, description = "Role may not create this account"),
        (status = 409, description = "Username already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
#[instrument(
    name = "user_create",
    skip_all,
    fields(actor = %auth.username, username = %payload.username)
)]
pub async fn create_user(
    auth: AuthUser,
    payload: web::Json<NewUser>,
    users: web::Data<UserAdmin>,
) -> Result<HttpResponse, AttendanceError> {
    let user = users.create(auth.role, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, description = "Invalid field"),
        (status = 403, description = "Role may not modify this account"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
#[instrument(name = "user_update", skip_all, fields(actor = %auth.username, user_id = %path))]
pub async fn update_user(
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UserPatch>,
    users: web::Data<UserAdmin>,
) -> Result<HttpResponse, AttendanceError> {
    let user = users.update(auth.role, &path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Protected account or role may not delete it"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
#[instrument(name = "user_delete", skip_all, fields(actor = %auth.username, user_id = %path))]
pub async fn delete_user(
    auth: AuthUser,
    path: web::Path<String>,
    users: web::Data<UserAdmin>,
) -> Result<HttpResponse, AttendanceError> {
    users.delete(auth.role, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
