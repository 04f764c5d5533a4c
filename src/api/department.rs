use actix_web::{HttpResponse, web};
use tracing::instrument;

use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    model::{badge::Badge, department::Department},
    service::{
        directory::{DepartmentDirectory, DepartmentPatch, DepartmentView, NewDepartment},
        policy::Action,
    },
};

/// List departments with their active badge
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "All departments", body = [DepartmentView]),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    _auth: AuthUser,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    Ok(HttpResponse::Ok().json(directory.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = String, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department", body = DepartmentView),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    _auth: AuthUser,
    path: web::Path<String>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    Ok(HttpResponse::Ok().json(directory.get(&path).await?))
}

/// Create a department; its badge is issued in the same step
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = NewDepartment,
    responses(
        (status = 201, description = "Department created", body = DepartmentView),
        (status = 400, description = "Invalid shift window or missing fields"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Name or code already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
#[instrument(name = "department_create", skip_all, fields(name = %payload.name))]
pub async fn create_department(
    auth: AuthUser,
    payload: web::Json<NewDepartment>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ManageDepartments)?;
    let view = directory.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    patch,
    path = "/api/departments/{id}",
    params(("id" = String, Path, description = "Department id")),
    request_body = DepartmentPatch,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Invalid shift window"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name or code already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
#[instrument(name = "department_update", skip_all, fields(department_id = %path))]
pub async fn update_department(
    auth: AuthUser,
    path: web::Path<String>,
    payload: web::Json<DepartmentPatch>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ManageDepartments)?;
    let department = directory.update(&path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = String, Path, description = "Department id")),
    responses(
        (status = 204, description = "Department and its badge removed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
#[instrument(name = "department_delete", skip_all, fields(department_id = %path))]
pub async fn delete_department(
    auth: AuthUser,
    path: web::Path<String>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ManageDepartments)?;
    directory.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Replace the department badge; the old value stops working
#[utoipa::path(
    post,
    path = "/api/departments/{id}/barcode",
    params(("id" = String, Path, description = "Department id")),
    responses(
        (status = 201, description = "New badge", body = Badge),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
#[instrument(name = "badge_regenerate", skip_all, fields(department_id = %path))]
pub async fn regenerate_badge(
    auth: AuthUser,
    path: web::Path<String>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ManageDepartments)?;
    let badge = directory.regenerate_badge(&path).await?;
    Ok(HttpResponse::Created().json(badge))
}

/// Look up a scanned badge value
#[utoipa::path(
    get,
    path = "/api/departments/barcode/{value}",
    params(("value" = String, Path, description = "Scanned badge value")),
    responses(
        (status = 200, description = "Badge", body = Badge),
        (status = 404, description = "Unknown badge"),
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn find_badge(
    _auth: AuthUser,
    path: web::Path<String>,
    directory: web::Data<DepartmentDirectory>,
) -> Result<HttpResponse, AttendanceError> {
    Ok(HttpResponse::Ok().json(directory.resolve_badge(&path).await?))
}
