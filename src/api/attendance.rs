use std::str::FromStr;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    service::{
        engine::{AttendanceEngine, CheckInRequest, CheckOutRequest, ScanOutcome},
        policy::{Action, can_perform},
        report::{DailySummary, DepartmentAttendance, RangeKind, Report, ReportAggregator},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// `daily` (default), `yesterday`, `weekly` or `monthly`.
    #[serde(rename = "type")]
    #[param(example = "weekly")]
    pub kind: Option<String>,
}

/// Callers scan only for themselves. A blank `userId` is a missing field,
/// not someone else's id.
fn can_record(auth: &AuthUser, user_id: &str) -> Result<(), AttendanceError> {
    if user_id.trim().is_empty() {
        return Err(AttendanceError::invalid("userId wajib diisi"));
    }
    if !can_perform(auth.role, Action::RecordAttendance, None) {
        return Err(AttendanceError::RoleNotAllowed);
    }
    auth.require_self(user_id.trim())
}

/// Check-in by scanning the department badge
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = ScanOutcome),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Role not allowed, invalid code or wrong department"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already checked in today"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_in", skip_all, fields(caller = %auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    body: web::Json<CheckInRequest>,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, AttendanceError> {
    let mut req = body.into_inner();
    can_record(&auth, &req.user_id)?;
    if req.role.trim().is_empty() {
        req.role = auth.role.to_string();
    }

    let outcome = engine.check_in(req).await?;
    Ok(HttpResponse::Created().json(outcome))
}

/// Check-out by scanning the department badge
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    request_body = CheckOutRequest,
    responses(
        (status = 201, description = "Checked out", body = ScanOutcome),
        (status = 400, description = "Missing fields or early check-out without a reason"),
        (status = 403, description = "Role not allowed, invalid code or wrong department"),
        (status = 404, description = "User not found or no check-in today"),
        (status = 409, description = "Already checked out today"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_out", skip_all, fields(caller = %auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    body: web::Json<CheckOutRequest>,
    engine: web::Data<AttendanceEngine>,
) -> Result<HttpResponse, AttendanceError> {
    let req = body.into_inner();
    can_record(&auth, &req.user_id)?;

    let outcome = engine.check_out(req).await?;
    Ok(HttpResponse::Created().json(outcome))
}

/// Attendance grouped by date, then department
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Grouped report", body = Report),
        (status = 400, description = "Unknown range type"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_report", skip_all, fields(kind = ?query.kind))]
pub async fn report(
    auth: AuthUser,
    query: web::Query<ReportQuery>,
    reports: web::Data<ReportAggregator>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ViewReports)?;

    let kind = match query.kind.as_deref().map(str::trim) {
        None | Some("") => RangeKind::Daily,
        Some(raw) => RangeKind::from_str(raw).map_err(|_| {
            AttendanceError::invalid("type harus daily, yesterday, weekly atau monthly")
        })?,
    };

    let report = reports.report(kind, reports.now()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// One user's attendance, one entry per day
#[utoipa::path(
    get,
    path = "/api/attendance/user/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Daily summaries, newest first", body = [DailySummary]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_user", skip_all, fields(user_id = %path))]
pub async fn user_attendance(
    auth: AuthUser,
    path: web::Path<String>,
    reports: web::Data<ReportAggregator>,
) -> Result<HttpResponse, AttendanceError> {
    let user_id = path.into_inner();
    if auth.user_id != user_id {
        auth.require(Action::ViewReports)?;
    }

    let days = reports.user_attendance(&user_id).await?;
    Ok(HttpResponse::Ok().json(days))
}

/// All attendance rows of one department, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/department/{department_id}",
    params(("department_id" = String, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department attendance", body = DepartmentAttendance),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_department", skip_all, fields(department_id = %path))]
pub async fn department_attendance(
    auth: AuthUser,
    path: web::Path<String>,
    reports: web::Data<ReportAggregator>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require(Action::ViewReports)?;

    let view = reports.department_attendance(&path).await?;
    Ok(HttpResponse::Ok().json(view))
}
