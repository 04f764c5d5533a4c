use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::{
    model::{
        attendance::{AttendanceRecord, AttendanceStatus, AttendanceType, GeoPoint},
        badge::Badge,
        department::Department,
        role::Role,
        user::User,
    },
    models::{LoginReqDto, LoginResponse},
    service::{
        directory::{DepartmentPatch, DepartmentView, NewDepartment},
        engine::{CheckInRequest, CheckOutRequest, ScanOutcome},
        report::{
            DailySummary, DepartmentAttendance, RangeKind, Report, ReportEntry, ReportRange,
            UserSummary,
        },
        users::{NewUser, UserPatch},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Absensi API",
        version = "1.0.0",
        description = r#"
## Employee attendance

Workers scan the badge of their department to **check in** and **check out**.
Each scan is checked against the department shift window:

- check-in more than the grace period after shift start is **LATE**
- check-out before shift end needs a reason and is **EARLY_OUT**
- check-out well after shift end is **OVERTIME**

Admins manage departments, badges and accounts and read grouped reports.

### 🔐 Security
Everything under `/api` needs a **JWT Bearer** token from `POST /auth/login`.

### 📦 Errors
Errors are returned as `{ "error": "<CODE>", "message": "<text>" }`.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::report,
        crate::api::attendance::user_attendance,
        crate::api::attendance::department_attendance,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,
        crate::api::department::regenerate_badge,
        crate::api::department::find_badge,

        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::update_user,
        crate::api::user::delete_user
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Role,
            User,
            Department,
            Badge,
            AttendanceType,
            AttendanceStatus,
            AttendanceRecord,
            GeoPoint,
            CheckInRequest,
            CheckOutRequest,
            ScanOutcome,
            RangeKind,
            ReportRange,
            UserSummary,
            ReportEntry,
            Report,
            DailySummary,
            DepartmentAttendance,
            NewDepartment,
            DepartmentPatch,
            DepartmentView,
            NewUser,
            UserPatch
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Attendance", description = "Check-in, check-out and reports"),
        (name = "Department", description = "Departments and their badges"),
        (name = "User", description = "Account administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
