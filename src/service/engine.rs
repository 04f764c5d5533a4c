//! Check-in / check-out rules.
//!
//! Every scan is validated against the user's department and its badge, then
//! written as its own immutable row. A day holds at most one IN and one OUT
//! row per user; the storage unique key on (user_id, date, type) decides
//! between concurrent scans and the loser gets the matching "already" error.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    clock::Clock,
    directory::{DepartmentDirectory, geo_point},
};
use crate::{
    error::AttendanceError,
    model::{
        attendance::{AttendanceRecord, AttendanceStatus, AttendanceType, GeoPoint},
        badge::Badge,
        department::Department,
        role::Role,
        user::User,
    },
    store::{ATTENDANCE_DAY_KEY, Store, StoreError},
};

/// Grace periods around the shift window, in minutes.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub late_minutes: i64,
    pub early_minutes: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            late_minutes: 5,
            early_minutes: 5,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckInRequest {
    #[schema(example = "6f0c1a52-6a3c-4a7e-9d43-0f3c2f7d1b21")]
    pub user_id: String,
    #[schema(example = "PEKERJA")]
    pub role: String,
    #[schema(example = "IT-a83f5b")]
    pub qr_value: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOutRequest {
    pub user_id: String,
    #[schema(example = "IT-a83f5b")]
    pub qr_value: String,
    /// Required when leaving before the end of the shift.
    #[schema(example = "dokter")]
    pub reason: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanOutcome {
    #[schema(example = "Check-in berhasil")]
    pub message: String,
    pub data: AttendanceRecord,
}

pub struct AttendanceEngine {
    store: Arc<dyn Store>,
    directory: Arc<DepartmentDirectory>,
    clock: Arc<dyn Clock>,
    thresholds: Thresholds,
}

impl AttendanceEngine {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<DepartmentDirectory>,
        clock: Arc<dyn Clock>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            thresholds,
        }
    }

    pub async fn check_in(&self, req: CheckInRequest) -> Result<ScanOutcome, AttendanceError> {
        let user_id = req.user_id.trim();
        let role = req.role.trim();
        let qr_value = req.qr_value.trim();
        if user_id.is_empty() || role.is_empty() || qr_value.is_empty() {
            return Err(AttendanceError::invalid("userId, role, dan qrValue wajib diisi"));
        }
        let geo = geo_point(req.latitude, req.longitude)?;

        Role::from_str(role)
            .ok()
            .filter(Role::is_attendance_eligible)
            .ok_or(AttendanceError::RoleNotAllowed)?;

        let user = self.find_user(user_id).await?;
        if !user.role.is_attendance_eligible() {
            return Err(AttendanceError::RoleNotAllowed);
        }
        let (badge, department) = self.authorize_scan(&user, qr_value).await?;

        let now = self.clock.now();
        let today = now.date_naive();
        if self
            .store
            .find_attendance(&user.id, today, AttendanceType::In)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let late_by = seconds_since(department.start_time, now.time());
        let status = if late_by > self.thresholds.late_minutes * 60 {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        debug!(user_id = %user.id, late_by, status = %status, "Check-in classified");

        let record = new_record(
            &user,
            &badge,
            &department,
            now,
            AttendanceType::In,
            status,
            None,
            geo,
        );
        self.store
            .insert_attendance(&record)
            .await
            .map_err(|e| on_duplicate(e, AttendanceError::AlreadyCheckedIn))?;

        info!(user_id = %user.id, department = %department.name, status = %status, "Checked in");

        let message = match status {
            AttendanceStatus::Late => {
                format!(
                    "Check-in berhasil, tetapi kamu terlambat {} menit",
                    late_by / 60
                )
            }
            _ => "Check-in berhasil".to_string(),
        };
        Ok(ScanOutcome {
            message,
            data: record,
        })
    }

    pub async fn check_out(&self, req: CheckOutRequest) -> Result<ScanOutcome, AttendanceError> {
        let user_id = req.user_id.trim();
        let qr_value = req.qr_value.trim();
        if user_id.is_empty() || qr_value.is_empty() {
            return Err(AttendanceError::invalid("userId dan qrValue wajib diisi"));
        }
        let geo = geo_point(req.latitude, req.longitude)?;

        let user = self.find_user(user_id).await?;
        if !user.role.is_attendance_eligible() {
            return Err(AttendanceError::RoleNotAllowed);
        }
        let (badge, department) = self.authorize_scan(&user, qr_value).await?;

        let now = self.clock.now();
        let today = now.date_naive();
        if self
            .store
            .find_attendance(&user.id, today, AttendanceType::In)
            .await?
            .is_none()
        {
            return Err(AttendanceError::NotCheckedIn);
        }
        if self
            .store
            .find_attendance(&user.id, today, AttendanceType::Out)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        let local = now.time();
        let diff = seconds_since(department.end_time, local);
        let status = if diff < -self.thresholds.early_minutes * 60 {
            AttendanceStatus::EarlyOut
        } else if diff > self.thresholds.late_minutes * 60 {
            AttendanceStatus::Overtime
        } else {
            AttendanceStatus::Completed
        };

        let reason = req
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        if status == AttendanceStatus::EarlyOut && reason.is_none() {
            return Err(AttendanceError::ReasonRequired);
        }
        debug!(user_id = %user.id, diff, status = %status, "Check-out classified");

        let record = new_record(
            &user,
            &badge,
            &department,
            now,
            AttendanceType::Out,
            status,
            reason,
            geo,
        );
        self.store
            .insert_attendance(&record)
            .await
            .map_err(|e| on_duplicate(e, AttendanceError::AlreadyCheckedOut))?;

        info!(user_id = %user.id, department = %department.name, status = %status, "Checked out");

        let message = match status {
            AttendanceStatus::EarlyOut => {
                format!("Check-out lebih awal {} menit dari jadwal", -diff / 60)
            }
            AttendanceStatus::Overtime => {
                format!("Check-out berhasil, lembur {} menit", diff / 60)
            }
            _ => "Check-out berhasil".to_string(),
        };
        Ok(ScanOutcome {
            message,
            data: record,
        })
    }

    async fn find_user(&self, user_id: &str) -> Result<User, AttendanceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(AttendanceError::UserNotFound)
    }

    /// The badge must exist and belong to the user's own department.
    async fn authorize_scan(
        &self,
        user: &User,
        qr_value: &str,
    ) -> Result<(Badge, Department), AttendanceError> {
        let badge = self
            .directory
            .resolve_badge(qr_value)
            .await
            .map_err(|e| match e {
                AttendanceError::NotFound(_) => AttendanceError::InvalidCode,
                other => other,
            })?;

        if user.department_id.as_deref() != Some(badge.department_id.as_str()) {
            return Err(AttendanceError::DepartmentMismatch);
        }

        // shift times are read fresh on every scan
        let department = self.directory.resolve_department(&badge.department_id).await?;
        Ok((badge, department))
    }
}

/// Signed seconds from `from` to `to` on the same day. Thresholds are
/// compared in seconds so 16:54:30 counts as more than five minutes early.
fn seconds_since(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_seconds()
}

/// Only the per-day attendance key means "already scanned". Any other
/// constraint failure is unexpected.
fn on_duplicate(e: StoreError, conflict: AttendanceError) -> AttendanceError {
    match e {
        StoreError::Duplicate(key) if key == ATTENDANCE_DAY_KEY => conflict,
        StoreError::Duplicate(key) => AttendanceError::Internal(anyhow::anyhow!(
            "unexpected unique violation on {key} while recording attendance"
        )),
        other => other.into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn new_record(
    user: &User,
    badge: &Badge,
    department: &Department,
    now: DateTime<FixedOffset>,
    kind: AttendanceType,
    status: AttendanceStatus,
    reason: Option<String>,
    geo: Option<GeoPoint>,
) -> AttendanceRecord {
    let time = now.with_timezone(&Utc);
    AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        department_id: department.id.clone(),
        department_name: department.name.clone(),
        qr_value: badge.value.clone(),
        date: now.date_naive(),
        time,
        role: user.role,
        kind,
        status,
        reason,
        latitude: geo.map(|g| g.latitude),
        longitude: geo.map(|g| g.longitude),
        created_at: time,
    }
}
