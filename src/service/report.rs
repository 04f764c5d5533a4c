use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use strum_macros::{Display, EnumString};
use tracing::debug;
use utoipa::ToSchema;

use super::{
    clock::Clock,
    directory::{DepartmentDirectory, department_name},
};
use crate::{
    error::AttendanceError,
    model::{
        attendance::{AttendanceRecord, AttendanceStatus, AttendanceType},
        user::User,
    },
    store::Store,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RangeKind {
    Daily,
    Yesterday,
    Weekly,
    Monthly,
}

/// Inclusive calendar-day span, in organisation local time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportRange {
    #[schema(value_type = String, format = "date-time")]
    pub start: DateTime<FixedOffset>,
    #[schema(value_type = String, format = "date-time")]
    pub end: DateTime<FixedOffset>,
}

impl ReportRange {
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

/// Weeks start on Sunday.
pub fn resolve_range(
    kind: RangeKind,
    as_of: DateTime<FixedOffset>,
) -> Result<ReportRange, AttendanceError> {
    let today = as_of.date_naive();
    let (first, last) = match kind {
        RangeKind::Daily => (today, today),
        RangeKind::Yesterday => {
            let yesterday = today - Duration::days(1);
            (yesterday, yesterday)
        }
        RangeKind::Weekly => {
            let sunday = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
            (sunday, sunday + Duration::days(6))
        }
        RangeKind::Monthly => {
            let first = today.with_day(1);
            let next_month = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
            };
            match (first, next_month.and_then(|d| d.pred_opt())) {
                (Some(first), Some(last)) => (first, last),
                _ => return Err(AttendanceError::invalid("Tanggal di luar jangkauan")),
            }
        }
    };

    let offset = *as_of.offset();
    let at = |date: NaiveDate, time: Option<NaiveTime>| {
        time.and_then(|t| date.and_time(t).and_local_timezone(offset).single())
            .ok_or_else(|| AttendanceError::invalid("Tanggal di luar jangkauan"))
    };

    Ok(ReportRange {
        start: at(first, NaiveTime::from_hms_opt(0, 0, 0))?,
        end: at(last, NaiveTime::from_hms_milli_opt(23, 59, 59, 999))?,
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportEntry {
    pub user: UserSummary,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date-time")]
    pub time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DepartmentGroup {
    pub department: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone)]
pub struct DayGroup {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub departments: Vec<DepartmentGroup>,
}

impl DayGroup {
    pub fn department(&self, name: &str) -> Option<&[ReportEntry]> {
        self.departments
            .iter()
            .find(|g| g.department == name)
            .map(|g| g.entries.as_slice())
    }

    pub fn count(&self) -> usize {
        self.departments.iter().map(|g| g.entries.len()).sum()
    }
}

/// date → department → entries. Serialized as nested JSON objects that keep
/// the report ordering (newest day first, departments by name).
#[derive(Debug, Clone, Default)]
pub struct Grouped(pub Vec<DayGroup>);

impl Grouped {
    pub fn day(&self, date: &str) -> Option<&DayGroup> {
        self.0.iter().find(|d| d.date == date)
    }
}

struct Departments<'a>(&'a [DepartmentGroup]);

impl Serialize for Departments<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in self.0 {
            map.serialize_entry(&group.department, &group.entries)?;
        }
        map.end()
    }
}

impl Serialize for Grouped {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for day in &self.0 {
            map.serialize_entry(&day.date, &Departments(&day.departments))?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Report {
    pub range: ReportRange,
    pub total: usize,
    /// `{ "YYYY-MM-DD": { "<department>": [entry, ...] } }`
    #[schema(value_type = Object)]
    pub result: Grouped,
}

/// One calendar day of a user's attendance.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    /// Status of the latest leg of the day.
    pub status: AttendanceStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentAttendance {
    pub department: String,
    pub total: usize,
    pub data: Vec<AttendanceRecord>,
}

pub struct ReportAggregator {
    store: Arc<dyn Store>,
    directory: Arc<DepartmentDirectory>,
    clock: Arc<dyn Clock>,
}

impl ReportAggregator {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<DepartmentDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub async fn report(
        &self,
        kind: RangeKind,
        as_of: DateTime<FixedOffset>,
    ) -> Result<Report, AttendanceError> {
        let range = resolve_range(kind, as_of)?;
        let records = self
            .store
            .list_attendance_between(range.start_date(), range.end_date())
            .await?;
        debug!(
            kind = %kind,
            start = %range.start,
            end = %range.end,
            rows = records.len(),
            "Building report"
        );

        let departments = self.directory.snapshot().await?;
        let users: HashMap<String, User> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut rows: Vec<(String, ReportEntry, NaiveDate)> = records
            .into_iter()
            .map(|record| {
                let department = department_name(
                    &departments,
                    Some(record.department_id.as_str()),
                    Some(record.department_name.as_str()),
                )
                .unwrap_or_default();
                let user = match users.get(&record.user_id) {
                    Some(u) => UserSummary {
                        id: u.id.clone(),
                        name: u.display_name().to_string(),
                        username: Some(u.username.clone()),
                        position: u.position.clone(),
                    },
                    None => UserSummary {
                        id: record.user_id.clone(),
                        name: record.user_id.clone(),
                        username: None,
                        position: None,
                    },
                };
                let entry = ReportEntry {
                    user,
                    kind: record.kind,
                    status: record.status,
                    time: record.time,
                    reason: record.reason,
                };
                (department, entry, record.date)
            })
            .collect();

        rows.sort_by(|(dept_a, a, date_a), (dept_b, b, date_b)| {
            date_b
                .cmp(date_a)
                .then_with(|| dept_a.cmp(dept_b))
                .then_with(|| a.user.name.cmp(&b.user.name))
                .then_with(|| a.time.cmp(&b.time))
        });

        let total = rows.len();
        let mut grouped = Grouped::default();
        for (department, entry, date) in rows {
            let date = date.format("%Y-%m-%d").to_string();
            if grouped.0.last().map(|d| &d.date) != Some(&date) {
                grouped.0.push(DayGroup {
                    date,
                    departments: Vec::new(),
                });
            }
            let Some(day) = grouped.0.last_mut() else {
                continue;
            };
            match day.departments.last_mut() {
                Some(group) if group.department == department => group.entries.push(entry),
                _ => day.departments.push(DepartmentGroup {
                    department,
                    entries: vec![entry],
                }),
            }
        }

        Ok(Report {
            range,
            total,
            result: grouped,
        })
    }

    /// Days with at least one scan, newest first. Missing days are not filled in.
    pub async fn user_attendance(
        &self,
        user_id: &str,
    ) -> Result<Vec<DailySummary>, AttendanceError> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(AttendanceError::UserNotFound);
        }

        let mut records = self.store.list_attendance_for_user(user_id).await?;
        records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.time.cmp(&b.time)));

        let mut days: Vec<DailySummary> = Vec::new();
        for record in records {
            if days.last().map(|d| d.date) != Some(record.date) {
                days.push(DailySummary {
                    date: record.date,
                    check_in_time: None,
                    check_out_time: None,
                    status: record.status,
                });
            }
            let Some(day) = days.last_mut() else {
                continue;
            };
            match record.kind {
                AttendanceType::In => {
                    day.check_in_time = Some(record.time);
                    if day.check_out_time.is_none() {
                        day.status = record.status;
                    }
                }
                AttendanceType::Out => {
                    day.check_out_time = Some(record.time);
                    day.status = record.status;
                }
            }
        }
        Ok(days)
    }

    pub async fn department_attendance(
        &self,
        department_id: &str,
    ) -> Result<DepartmentAttendance, AttendanceError> {
        let department = self.directory.resolve_department(department_id).await?;

        let mut data = self.store.list_attendance_for_department(department_id).await?;
        data.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.time.cmp(&a.time)));
        for record in &mut data {
            record.department_name = department.name.clone();
        }

        Ok(DepartmentAttendance {
            department: department.name,
            total: data.len(),
            data,
        })
    }
}
