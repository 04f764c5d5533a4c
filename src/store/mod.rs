//! Persistence port. Services receive an `Arc<dyn Store>` and never touch a
//! database client directly.

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceType},
    badge::Badge,
    department::Department,
    user::User,
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Unique key on attendance (user_id, date, type).
pub const ATTENDANCE_DAY_KEY: &str = "uq_attendance_user_date_type";

#[derive(Debug, Display)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the constraint name.
    #[display(fmt = "duplicate key: {}", _0)]
    Duplicate(String),
    #[display(fmt = "{}", _0)]
    Other(anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn delete_user(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_department(&self, id: &str) -> StoreResult<Option<Department>>;
    async fn list_departments(&self) -> StoreResult<Vec<Department>>;
    /// Inserts the department together with its badge in one transaction.
    async fn insert_department(&self, department: &Department, badge: &Badge) -> StoreResult<()>;
    /// Also refreshes the department name copied onto its badge.
    async fn update_department(&self, department: &Department) -> StoreResult<()>;
    /// Removes the department and its badge.
    async fn delete_department(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait BadgeRepository: Send + Sync {
    async fn find_badge(&self, value: &str) -> StoreResult<Option<Badge>>;
    async fn find_badge_for_department(&self, department_id: &str) -> StoreResult<Option<Badge>>;
    /// Replaces the department's active badge.
    async fn replace_badge(&self, badge: &Badge) -> StoreResult<()>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_attendance(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: AttendanceType,
    ) -> StoreResult<Option<AttendanceRecord>>;
    /// Must fail with `StoreError::Duplicate` when a record with the same
    /// (user_id, date, type) exists.
    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()>;
    /// Records with `start <= date <= end`, in no particular order.
    async fn list_attendance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>>;
    async fn list_attendance_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendanceRecord>>;
    async fn list_attendance_for_department(
        &self,
        department_id: &str,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}

pub trait Store:
    UserRepository + DepartmentRepository + BadgeRepository + AttendanceRepository
{
}

impl<T> Store for T where
    T: UserRepository + DepartmentRepository + BadgeRepository + AttendanceRepository
{
}
