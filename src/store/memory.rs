//! In-memory store used by tests. Enforces the same unique keys as the
//! MySQL schema so duplicate handling can be exercised without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    ATTENDANCE_DAY_KEY, AttendanceRepository, BadgeRepository, DepartmentRepository, StoreError,
    StoreResult, UserRepository,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceType},
    badge::Badge,
    department::Department,
    user::User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    departments: Vec<Department>,
    badges: Vec<Badge>,
    attendance: Vec<AttendanceRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().expect("memory store poisoned");
        f(&mut tables)
    }

    pub fn attendance_count(&self) -> usize {
        self.with(|t| t.attendance.len())
    }
}

fn duplicate(key: &str) -> StoreError {
    StoreError::Duplicate(key.to_string())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|t| t.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|t| t.users.iter().find(|u| u.username == username).cloned()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.with(|t| t.users.clone()))
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.with(|t| {
            if t.users.iter().any(|u| u.username == user.username) {
                return Err(duplicate("uq_users_username"));
            }
            t.users.push(user.clone());
            Ok(())
        })
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.with(|t| {
            if t.users.iter().any(|u| u.username == user.username && u.id != user.id) {
                return Err(duplicate("uq_users_username"));
            }
            if let Some(existing) = t.users.iter_mut().find(|u| u.id == user.id) {
                *existing = user.clone();
            }
            Ok(())
        })
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        Ok(self.with(|t| {
            let before = t.users.len();
            t.users.retain(|u| u.id != id);
            t.attendance.retain(|a| a.user_id != id);
            t.users.len() != before
        }))
    }
}

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn find_department(&self, id: &str) -> StoreResult<Option<Department>> {
        Ok(self.with(|t| t.departments.iter().find(|d| d.id == id).cloned()))
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let mut departments = self.with(|t| t.departments.clone());
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn insert_department(&self, department: &Department, badge: &Badge) -> StoreResult<()> {
        self.with(|t| {
            if t.departments.iter().any(|d| d.name == department.name) {
                return Err(duplicate("uq_departments_name"));
            }
            if t.departments.iter().any(|d| d.code == department.code) {
                return Err(duplicate("uq_departments_code"));
            }
            if t.badges.iter().any(|b| b.value == badge.value) {
                return Err(duplicate("uq_badges_value"));
            }
            t.departments.push(department.clone());
            t.badges.push(badge.clone());
            Ok(())
        })
    }

    async fn update_department(&self, department: &Department) -> StoreResult<()> {
        self.with(|t| {
            let others = t.departments.iter().filter(|d| d.id != department.id);
            for other in others {
                if other.name == department.name {
                    return Err(duplicate("uq_departments_name"));
                }
                if other.code == department.code {
                    return Err(duplicate("uq_departments_code"));
                }
            }
            if let Some(existing) = t.departments.iter_mut().find(|d| d.id == department.id) {
                *existing = department.clone();
            }
            for badge in t.badges.iter_mut().filter(|b| b.department_id == department.id) {
                badge.department_name = department.name.clone();
            }
            Ok(())
        })
    }

    async fn delete_department(&self, id: &str) -> StoreResult<bool> {
        Ok(self.with(|t| {
            let before = t.departments.len();
            t.departments.retain(|d| d.id != id);
            t.badges.retain(|b| b.department_id != id);
            for user in t.users.iter_mut().filter(|u| u.department_id.as_deref() == Some(id)) {
                user.department_id = None;
            }
            t.departments.len() != before
        }))
    }
}

#[async_trait]
impl BadgeRepository for MemoryStore {
    async fn find_badge(&self, value: &str) -> StoreResult<Option<Badge>> {
        Ok(self.with(|t| t.badges.iter().find(|b| b.value == value).cloned()))
    }

    async fn find_badge_for_department(&self, department_id: &str) -> StoreResult<Option<Badge>> {
        Ok(self.with(|t| {
            t.badges
                .iter()
                .find(|b| b.department_id == department_id)
                .cloned()
        }))
    }

    async fn replace_badge(&self, badge: &Badge) -> StoreResult<()> {
        self.with(|t| {
            let taken = t
                .badges
                .iter()
                .any(|b| b.value == badge.value && b.department_id != badge.department_id);
            if taken {
                return Err(duplicate("uq_badges_value"));
            }
            t.badges.retain(|b| b.department_id != badge.department_id);
            t.badges.push(badge.clone());
            Ok(())
        })
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn find_attendance(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: AttendanceType,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.with(|t| {
            t.attendance
                .iter()
                .find(|a| a.user_id == user_id && a.date == date && a.kind == kind)
                .cloned()
        }))
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        self.with(|t| {
            let clash = t.attendance.iter().any(|a| {
                a.user_id == record.user_id && a.date == record.date && a.kind == record.kind
            });
            if clash {
                return Err(duplicate(ATTENDANCE_DAY_KEY));
            }
            t.attendance.push(record.clone());
            Ok(())
        })
    }

    async fn list_attendance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self.with(|t| {
            t.attendance
                .iter()
                .filter(|a| a.date >= start && a.date <= end)
                .cloned()
                .collect()
        }))
    }

    async fn list_attendance_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self.with(|t| {
            t.attendance
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_attendance_for_department(
        &self,
        department_id: &str,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self.with(|t| {
            t.attendance
                .iter()
                .filter(|a| a.department_id == department_id)
                .cloned()
                .collect()
        }))
    }
}
