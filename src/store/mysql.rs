use std::str::FromStr;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, MySqlPool};

use super::{
    AttendanceRepository, BadgeRepository, DepartmentRepository, StoreError, StoreResult,
    UserRepository,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, AttendanceType},
    badge::Badge,
    department::Department,
    user::User,
};

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Unique-key violations become `Duplicate`, everything else is opaque.
fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(duplicate_key_name(db_err.message()));
        }
    }
    StoreError::Other(anyhow!(e))
}

/// MySQL reports "Duplicate entry 'x' for key 'table.key_name'".
fn duplicate_key_name(message: &str) -> String {
    message
        .rsplit_once("for key '")
        .map(|(_, key)| key.trim_end_matches('\''))
        .map(|key| key.rsplit('.').next().unwrap_or(key))
        .unwrap_or("unknown")
        .to_string()
}

fn parse<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    T::from_str(value)
        .map_err(|_| StoreError::Other(anyhow!("unexpected value {value:?} in column {column}")))
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: Option<String>,
    name: Option<String>,
    password: String,
    role: String,
    department_id: Option<String>,
    department_name: Option<String>,
    position: Option<String>,
    is_protected: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            role: parse("users.role", &row.role)?,
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
            password: row.password,
            department_id: row.department_id,
            department_name: row.department_name,
            position: row.position,
            is_protected: row.is_protected,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    id: String,
    name: String,
    code: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    created_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            code: row.code,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct BadgeRow {
    id: String,
    value: String,
    department_id: String,
    department_name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Badge {
            id: row.id,
            value: row.value,
            department_id: row.department_id,
            department_name: row.department_name,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    department_id: String,
    department_name: String,
    qr_value: String,
    date: NaiveDate,
    time: DateTime<Utc>,
    role: String,
    #[sqlx(rename = "type")]
    kind: String,
    status: String,
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(AttendanceRecord {
            role: parse("attendance.role", &row.role)?,
            kind: parse::<AttendanceType>("attendance.type", &row.kind)?,
            status: parse::<AttendanceStatus>("attendance.status", &row.status)?,
            id: row.id,
            user_id: row.user_id,
            department_id: row.department_id,
            department_name: row.department_name,
            qr_value: row.qr_value,
            date: row.date,
            time: row.time,
            reason: row.reason,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str = "id, username, email, name, password, role, department_id, \
     department_name, position, is_protected, created_at";

const ATTENDANCE_COLUMNS: &str = "id, user_id, department_id, department_name, qr_value, date, \
     time, role, type, status, reason, latitude, longitude, created_at";

#[async_trait]
impl UserRepository for MySqlStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        convert_all(rows)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, name, password, role, department_id,
                 department_name, position, is_protected, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.role.as_ref())
        .bind(&user.department_id)
        .bind(&user.department_name)
        .bind(&user.position)
        .bind(user.is_protected)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, name = ?, password = ?, role = ?,
                department_id = ?, department_name = ?, position = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.role.as_ref())
        .bind(&user.department_id)
        .bind(&user.department_name)
        .bind(&user.position)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DepartmentRepository for MySqlStore {
    async fn find_department(&self, id: &str) -> StoreResult<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, code, start_time, end_time, created_at FROM departments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(Department::from))
    }

    async fn list_departments(&self) -> StoreResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, code, start_time, end_time, created_at FROM departments ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn insert_department(&self, department: &Department, badge: &Badge) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query(
            r#"
            INSERT INTO departments (id, name, code, start_time, end_time, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(&department.code)
        .bind(department.start_time)
        .bind(department.end_time)
        .bind(department.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        insert_badge(&mut tx, badge).await?;

        tx.commit().await.map_err(map_err)
    }

    async fn update_department(&self, department: &Department) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query(
            r#"
            UPDATE departments
            SET name = ?, code = ?, start_time = ?, end_time = ?
            WHERE id = ?
            "#,
        )
        .bind(&department.name)
        .bind(&department.code)
        .bind(department.start_time)
        .bind(department.end_time)
        .bind(&department.id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        sqlx::query("UPDATE badges SET department_name = ? WHERE department_id = ?")
            .bind(&department.name)
            .bind(&department.id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        tx.commit().await.map_err(map_err)
    }

    async fn delete_department(&self, id: &str) -> StoreResult<bool> {
        // badges go with the department through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_badge(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    badge: &Badge,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO badges (id, value, department_id, department_name, latitude, longitude, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&badge.id)
    .bind(&badge.value)
    .bind(&badge.department_id)
    .bind(&badge.department_name)
    .bind(badge.latitude)
    .bind(badge.longitude)
    .bind(badge.created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_err)?;
    Ok(())
}

const BADGE_COLUMNS: &str =
    "id, value, department_id, department_name, latitude, longitude, created_at";

#[async_trait]
impl BadgeRepository for MySqlStore {
    async fn find_badge(&self, value: &str) -> StoreResult<Option<Badge>> {
        let sql = format!("SELECT {BADGE_COLUMNS} FROM badges WHERE value = ?");
        let row = sqlx::query_as::<_, BadgeRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Badge::from))
    }

    async fn find_badge_for_department(&self, department_id: &str) -> StoreResult<Option<Badge>> {
        let sql = format!("SELECT {BADGE_COLUMNS} FROM badges WHERE department_id = ?");
        let row = sqlx::query_as::<_, BadgeRow>(&sql)
            .bind(department_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(Badge::from))
    }

    async fn replace_badge(&self, badge: &Badge) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query("DELETE FROM badges WHERE department_id = ?")
            .bind(&badge.department_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        insert_badge(&mut tx, badge).await?;

        tx.commit().await.map_err(map_err)
    }
}

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn find_attendance(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: AttendanceType,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ? AND type = ?"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(date)
            .bind(kind.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance
                (id, user_id, department_id, department_name, qr_value, date, time,
                 role, type, status, reason, latitude, longitude, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.department_id)
        .bind(&record.department_name)
        .bind(&record.qr_value)
        .bind(record.date)
        .bind(record.time)
        .bind(record.role.as_ref())
        .bind(record.kind.as_ref())
        .bind(record.status.as_ref())
        .bind(&record.reason)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn list_attendance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE date BETWEEN ? AND ? \
             ORDER BY date DESC, time ASC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        convert_all(rows)
    }

    async fn list_attendance_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? ORDER BY date DESC, time ASC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        convert_all(rows)
    }

    async fn list_attendance_for_department(
        &self,
        department_id: &str,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE department_id = ? \
             ORDER BY date DESC, time DESC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        convert_all(rows)
    }
}
