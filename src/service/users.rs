use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    directory::{DepartmentDirectory, department_name},
    policy::{Action, can_perform},
};
use crate::{
    auth::password::{hash_password, verify_password},
    error::AttendanceError,
    model::{role::Role, user::User},
    store::{Store, StoreError},
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[schema(example = "budi")]
    pub username: String,
    #[schema(example = "rahasia")]
    pub password: String,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Required for KAPROG and PEKERJA.
    pub department_id: Option<String>,
    /// Required for PEKERJA.
    pub position: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<String>,
    pub position: Option<String>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn hash(password: &str) -> Result<String, AttendanceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AttendanceError::invalid("Password minimal 6 karakter"));
    }
    hash_password(password)
        .map_err(|e| AttendanceError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

fn username_taken(e: StoreError) -> AttendanceError {
    match e {
        StoreError::Duplicate(_) => AttendanceError::Conflict("Username sudah digunakan".into()),
        other => other.into(),
    }
}

/// Account administration. Every mutation is checked against the policy
/// table using the caller's role and the role of the account touched.
pub struct UserAdmin {
    store: Arc<dyn Store>,
    directory: Arc<DepartmentDirectory>,
}

impl UserAdmin {
    pub fn new(store: Arc<dyn Store>, directory: Arc<DepartmentDirectory>) -> Self {
        Self { store, directory }
    }

    fn authorize(actor: Role, action: Action, target: Role) -> Result<(), AttendanceError> {
        if can_perform(actor, action, Some(target)) {
            Ok(())
        } else {
            Err(AttendanceError::forbidden(format!(
                "{actor} tidak boleh mengelola akun {target}"
            )))
        }
    }

    /// Checks role-dependent fields and fills in the department snapshot.
    async fn assign(&self, user: &mut User) -> Result<(), AttendanceError> {
        if user.role.is_attendance_eligible() && blank(&user.department_id) {
            return Err(AttendanceError::invalid(format!(
                "Departemen wajib diisi untuk {}",
                user.role
            )));
        }
        if user.role == Role::Pekerja && blank(&user.position) {
            return Err(AttendanceError::invalid("Posisi wajib diisi untuk PEKERJA"));
        }

        let department_id = user.department_id.take().filter(|d| !d.trim().is_empty());
        user.department_name = match &department_id {
            Some(id) => Some(self.directory.resolve_department(id).await?.name),
            None => None,
        };
        user.department_id = department_id;
        Ok(())
    }

    pub async fn list(&self, actor: Role) -> Result<Vec<User>, AttendanceError> {
        if !can_perform(actor, Action::ListUsers, None) {
            return Err(AttendanceError::forbidden("Tidak boleh melihat daftar user"));
        }

        let departments = self.directory.snapshot().await?;
        let mut users = self.store.list_users().await?;
        for user in &mut users {
            user.department_name = department_name(
                &departments,
                user.department_id.as_deref(),
                user.department_name.as_deref(),
            );
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub async fn create(&self, actor: Role, input: NewUser) -> Result<User, AttendanceError> {
        Self::authorize(actor, Action::CreateUser, input.role)?;

        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(AttendanceError::invalid("Username wajib diisi"));
        }
        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(AttendanceError::Conflict("Username sudah digunakan".into()));
        }

        let mut user = User {
            id: Uuid::new_v4().to_string(),
            username,
            email: input.email.filter(|v| !v.trim().is_empty()),
            name: input.name.filter(|v| !v.trim().is_empty()),
            password: String::new(),
            role: input.role,
            department_id: input.department_id,
            department_name: None,
            position: input.position.filter(|v| !v.trim().is_empty()),
            is_protected: false,
            created_at: Utc::now(),
        };
        self.assign(&mut user).await?;
        user.password = hash(&input.password)?;

        self.store.insert_user(&user).await.map_err(username_taken)?;
        info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: Role,
        id: &str,
        patch: UserPatch,
    ) -> Result<User, AttendanceError> {
        let mut user = self
            .store
            .find_user(id)
            .await?
            .ok_or(AttendanceError::UserNotFound)?;

        Self::authorize(actor, Action::UpdateUser, user.role)?;
        if let Some(role) = patch.role {
            if role != user.role && user.is_protected {
                return Err(AttendanceError::forbidden("Role akun ini tidak dapat diubah"));
            }
            Self::authorize(actor, Action::UpdateUser, role)?;
            user.role = role;
        }

        if let Some(name) = patch.name {
            user.name = Some(name).filter(|v| !v.trim().is_empty());
        }
        if let Some(email) = patch.email {
            user.email = Some(email).filter(|v| !v.trim().is_empty());
        }
        if let Some(position) = patch.position {
            user.position = Some(position).filter(|v| !v.trim().is_empty());
        }
        if patch.department_id.is_some() {
            user.department_id = patch.department_id;
        }
        self.assign(&mut user).await?;
        if let Some(password) = patch.password {
            user.password = hash(&password)?;
        }

        self.store.update_user(&user).await?;
        info!(user_id = %user.id, role = %user.role, "User updated");
        Ok(user)
    }

    pub async fn delete(&self, actor: Role, id: &str) -> Result<(), AttendanceError> {
        let user = self
            .store
            .find_user(id)
            .await?
            .ok_or(AttendanceError::UserNotFound)?;

        if user.is_protected {
            warn!(user_id = %user.id, "Refused to delete protected account");
            return Err(AttendanceError::forbidden("Akun ini tidak dapat dihapus"));
        }
        Self::authorize(actor, Action::DeleteUser, user.role)?;

        self.store.delete_user(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Creates the protected superadmin when it does not exist yet.
    /// Returns whether an account was created.
    pub async fn ensure_superadmin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AttendanceError> {
        if self.store.find_user_by_username(username).await?.is_some() {
            debug!(username, "Superadmin already present");
            return Ok(false);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: None,
            name: Some("Super Admin".into()),
            password: hash(password)?,
            role: Role::Superadmin,
            department_id: None,
            department_name: None,
            position: None,
            is_protected: true,
            created_at: Utc::now(),
        };

        match self.store.insert_user(&user).await {
            Ok(()) => {
                info!(username, "Superadmin created");
                Ok(true)
            }
            // another instance won the race
            Err(StoreError::Duplicate(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Same message for an unknown user and a wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, AttendanceError> {
        let invalid = || AttendanceError::Unauthorized("Username atau password salah".into());

        let Some(user) = self.store.find_user_by_username(username.trim()).await? else {
            debug!("Login rejected: unknown username");
            return Err(invalid());
        };
        if let Err(e) = verify_password(password, &user.password) {
            debug!(user_id = %user.id, error = %e, "Login rejected: password mismatch");
            return Err(invalid());
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn pekerja(f: &Fixture, username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password: "rahasia".into(),
            role: Role::Pekerja,
            name: Some("Dewi".into()),
            email: None,
            department_id: Some(f.it_department.clone()),
            position: Some("Teknisi".into()),
        }
    }

    #[actix_web::test]
    async fn admin_creates_workers_with_hashed_passwords() {
        let f = Fixture::new(monday(), 8, 0).await;
        let user = f.users.create(Role::Admin, pekerja(&f, "dewi")).await.unwrap();

        assert_eq!(user.department_name.as_deref(), Some("IT"));
        assert_ne!(user.password, "rahasia");
        assert!(verify_password("rahasia", &user.password).is_ok());

        let logged_in = f.users.authenticate("dewi", "rahasia").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[actix_web::test]
    async fn role_dependent_fields_are_required() {
        let f = Fixture::new(monday(), 8, 0).await;

        let mut input = pekerja(&f, "dewi");
        input.position = None;
        let err = f.users.create(Role::Admin, input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidInput(_)));

        let mut input = pekerja(&f, "dewi");
        input.role = Role::Kaprog;
        input.department_id = None;
        let err = f.users.create(Role::Admin, input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidInput(_)));

        let mut input = pekerja(&f, "dewi");
        input.department_id = Some("missing".into());
        let err = f.users.create(Role::Admin, input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound(_)));

        let mut input = pekerja(&f, "dewi");
        input.password = "123".into();
        let err = f.users.create(Role::Admin, input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidInput(_)));
    }

    #[actix_web::test]
    async fn duplicate_username_is_a_conflict() {
        let f = Fixture::new(monday(), 8, 0).await;
        let err = f.users.create(Role::Superadmin, pekerja(&f, "budi")).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn admin_cannot_touch_admin_accounts() {
        let f = Fixture::new(monday(), 8, 0).await;

        let mut input = pekerja(&f, "boss");
        input.role = Role::Admin;
        let err = f.users.create(Role::Admin, input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden(_)));

        let err = f.users.delete(Role::Admin, &f.admin).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden(_)));

        // nor promote a worker into one
        let patch = UserPatch {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let err = f.users.update(Role::Admin, &f.budi, patch).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden(_)));

        let err = f.users.list(Role::Pekerja).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden(_)));
    }

    #[actix_web::test]
    async fn update_moves_a_worker_between_departments() {
        let f = Fixture::new(monday(), 8, 0).await;
        let patch = UserPatch {
            department_id: Some(f.hr_department.clone()),
            ..Default::default()
        };
        let user = f.users.update(Role::Admin, &f.budi, patch).await.unwrap();
        assert_eq!(user.department_name.as_deref(), Some("HR"));

        let err = f.users.update(Role::Admin, "nobody", UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::UserNotFound));
    }

    #[actix_web::test]
    async fn bootstrap_superadmin_is_created_once_and_protected() {
        let f = Fixture::new(monday(), 8, 0).await;
        assert!(f.users.ensure_superadmin("root", "rahasia").await.unwrap());
        assert!(!f.users.ensure_superadmin("root", "rahasia").await.unwrap());

        let root = f.users.authenticate("root", "rahasia").await.unwrap();
        assert!(root.is_protected);
        assert_eq!(root.role, Role::Superadmin);

        let err = f.users.delete(Role::Superadmin, &root.id).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Forbidden(_)));

        f.users.delete(Role::Superadmin, &f.admin).await.unwrap();
        let err = f.users.delete(Role::Superadmin, &f.admin).await.unwrap_err();
        assert!(matches!(err, AttendanceError::UserNotFound));
    }

    #[actix_web::test]
    async fn wrong_credentials_share_one_message() {
        let f = Fixture::new(monday(), 8, 0).await;
        f.users.create(Role::Admin, pekerja(&f, "dewi")).await.unwrap();

        let unknown = f.users.authenticate("ghost", "rahasia").await.unwrap_err();
        let wrong = f.users.authenticate("dewi", "salah!!").await.unwrap_err();
        assert!(matches!(unknown, AttendanceError::Unauthorized(_)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[actix_web::test]
    async fn listing_resolves_department_names_live() {
        let f = Fixture::new(monday(), 8, 0).await;
        let patch = crate::service::directory::DepartmentPatch {
            name: Some("Teknologi".into()),
            ..Default::default()
        };
        f.directory.update(&f.it_department, patch).await.unwrap();

        let users = f.users.list(Role::Admin).await.unwrap();
        let budi = users.iter().find(|u| u.id == f.budi).unwrap();
        assert_eq!(budi.department_name.as_deref(), Some("Teknologi"));
    }
}
