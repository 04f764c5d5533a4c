//! Shared fixture: two departments, a handful of accounts and a frozen clock.

use std::{collections::HashMap, sync::Arc};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::{
    clock::FixedClock,
    directory::{DepartmentDirectory, NewDepartment},
    engine::{AttendanceEngine, Thresholds},
    report::ReportAggregator,
    users::UserAdmin,
};
use crate::{
    model::{department::Department, role::Role, user::User},
    store::{UserRepository, memory::MemoryStore},
};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub directory: Arc<DepartmentDirectory>,
    pub engine: AttendanceEngine,
    pub reports: ReportAggregator,
    pub users: UserAdmin,

    /// IT, 08:00 to 17:00
    pub it_department: String,
    pub it_badge: String,
    /// HR, 09:00 to 18:00
    pub hr_department: String,
    pub hr_badge: String,

    /// PEKERJA in IT
    pub budi: String,
    /// PEKERJA in IT
    pub andi: String,
    /// KAPROG in HR
    pub sari: String,
    pub admin: String,

    roles: HashMap<String, Role>,
}

impl Fixture {
    /// Clock frozen at `hh:mm` on `date`, UTC+7.
    pub async fn new(date: NaiveDate, hh: u32, mm: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(date, hh, mm));
        let directory = Arc::new(DepartmentDirectory::new(store.clone()));

        let it = directory
            .create(department("IT", "IT", "08:00", "17:00"))
            .await
            .unwrap();
        let hr = directory
            .create(department("HR", "HR", "09:00", "18:00"))
            .await
            .unwrap();

        let mut roles = HashMap::new();
        let (in_it, in_hr) = (Some(&it.department), Some(&hr.department));
        let budi = person(&store, &mut roles, "budi", Role::Pekerja, in_it, Some("Teknisi")).await;
        let andi = person(&store, &mut roles, "andi", Role::Pekerja, in_it, Some("Teknisi")).await;
        let sari = person(&store, &mut roles, "sari", Role::Kaprog, in_hr, None).await;
        let admin = person(&store, &mut roles, "admin", Role::Admin, None, None).await;

        let engine = AttendanceEngine::new(
            store.clone(),
            directory.clone(),
            clock.clone(),
            Thresholds::default(),
        );
        let reports = ReportAggregator::new(store.clone(), directory.clone(), clock.clone());
        let users = UserAdmin::new(store.clone(), directory.clone());

        Self {
            it_department: it.department.id.clone(),
            it_badge: it.badge.map(|b| b.value).unwrap(),
            hr_department: hr.department.id.clone(),
            hr_badge: hr.badge.map(|b| b.value).unwrap(),
            store,
            clock,
            directory,
            engine,
            reports,
            users,
            budi,
            andi,
            sari,
            admin,
            roles,
        }
    }

    /// Role string as a client would send it.
    pub fn role_of(&self, user_id: &str) -> String {
        self.roles
            .get(user_id)
            .map(|r| r.to_string())
            .unwrap_or_else(|| Role::Pekerja.to_string())
    }
}

async fn person(
    store: &MemoryStore,
    roles: &mut HashMap<String, Role>,
    username: &str,
    role: Role,
    department: Option<&Department>,
    position: Option<&str>,
) -> String {
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.into(),
        email: None,
        name: Some(format!("{}{}", username[..1].to_uppercase(), &username[1..])),
        password: "-".into(),
        role,
        department_id: department.map(|d| d.id.clone()),
        department_name: department.map(|d| d.name.clone()),
        position: position.map(str::to_string),
        is_protected: false,
        created_at: Utc::now(),
    };
    store.insert_user(&user).await.unwrap();
    roles.insert(user.id.clone(), role);
    user.id
}

fn department(name: &str, code: &str, start: &str, end: &str) -> NewDepartment {
    NewDepartment {
        name: name.into(),
        code: code.into(),
        start_time: start.into(),
        end_time: end.into(),
        latitude: None,
        longitude: None,
    }
}
