use std::{collections::HashMap, sync::Arc};

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AttendanceError,
    model::{attendance::GeoPoint, badge::Badge, department::Department},
    store::{Store, StoreError},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    #[schema(example = "IT")]
    pub name: String,
    #[schema(example = "IT")]
    pub code: String,
    #[schema(example = "08:00")]
    pub start_time: String,
    #[schema(example = "17:00")]
    pub end_time: String,
    /// Location of the physical scan point.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    #[schema(example = "09:00")]
    pub start_time: Option<String>,
    #[schema(example = "18:00")]
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentView {
    #[serde(flatten)]
    pub department: Department,
    pub badge: Option<Badge>,
}

/// Department and badge lookups plus their administration.
pub struct DepartmentDirectory {
    store: Arc<dyn Store>,
}

impl DepartmentDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn resolve_department(&self, id: &str) -> Result<Department, AttendanceError> {
        self.store
            .find_department(id)
            .await?
            .ok_or_else(|| AttendanceError::not_found("Department tidak ditemukan"))
    }

    pub async fn resolve_badge(&self, value: &str) -> Result<Badge, AttendanceError> {
        self.store
            .find_badge(value)
            .await?
            .ok_or_else(|| AttendanceError::not_found("Barcode tidak ditemukan"))
    }

    pub async fn list(&self) -> Result<Vec<DepartmentView>, AttendanceError> {
        let departments = self.store.list_departments().await?;
        let mut views = Vec::with_capacity(departments.len());
        for department in departments {
            let badge = self.store.find_badge_for_department(&department.id).await?;
            views.push(DepartmentView { department, badge });
        }
        Ok(views)
    }

    pub async fn get(&self, id: &str) -> Result<DepartmentView, AttendanceError> {
        let department = self.resolve_department(id).await?;
        let badge = self.store.find_badge_for_department(id).await?;
        Ok(DepartmentView { department, badge })
    }

    /// Creates the department and its badge.
    pub async fn create(&self, input: NewDepartment) -> Result<DepartmentView, AttendanceError> {
        let name = input.name.trim();
        let code = input.code.trim();
        if name.is_empty() || code.is_empty() {
            return Err(AttendanceError::invalid("Nama dan kode wajib diisi"));
        }
        let start_time = parse_shift_time(&input.start_time)?;
        let end_time = parse_shift_time(&input.end_time)?;
        check_window(start_time, end_time)?;
        let location = geo_point(input.latitude, input.longitude)?;

        let now = Utc::now();
        let department = Department {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            code: code.to_string(),
            start_time,
            end_time,
            created_at: now,
        };
        let badge = Badge {
            id: Uuid::new_v4().to_string(),
            value: badge_value(code),
            department_id: department.id.clone(),
            department_name: department.name.clone(),
            latitude: location.map(|g| g.latitude),
            longitude: location.map(|g| g.longitude),
            created_at: now,
        };

        self.store
            .insert_department(&department, &badge)
            .await
            .map_err(duplicate_department)?;

        info!(department_id = %department.id, badge = %badge.value, "Department created");
        Ok(DepartmentView {
            department,
            badge: Some(badge),
        })
    }

    pub async fn update(
        &self,
        id: &str,
        patch: DepartmentPatch,
    ) -> Result<Department, AttendanceError> {
        let mut department = self.resolve_department(id).await?;

        if let Some(name) = patch.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(AttendanceError::invalid("Nama department tidak boleh kosong"));
            }
            department.name = name.to_string();
        }
        if let Some(code) = patch.code.as_deref().map(str::trim) {
            if code.is_empty() {
                return Err(AttendanceError::invalid("Kode department tidak boleh kosong"));
            }
            department.code = code.to_string();
        }
        if let Some(start) = &patch.start_time {
            department.start_time = parse_shift_time(start)?;
        }
        if let Some(end) = &patch.end_time {
            department.end_time = parse_shift_time(end)?;
        }
        check_window(department.start_time, department.end_time)?;

        self.store
            .update_department(&department)
            .await
            .map_err(duplicate_department)?;

        info!(department_id = %department.id, "Department updated");
        Ok(department)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AttendanceError> {
        if !self.store.delete_department(id).await? {
            return Err(AttendanceError::not_found("Department tidak ditemukan"));
        }
        info!(department_id = %id, "Department deleted");
        Ok(())
    }

    /// Issues a fresh badge; the previous value stops working immediately.
    pub async fn regenerate_badge(&self, id: &str) -> Result<Badge, AttendanceError> {
        let department = self.resolve_department(id).await?;
        let previous = self.store.find_badge_for_department(id).await?;

        let badge = Badge {
            id: Uuid::new_v4().to_string(),
            value: badge_value(&department.code),
            department_id: department.id.clone(),
            department_name: department.name.clone(),
            latitude: previous.as_ref().and_then(|b| b.latitude),
            longitude: previous.as_ref().and_then(|b| b.longitude),
            created_at: Utc::now(),
        };
        self.store.replace_badge(&badge).await?;

        info!(department_id = %id, badge = %badge.value, "Badge regenerated");
        Ok(badge)
    }

    /// Current departments keyed by id, for read paths that resolve names.
    pub async fn snapshot(&self) -> Result<HashMap<String, Department>, AttendanceError> {
        Ok(self
            .store
            .list_departments()
            .await?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect())
    }
}

/// Display name for a department reference. The live directory wins; the
/// stored copy is only used when the department is gone.
pub fn department_name(
    departments: &HashMap<String, Department>,
    department_id: Option<&str>,
    stored: Option<&str>,
) -> Option<String> {
    if let Some(department) = department_id.and_then(|id| departments.get(id)) {
        return Some(department.name.clone());
    }
    if let Some(name) = stored {
        warn!(
            department_id = ?department_id,
            stored_name = %name,
            "Department missing from directory, using stored name"
        );
        return Some(name.to_string());
    }
    None
}

fn duplicate_department(e: StoreError) -> AttendanceError {
    match e {
        StoreError::Duplicate(_) => {
            AttendanceError::Conflict("Nama atau kode department sudah digunakan".into())
        }
        other => other.into(),
    }
}

/// Both coordinates or neither, each within its valid range.
pub fn geo_point(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, AttendanceError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(latitude), Some(longitude)) => {
            if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                return Err(AttendanceError::invalid("Koordinat lokasi tidak valid"));
            }
            Ok(Some(GeoPoint {
                latitude,
                longitude,
            }))
        }
        _ => Err(AttendanceError::invalid(
            "latitude dan longitude harus diisi bersamaan",
        )),
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_shift_time(value: &str) -> Result<NaiveTime, AttendanceError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AttendanceError::invalid(format!("Format jam tidak valid: {value}")))
}

fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), AttendanceError> {
    if start >= end {
        return Err(AttendanceError::invalid(
            "Jam mulai harus lebih awal dari jam selesai",
        ));
    }
    Ok(())
}

/// `<CODE>-<6 hex>`, e.g. `IT-a83f5b`.
fn badge_value(code: &str) -> String {
    let mut bytes = [0u8; 3];
    OsRng.fill_bytes(&mut bytes);
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{code}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn directory() -> DepartmentDirectory {
        DepartmentDirectory::new(Arc::new(MemoryStore::new()))
    }

    fn it_department() -> NewDepartment {
        NewDepartment {
            name: "IT".into(),
            code: "IT".into(),
            start_time: "08:00".into(),
            end_time: "17:00".into(),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn badge_values_carry_the_department_code() {
        let value = badge_value("IT");
        let (code, suffix) = value.split_once('-').unwrap();
        assert_eq!(code, "IT");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn shift_times_accept_minutes_and_seconds() {
        assert_eq!(
            parse_shift_time("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_shift_time("17:30:15").unwrap(),
            NaiveTime::from_hms_opt(17, 30, 15).unwrap()
        );
        assert!(parse_shift_time("8am").is_err());
    }

    #[actix_web::test]
    async fn create_generates_one_badge() {
        let directory = directory();
        let view = directory.create(it_department()).await.unwrap();
        let badge = view.badge.unwrap();

        let resolved = directory.resolve_badge(&badge.value).await.unwrap();
        assert_eq!(resolved.department_id, view.department.id);
        assert_eq!(resolved.department_name, "IT");
    }

    #[actix_web::test]
    async fn duplicate_name_or_code_is_a_conflict() {
        let directory = directory();
        directory.create(it_department()).await.unwrap();

        let err = directory.create(it_department()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(_)));
    }

    #[actix_web::test]
    async fn rejects_inverted_shift_window() {
        let mut input = it_department();
        input.start_time = "17:00".into();
        input.end_time = "08:00".into();

        let err = directory().create(input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidInput(_)));
    }

    #[actix_web::test]
    async fn scan_point_location_is_validated() {
        let directory = directory();
        for (latitude, longitude) in [
            (Some(-6.2), None),
            (Some(91.0), Some(106.8)),
            (Some(-6.2), Some(181.0)),
        ] {
            let mut input = it_department();
            input.latitude = latitude;
            input.longitude = longitude;
            let err = directory.create(input).await.unwrap_err();
            assert!(
                matches!(err, AttendanceError::InvalidInput(_)),
                "{latitude:?} {longitude:?}"
            );
        }

        let mut input = it_department();
        input.latitude = Some(-6.2);
        input.longitude = Some(106.8);
        let badge = directory.create(input).await.unwrap().badge.unwrap();
        assert_eq!(badge.latitude, Some(-6.2));
        assert_eq!(badge.longitude, Some(106.8));
    }

    #[actix_web::test]
    async fn regenerated_badge_replaces_the_old_one() {
        let directory = directory();
        let view = directory.create(it_department()).await.unwrap();
        let old = view.badge.unwrap();

        let new = directory.regenerate_badge(&view.department.id).await.unwrap();
        assert_ne!(old.value, new.value);
        assert!(directory.resolve_badge(&old.value).await.is_err());
        assert!(directory.resolve_badge(&new.value).await.is_ok());
    }

    #[actix_web::test]
    async fn rename_is_reflected_on_the_badge() {
        let directory = directory();
        let view = directory.create(it_department()).await.unwrap();
        let patch = DepartmentPatch {
            name: Some("Teknologi Informasi".into()),
            start_time: Some("09:00".into()),
            ..Default::default()
        };

        let updated = directory.update(&view.department.id, patch).await.unwrap();
        assert_eq!(updated.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());

        let badge = directory
            .resolve_badge(&view.badge.unwrap().value)
            .await
            .unwrap();
        assert_eq!(badge.department_name, "Teknologi Informasi");
    }

    #[actix_web::test]
    async fn delete_removes_the_badge() {
        let directory = directory();
        let view = directory.create(it_department()).await.unwrap();
        let value = view.badge.unwrap().value;

        directory.delete(&view.department.id).await.unwrap();
        assert!(directory.resolve_badge(&value).await.is_err());
        assert!(matches!(
            directory.delete(&view.department.id).await.unwrap_err(),
            AttendanceError::NotFound(_)
        ));
    }

    #[test]
    fn live_name_wins_over_stored_copy() {
        let mut departments = HashMap::new();
        departments.insert(
            "d1".to_string(),
            Department {
                id: "d1".into(),
                name: "Finance".into(),
                code: "FIN".into(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                created_at: Utc::now(),
            },
        );

        assert_eq!(
            department_name(&departments, Some("d1"), Some("Keuangan")).as_deref(),
            Some("Finance")
        );
        assert_eq!(
            department_name(&departments, Some("gone"), Some("Keuangan")).as_deref(),
            Some("Keuangan")
        );
        assert_eq!(department_name(&departments, None, None), None);
    }
}
