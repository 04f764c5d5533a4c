use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    Superadmin,
    Admin,
    Kaprog,
    Pekerja,
}

impl Role {
    /// Roles that scan badges to record attendance.
    pub fn is_attendance_eligible(&self) -> bool {
        matches!(self, Role::Kaprog | Role::Pekerja)
    }
}
