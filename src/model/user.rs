use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub department_id: Option<String>,
    /// Copy of the department name taken when the user was last saved.
    pub department_name: Option<String>,
    pub position: Option<String>,
    /// Bootstrap accounts that can never be deleted.
    pub is_protected: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}
