use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Scannable code bound to exactly one department.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    #[schema(example = "IT-a83f5b")]
    pub value: String,
    pub department_id: String,
    pub department_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
