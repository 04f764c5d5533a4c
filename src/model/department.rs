use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[schema(example = "6f0c1a52-6a3c-4a7e-9d43-0f3c2f7d1b21")]
    pub id: String,
    #[schema(example = "IT")]
    pub name: String,
    #[schema(example = "IT")]
    pub code: String,
    /// Shift start, organisation local time.
    #[schema(example = "08:00:00", value_type = String)]
    pub start_time: NaiveTime,
    /// Shift end, organisation local time.
    #[schema(example = "17:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
