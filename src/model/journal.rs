use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A daily activity journal entry written by a student and reviewed by a
/// teacher or admin.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Journal {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Configured the staging web server")]
    pub activity: String,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<u64>,
    #[schema(example = "2026-01-05T09:00:00Z", format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}
