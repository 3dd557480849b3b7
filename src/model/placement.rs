use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An internship placement location.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Placement {
    pub id: u64,
    #[schema(example = "PT Maju Jaya")]
    pub name: String,
    #[schema(example = "Jl. Sudirman No. 1, Jakarta")]
    pub address: String,
    pub supervisor_name: Option<String>,
    pub supervisor_phone: Option<String>,
    #[schema(example = 5)]
    pub quota: u32,
}
