use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::placement::Placement;
use crate::utils::db_utils::{build_update_sql, execute_update, page_offset};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreatePlacement {
    #[schema(example = "PT Maju Jaya")]
    pub name: String,
    #[schema(example = "Jl. Sudirman No. 1, Jakarta")]
    pub address: String,
    #[schema(example = "Pak Budi")]
    pub supervisor_name: Option<String>,
    #[schema(example = "+628123456789")]
    pub supervisor_phone: Option<String>,
    #[schema(example = 5)]
    pub quota: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PlacementQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Search by name or address
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PlacementListResponse {
    pub data: Vec<Placement>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 8)]
    pub total: i64,
}

const UPDATABLE_COLUMNS: &[&str] = &[
    "name",
    "address",
    "supervisor_name",
    "supervisor_phone",
    "quota",
];

/// Create placement (Admin/Teacher)
#[utoipa::path(
    post,
    path = "/api/v1/placements",
    request_body = CreatePlacement,
    responses(
        (status = 201, description = "Placement created successfully", body = Object, example = json!({
            "message": "Placement created successfully"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Placement"
)]
pub async fn create_placement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePlacement>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin_or_teacher()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name", "Name must not be empty"));
    }

    sqlx::query(
        r#"
        INSERT INTO placements (name, address, supervisor_name, supervisor_phone, quota)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.address.trim())
    .bind(&payload.supervisor_name)
    .bind(&payload.supervisor_phone)
    .bind(payload.quota.unwrap_or(0))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create placement");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Placement created successfully"
    })))
}

/// List placements
#[utoipa::path(
    get,
    path = "/api/v1/placements",
    params(PlacementQuery),
    responses(
        (status = 200, description = "Paginated placement list", body = PlacementListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Placement"
)]
pub async fn list_placements(
    pool: web::Data<MySqlPool>,
    query: web::Query<PlacementQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = page_offset(page, per_page);

    let mut where_sql = String::new();
    let mut like = None;

    if let Some(search) = &query.search {
        where_sql.push_str(" WHERE (name LIKE ? OR address LIKE ?)");
        like = Some(format!("%{}%", search));
    }

    let count_sql = format!("SELECT COUNT(*) FROM placements{}", where_sql);
    debug!(sql = %count_sql, "Counting placements");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(like) = &like {
        count_q = count_q.bind(like).bind(like);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count placements");
        ApiError::Internal
    })?;

    let data_sql = format!(
        "SELECT id, name, address, supervisor_name, supervisor_phone, quota FROM placements{} ORDER BY name ASC LIMIT ? OFFSET ?",
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Placement>(&data_sql);
    if let Some(like) = &like {
        data_q = data_q.bind(like).bind(like);
    }

    let placements = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch placements");
            ApiError::Internal
        })?;

    Ok(HttpResponse::Ok().json(PlacementListResponse {
        data: placements,
        page,
        per_page,
        total,
    }))
}

/// Get placement by ID
#[utoipa::path(
    get,
    path = "/api/v1/placements/{placement_id}",
    params(
        ("placement_id" = u64, Path, description = "Placement ID")
    ),
    responses(
        (status = 200, description = "Placement found", body = Placement),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Placement not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Placement"
)]
pub async fn get_placement(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let placement_id = path.into_inner();

    let placement = sqlx::query_as::<_, Placement>(
        r#"
        SELECT id, name, address, supervisor_name, supervisor_phone, quota
        FROM placements
        WHERE id = ?
        "#,
    )
    .bind(placement_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, placement_id, "Failed to fetch placement");
        ApiError::Internal
    })?;

    match placement {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Err(ApiError::NotFound("Placement")),
    }
}

/// Update placement (Admin/Teacher)
#[utoipa::path(
    put,
    path = "/api/v1/placements/{placement_id}",
    params(
        ("placement_id" = u64, Path, description = "Placement ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Placement updated successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Placement not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Placement"
)]
pub async fn update_placement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_teacher()?;

    let placement_id = path.into_inner();

    let update = build_update_sql("placements", &body, UPDATABLE_COLUMNS, "id", placement_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, placement_id, "Failed to update placement");
            ApiError::Internal
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Placement not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Placement updated successfully"
    })))
}

/// Delete placement (Admin)
#[utoipa::path(
    delete,
    path = "/api/v1/placements/{placement_id}",
    params(
        ("placement_id" = u64, Path, description = "Placement ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 400, description = "Placement still referenced by users"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Placement not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Placement"
)]
pub async fn delete_placement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let placement_id = path.into_inner();

    let result = sqlx::query("DELETE FROM placements WHERE id = ?")
        .bind(placement_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Err(ApiError::NotFound("Placement"));
            }
            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            // FK violation: students still assigned here
            if crate::error::is_duplicate_key(&e) {
                return Err(ApiError::validation(
                    "placement_id",
                    "Placement is still referenced by users",
                ));
            }
            error!(error = %e, placement_id, "Failed to delete placement");
            Err(ApiError::Internal)
        }
    }
}
