use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::utils::db_utils::{build_update_sql, execute_update, page_offset};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by role id (1=admin, 2=teacher, 3=student)
    pub role_id: Option<u8>,
    pub placement_id: Option<u64>,
    /// Search by username or full name
    pub search: Option<String>,
}

/// Account view without the password hash.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    pub id: u64,
    #[schema(example = "siti.rahma")]
    pub username: String,
    #[schema(example = "Siti Rahma")]
    pub full_name: String,
    #[schema(example = 3)]
    pub role_id: u8,
    pub placement_id: Option<u64>,
    #[schema(example = "PT Maju Jaya")]
    pub placement_name: Option<String>,
    pub is_active: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
}

const UPDATABLE_COLUMNS: &[&str] = &["full_name", "role_id", "placement_id", "is_active"];

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    U8(u8),
    Str(&'a str),
}

/// List users (Admin/Teacher)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin_or_teacher()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = page_offset(page, per_page);

    let like;
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(role_id) = query.role_id {
        where_sql.push_str(" AND u.role_id = ?");
        args.push(FilterValue::U8(role_id));
    }

    if let Some(placement_id) = query.placement_id {
        where_sql.push_str(" AND u.placement_id = ?");
        args.push(FilterValue::U64(placement_id));
    }

    if let Some(search) = &query.search {
        where_sql.push_str(" AND (u.username LIKE ? OR u.full_name LIKE ?)");
        like = format!("%{}%", search);
        args.push(FilterValue::Str(&like));
        args.push(FilterValue::Str(&like));
    }

    let count_sql = format!("SELECT COUNT(*) FROM users u{}", where_sql);
    debug!(sql = %count_sql, "Counting users");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::U8(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count users");
        ApiError::Internal
    })?;

    let data_sql = format!(
        r#"
        SELECT u.id, u.username, u.full_name, u.role_id, u.placement_id,
               p.name AS placement_name, u.is_active
        FROM users u
        LEFT JOIN placements p ON p.id = u.placement_id
        {}
        ORDER BY u.full_name ASC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, UserResponse>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::U8(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
        };
    }

    let users = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch users");
            ApiError::Internal
        })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

/// Get user by ID (Admin/Teacher, or self)
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    // Students may only look at their own account
    if auth.is_student() && auth.user_id != user_id {
        return Err(ApiError::PermissionDenied("Admin/Teacher only".into()));
    }

    let user = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT u.id, u.username, u.full_name, u.role_id, u.placement_id,
               p.name AS placement_name, u.is_active
        FROM users u
        LEFT JOIN placements p ON p.id = u.placement_id
        WHERE u.id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch user");
        ApiError::Internal
    })?;

    match user {
        Some(u) => Ok(HttpResponse::Ok().json(u)),
        None => Err(ApiError::NotFound("User")),
    }
}

/// Update user (Admin)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let update = build_update_sql("users", &body, UPDATABLE_COLUMNS, "id", user_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to update user");
        ApiError::Internal
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully"
    })))
}

/// Deactivate user (Admin)
///
/// Accounts are deactivated rather than deleted so attendance and journal
/// history keeps its author.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn deactivate_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to deactivate user");
            ApiError::Internal
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User deactivated"
    })))
}
