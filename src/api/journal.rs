use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{ApiError, is_duplicate_key};
use crate::model::journal::Journal;
use crate::utils::clock::local_now;
use crate::utils::db_utils::page_offset;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

const MAX_ACTIVITY_LEN: usize = 2000;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    fn as_str(&self) -> &str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateJournal {
    /// Journal date; defaults to the current day when omitted
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "Configured the staging web server and documented the steps")]
    pub activity: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewJournal {
    #[schema(example = "approved")]
    pub decision: ReviewDecision,
    #[schema(example = "Good detail, keep it up")]
    pub comment: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct JournalFilter {
    /// Filter by student (ignored for student callers)
    pub user_id: Option<u64>,
    /// Filter by review status
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct JournalListResponse {
    pub data: Vec<Journal>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 23)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Date(NaiveDate),
    Str(&'a str),
}

/* =========================
Submit a journal entry
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/journals",
    request_body = CreateJournal,
    responses(
        (status = 201, description = "Journal entry submitted", body = Journal),
        (status = 400, description = "Duplicate entry or invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Journal"
)]
pub async fn create_journal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateJournal>,
) -> Result<HttpResponse, ApiError> {
    auth.require_student()?;

    let activity = payload.activity.trim();
    if activity.is_empty() {
        return Err(ApiError::validation("activity", "Activity must not be empty"));
    }
    if activity.chars().count() > MAX_ACTIVITY_LEN {
        return Err(ApiError::validation("activity", "Activity must be at most 2000 characters"));
    }

    let date = payload
        .date
        .unwrap_or_else(|| local_now(config.tz_offset_minutes).date());

    let result = sqlx::query(
        r#"
        INSERT INTO journals (user_id, date, activity)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(date)
    .bind(activity)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        if is_duplicate_key(&e) {
            return Err(ApiError::validation("date", "A journal entry already exists for this date"));
        }
        error!(error = %e, user_id = auth.user_id, "Failed to create journal entry");
        return Err(ApiError::Internal);
    }

    let journal = fetch_journal_by_date(pool.get_ref(), auth.user_id, date)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Created().json(journal))
}

async fn fetch_journal_by_date(
    pool: &MySqlPool,
    user_id: u64,
    date: NaiveDate,
) -> Result<Option<Journal>, sqlx::Error> {
    sqlx::query_as::<_, Journal>(
        r#"
        SELECT id, user_id, date, activity, status, review_comment, reviewed_by, created_at
        FROM journals
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/* =========================
Review a journal entry (Admin/Teacher)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/journals/{journal_id}/review",
    params(
        ("journal_id" = u64, Path, description = "ID of the journal entry to review")
    ),
    request_body = ReviewJournal,
    responses(
        (status = 200, description = "Journal reviewed", body = Object, example = json!({
            "message": "Journal reviewed",
            "status": "approved"
        })),
        (status = 400, description = "Journal not found or already reviewed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Journal"
)]
pub async fn review_journal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewJournal>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin_or_teacher()?;

    let journal_id = path.into_inner();

    if let Some(comment) = &payload.comment {
        if comment.chars().count() > 500 {
            return Err(ApiError::validation("comment", "Comment must be at most 500 characters"));
        }
    }

    let result = sqlx::query(
        r#"
        UPDATE journals
        SET status = ?, review_comment = ?, reviewed_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(payload.decision.as_str())
    .bind(&payload.comment)
    .bind(auth.user_id)
    .bind(journal_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, journal_id, "Journal review failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::validation("journal_id", "Journal not found or already reviewed"));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Journal reviewed",
        "status": payload.decision.as_str()
    })))
}

/* =========================
Get one journal entry
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/journals/{journal_id}",
    params(
        ("journal_id" = u64, Path, description = "ID of the journal entry to fetch")
    ),
    responses(
        (status = 200, description = "Journal entry found", body = Journal),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Journal entry not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Journal"
)]
pub async fn get_journal(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let journal_id = path.into_inner();

    let journal = sqlx::query_as::<_, Journal>(
        r#"
        SELECT id, user_id, date, activity, status, review_comment, reviewed_by, created_at
        FROM journals
        WHERE id = ?
        "#,
    )
    .bind(journal_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, journal_id, "Failed to fetch journal entry");
        ApiError::Internal
    })?;

    match journal {
        Some(j) if !auth.is_student() || j.user_id == auth.user_id => {
            Ok(HttpResponse::Ok().json(j))
        }
        // Hide other students' entries rather than confirming they exist
        _ => Err(ApiError::NotFound("Journal entry")),
    }
}

/* =========================
List journal entries
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/journals",
    params(JournalFilter),
    responses(
        (status = 200, description = "Paginated journal list", body = JournalListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Journal"
)]
pub async fn journal_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JournalFilter>,
) -> Result<HttpResponse, ApiError> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = page_offset(page, per_page);

    // Students only see their own entries
    let user_filter = if auth.is_student() {
        Some(auth.user_id)
    } else {
        query.user_id
    };

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = user_filter {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    if let Some(start) = query.start_date {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(start));
    }

    if let Some(end) = query.end_date {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(end));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM journals{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Date(d) => count_q.bind(*d),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count journal entries");
        ApiError::Internal
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, user_id, date, activity, status, review_comment, reviewed_by, created_at
        FROM journals
        {}
        ORDER BY date DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Journal>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Date(d) => data_q.bind(*d),
            FilterValue::Str(s) => data_q.bind(*s),
        };
    }

    let journals = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch journal list");
            ApiError::Internal
        })?;

    Ok(HttpResponse::Ok().json(JournalListResponse {
        data: journals,
        page,
        per_page,
        total,
    }))
}
