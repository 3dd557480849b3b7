use crate::api::attendance::{
    AttendanceListResponse, AttendanceRow, CheckInReq, CheckOutReq, HistoryQuery,
    ManualAttendanceReq, ResolvedSettings, StatsQuery, StatsResponse, StatusStat, TodayResponse,
};
use crate::api::journal::{CreateJournal, JournalFilter, JournalListResponse, ReviewJournal};
use crate::api::placement::{CreatePlacement, PlacementListResponse, PlacementQuery};
use crate::api::settings::UpdateSettingsReq;
use crate::api::user::{UserListResponse, UserQuery, UserResponse};
use crate::model::attendance::AttendanceStatus;
use crate::model::journal::Journal;
use crate::model::placement::Placement;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PKL Management API",
        version = "1.0.0",
        description = r#"
## PKL (Internship) Management System

This API powers a student internship (PKL) management system for schools.

### Key Features
- **Attendance**
  - Daily check-in / check-out with automatic present/late determination
  - Administrative manual entries (absent, excused, sick)
  - Paginated history and per-status statistics
- **Activity Journals**
  - Daily student journals with a teacher review workflow
- **Placements**
  - Manage internship placement locations
- **Accounts**
  - Admin, teacher and student accounts with role-based access

### Security
Endpoints are protected with **JWT Bearer authentication**. Mutating
operations are restricted by role (admin, teacher, student).

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::stats,
        crate::api::attendance::manual_entry,

        crate::api::journal::create_journal,
        crate::api::journal::journal_list,
        crate::api::journal::get_journal,
        crate::api::journal::review_journal,

        crate::api::placement::create_placement,
        crate::api::placement::list_placements,
        crate::api::placement::get_placement,
        crate::api::placement::update_placement,
        crate::api::placement::delete_placement,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::deactivate_user,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings
    ),
    components(
        schemas(
            CheckInReq,
            CheckOutReq,
            ManualAttendanceReq,
            HistoryQuery,
            StatsQuery,
            AttendanceRow,
            AttendanceListResponse,
            StatsResponse,
            StatusStat,
            ResolvedSettings,
            TodayResponse,
            AttendanceStatus,
            CreateJournal,
            ReviewJournal,
            JournalFilter,
            JournalListResponse,
            Journal,
            CreatePlacement,
            PlacementQuery,
            PlacementListResponse,
            Placement,
            UserQuery,
            UserResponse,
            UserListResponse,
            UpdateSettingsReq
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Journal", description = "Activity journal APIs"),
        (name = "Placement", description = "Placement location APIs"),
        (name = "User", description = "Account management APIs"),
        (name = "Settings", description = "Attendance configuration APIs"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
