use crate::{
    attendance::{
        rules::{Accepted, StatusTag},
        service::{self, AttendanceError},
        store::MySqlAttendanceStore,
    },
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, ApiResult},
    model::attendance::AttendanceRecord,
    utils::db_utils::page_window,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Body returned by a successful check-in or check-out.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceActionResponse {
    pub success: bool,
    #[schema(example = "Successfully checked in ON TIME at 08:45. Have a great day!")]
    pub message: String,
    /// `success`, or `warning` for a late check-in
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "success")]
    pub kind: &'static str,
    pub status: StatusTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "9.0 hours")]
    pub work_duration: Option<String>,
}

impl From<Accepted> for AttendanceActionResponse {
    fn from(accepted: Accepted) -> Self {
        AttendanceActionResponse {
            success: true,
            message: accepted.message,
            kind: match accepted.status {
                StatusTag::Late => "warning",
                _ => "success",
            },
            status: accepted.status,
            work_duration: accepted
                .work_duration_hours
                .map(|hours| format!("{:.1} hours", hours)),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Page number (starts with 1)
    pub page: Option<u32>,
    /// Items per page (default 10, max 100)
    pub per_page: Option<u32>,
    /// Management only: restrict to one employee
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>, format = "date", example = "2026-02-10")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 23)]
    pub total: i64,
}

fn log_outcome(action: &'static str, employee_id: u64, err: AttendanceError) -> ApiError {
    if let AttendanceError::Rejected(rejection) = &err {
        info!(action, employee_id, kind = ?rejection.kind(), reason = %rejection, "Attendance request rejected");
    }
    err.into()
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in (on time or late)", body = AttendanceActionResponse),
        (status = 400, description = "Outside the check-in window or already checked in", body = Object, example = json!({
            "success": false,
            "message": "You have already checked in today",
            "type": "warning",
            "error_kind": "already_done"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;

    let accepted = service::check_in(
        store.get_ref(),
        &config.attendance,
        profile.employee_id,
        service::local_now(),
    )
    .await
    .map_err(|e| log_outcome("check_in", profile.employee_id, e))?;

    Ok(HttpResponse::Ok().json(AttendanceActionResponse::from(accepted)))
}

/// Check out for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out", body = AttendanceActionResponse),
        (status = 400, description = "Too early, not checked in, already checked out or not enough hours worked", body = Object, example = json!({
            "success": false,
            "message": "Minimum work time is 8 hours. You have worked 5.2 hours. Please check out after 17:00 if you started at 09:00.",
            "type": "warning",
            "error_kind": "insufficient_duration"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;

    let accepted = service::check_out(
        store.get_ref(),
        &config.attendance,
        profile.employee_id,
        service::local_now(),
    )
    .await
    .map_err(|e| log_outcome("check_out", profile.employee_id, e))?;

    Ok(HttpResponse::Ok().json(AttendanceActionResponse::from(accepted)))
}

/// Today's record and which actions are currently available
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's attendance", body = TodayAttendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;

    let today = service::today(
        store.get_ref(),
        &config.attendance,
        profile.employee_id,
        service::local_now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(today))
}

/// Attendance history, newest first
///
/// Staff always see their own records; management may filter by employee and date.
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<HistoryQuery>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let employee_id = if profile.role.is_in_management() {
        query.employee_id
    } else {
        Some(profile.employee_id)
    };

    let (data, total) = store
        .history(employee_id, query.date, per_page, offset)
        .await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        data,
        page,
        per_page,
        total,
    }))
}
