use crate::{
    api::employee::EMPLOYEE_COLUMNS,
    attendance::rules::Rejection,
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::employee::{Employee, validate_email},
    utils::db_utils::{SqlValue, build_update_sql, execute_update, is_duplicate_key},
};
use actix_web::{HttpResponse, web};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::info;

/// Fields an employee may change on their own record.
const SELF_EDITABLE: &[&str] = &["first_name", "last_name", "email", "phone_number", "address"];

async fn own_employee(pool: &MySqlPool, employee_id: u64) -> ApiResult<Employee> {
    let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::Rejected(Rejection::ProfileMissing))
}

fn validate_profile_update(body: &Value) -> Result<(), ApiError> {
    let Some(fields) = body.as_object() else {
        return Ok(());
    };

    if let Some(email) = fields.get("email") {
        validate_email(email.as_str().unwrap_or_default()).map_err(ApiError::Validation)?;
    }
    for name in ["first_name", "last_name"] {
        if let Some(value) = fields.get(name) {
            if value.as_str().is_none_or(|v| v.trim().is_empty()) {
                return Err(ApiError::Validation(format!("{} must not be empty", name)));
            }
        }
    }
    Ok(())
}

/// View own profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own employee record", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
pub async fn get_profile(auth: AuthUser, pool: web::Data<MySqlPool>) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;
    let employee = own_employee(pool.get_ref(), profile.employee_id).await?;
    Ok(HttpResponse::Ok().json(employee.redacted_for(profile.role)))
}

/// Edit own contact details
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body(content = Object, description = "Any of first_name, last_name, email, phone_number, address", example = json!({
        "phone_number": "+8801712345678",
        "address": "House 12, Road 5, Dhaka"
    })),
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Field not editable or invalid value"),
        (status = 403, description = "Employee profile not found"),
        (status = 409, description = "Email already in use")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile"
)]
pub async fn update_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;
    validate_profile_update(&body)?;

    let update = build_update_sql(
        "employees",
        &body,
        SELF_EDITABLE,
        "id",
        SqlValue::U64(profile.employee_id),
    )?;

    match execute_update(pool.get_ref(), update).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict("This email is already in use.".into()));
        }
        Err(e) => return Err(e.into()),
    }

    let employee = own_employee(pool.get_ref(), profile.employee_id).await?;
    info!(employee_id = profile.employee_id, "Profile updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Your profile has been updated successfully!",
        "employee": employee.redacted_for(profile.role),
    })))
}
