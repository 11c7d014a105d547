use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::{ApiError, ApiResult},
    model::{
        department::Department,
        employee::{Employee, validate_email, validate_employee_code, validate_hire_date},
        role::Role,
    },
    utils::{
        db_utils::{
            SqlValue, build_update_sql, execute_update, is_duplicate_key, page_window,
            placeholders,
        },
        username_cache, username_filter,
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{MySql, MySqlPool, Transaction};
use strum_macros::EnumString;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

pub(crate) const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, \
     phone_number, address, department, role, hire_date, salary, is_active";

/// Columns HR may change through `PUT /employees/{code}`.
const UPDATABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone_number",
    "address",
    "department",
    "role",
    "hire_date",
    "salary",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP001")]
    pub employee_code: String,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "ChangeMe123!")]
    pub password: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+8801712345678")]
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub department: Department,
    pub role: Role,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = 52000.0)]
    pub salary: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Page number (starts with 1)
    pub page: Option<u32>,
    /// Items per page (default 10, max 100)
    pub per_page: Option<u32>,
    /// Matches first name, last name, email or employee code
    pub search: Option<String>,
    pub department: Option<Department>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum BulkActionKind {
    Activate,
    Deactivate,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkAction {
    #[schema(example = "deactivate")]
    pub action: String,
    #[schema(example = json!(["EMP001", "EMP002"]))]
    pub employee_codes: Vec<String>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn invalid(message: String) -> ApiError {
    ApiError::Validation(message)
}

fn validate_create(payload: &CreateEmployee, today: NaiveDate) -> Result<(), ApiError> {
    validate_employee_code(&payload.employee_code).map_err(invalid)?;
    validate_email(&payload.email).map_err(invalid)?;
    validate_hire_date(payload.hire_date, today).map_err(invalid)?;

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(invalid("Username and password must not be empty".into()));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(invalid("First and last name are required".into()));
    }
    Ok(())
}

/// Type-check the fields of a partial update before they reach SQL.
fn validate_update(
    fields: &Map<String, Value>,
    viewer: Role,
    today: NaiveDate,
) -> Result<(), ApiError> {
    if fields.contains_key("salary") && !viewer.can_view_salary() {
        return Err(ApiError::Forbidden(
            "Only HR/Admin may change salary information.".into(),
        ));
    }

    for (key, value) in fields {
        let text = value.as_str();
        match key.as_str() {
            "employee_code" => {
                validate_employee_code(text.unwrap_or_default()).map_err(invalid)?
            }
            "email" => validate_email(text.unwrap_or_default()).map_err(invalid)?,
            "first_name" | "last_name" if text.is_none_or(|t| t.trim().is_empty()) => {
                return Err(invalid(format!("{} must not be empty", key)));
            }
            "department" => {
                text.and_then(|t| t.parse::<Department>().ok())
                    .ok_or_else(|| invalid(format!("Unknown department {}", value)))?;
            }
            "role" => {
                text.and_then(|t| t.parse::<Role>().ok())
                    .ok_or_else(|| invalid(format!("Unknown role {}", value)))?;
            }
            "hire_date" => {
                let date = text
                    .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok())
                    .ok_or_else(|| invalid("hire_date must be YYYY-MM-DD".into()))?;
                validate_hire_date(date, today).map_err(invalid)?;
            }
            "salary" if !(value.is_null() || value.is_number()) => {
                return Err(invalid("salary must be a number".into()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// true  => username AVAILABLE
/// false => username TAKEN
async fn is_username_available(username: &str, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    // Cuckoo filter: a miss is definitive
    if !username_filter::might_exist(username) {
        return Ok(true);
    }

    if username_cache::is_taken(username).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(username_filter::normalize(username))
    .fetch_one(pool)
    .await?;

    if exists {
        username_cache::mark_taken(username).await;
    }
    Ok(!exists)
}

pub(crate) async fn fetch_employee(
    pool: &MySqlPool,
    code: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM employees WHERE employee_code = ?",
        EMPLOYEE_COLUMNS
    );
    sqlx::query_as::<_, Employee>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Flip `is_active` on employees and their login accounts. Returns how many
/// of `codes` matched an employee.
async fn set_active(
    tx: &mut Transaction<'_, MySql>,
    codes: &[String],
    active: bool,
) -> Result<i64, sqlx::Error> {
    let list = placeholders(codes.len());

    let count_sql = format!(
        "SELECT COUNT(*) FROM employees WHERE employee_code IN ({})",
        list
    );
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for code in codes {
        count = count.bind(code);
    }
    let matched = count.fetch_one(&mut **tx).await?;

    let employees_sql = format!(
        "UPDATE employees SET is_active = ? WHERE employee_code IN ({})",
        list
    );
    let mut employees = sqlx::query(&employees_sql).bind(active);
    for code in codes {
        employees = employees.bind(code);
    }
    employees.execute(&mut **tx).await?;

    let users_sql = format!(
        "UPDATE users u JOIN employees e ON e.id = u.employee_id \
         SET u.is_active = ? WHERE e.employee_code IN ({})",
        list
    );
    let mut users = sqlx::query(&users_sql).bind(active);
    for code in codes {
        users = users.bind(code);
    }
    users.execute(&mut **tx).await?;

    Ok(matched)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee and login account created", body = Object, example = json!({
            "success": true,
            "message": "Employee John Doe (ID: EMP001) has been created successfully! They have been assigned to Information Technology as Staff."
        })),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username, employee ID or email already exists")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    validate_create(&payload, today())?;

    let username = username_filter::normalize(&payload.username);
    if !is_username_available(&username, pool.get_ref()).await? {
        return Err(ApiError::Conflict(
            "A user with this username already exists.".into(),
        ));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone_number, address,
         department, role, hire_date, salary, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(&payload.phone_number)
    .bind(&payload.address)
    .bind(payload.department.as_ref())
    .bind(payload.role.as_ref())
    .bind(payload.hire_date)
    .bind(payload.salary.filter(|_| actor.role.can_view_salary()))
    .execute(&mut *tx)
    .await;

    let employee_id = match inserted {
        Ok(result) => result.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict(
                "An employee with this ID or email already exists.".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let user = sqlx::query(
        r#"INSERT INTO users (username, password, employee_id, is_active) VALUES (?, ?, ?, TRUE)"#,
    )
    .bind(&username)
    .bind(&hashed)
    .bind(employee_id)
    .execute(&mut *tx)
    .await;

    if let Err(e) = user {
        if is_duplicate_key(&e) {
            return Err(ApiError::Conflict(
                "A user with this username already exists.".into(),
            ));
        }
        return Err(e.into());
    }

    tx.commit().await?;

    username_filter::insert(&username);
    username_cache::mark_taken(&username).await;

    info!(
        employee_id,
        code = %payload.employee_code,
        created_by = actor.employee_id,
        "Employee created"
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!(
            "Employee {} {} (ID: {}) has been created successfully! They have been assigned to {} as {}.",
            payload.first_name.trim(),
            payload.last_name.trim(),
            payload.employee_code.trim(),
            payload.department.display_name(),
            payload.role.display_name(),
        ),
    })))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)",
        );
        let like = format!("%{}%", search);
        for _ in 0..4 {
            bindings.push(SqlValue::String(like.clone()));
        }
    }

    if let Some(department) = query.department {
        conditions.push("department = ?");
        bindings.push(SqlValue::String(department.as_ref().to_string()));
    }

    if let Some(role) = query.role {
        conditions.push("role = ?");
        bindings.push(SqlValue::String(role.as_ref().to_string()));
    }

    if let Some(is_active) = query.is_active {
        conditions.push("is_active = ?");
        bindings.push(SqlValue::Bool(is_active));
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) AS total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = match b {
            SqlValue::Bool(v) => count_query.bind(*v),
            SqlValue::String(v) => count_query.bind(v),
            _ => count_query,
        };
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {} FROM employees {} ORDER BY employee_code LIMIT ? OFFSET ?",
        EMPLOYEE_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = match b {
            SqlValue::Bool(v) => data_query.bind(*v),
            SqlValue::String(v) => data_query.bind(v),
            _ => data_query,
        };
    }
    let employees = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees
            .into_iter()
            .map(|e| e.redacted_for(actor.role))
            .collect(),
        page,
        per_page,
        total,
    }))
}

/// Get Employee by code
#[utoipa::path(
    get,
    path = "/api/employees/{employee_code}",
    params(
        ("employee_code", Path, description = "Employee code, e.g. EMP001")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "success": false,
            "message": "Employee not found",
            "type": "error"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    let code = path.into_inner();

    let employee = fetch_employee(pool.get_ref(), &code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    Ok(HttpResponse::Ok().json(employee.redacted_for(actor.role)))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_code}",
    params(
        ("employee_code", Path, description = "Employee code, e.g. EMP001")
    ),
    request_body(content = Object, description = "Any subset of the updatable employee fields"),
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee ID or email already exists")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    let code = path.into_inner();

    if let Some(fields) = body.as_object() {
        validate_update(fields, actor.role, today())?;
    }

    if fetch_employee(pool.get_ref(), &code).await?.is_none() {
        return Err(ApiError::NotFound("Employee not found".into()));
    }

    let update = build_update_sql(
        "employees",
        &body,
        UPDATABLE_COLUMNS,
        "employee_code",
        SqlValue::String(code.clone()),
    )?;

    match execute_update(pool.get_ref(), update).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict(
                "An employee with this ID or email already exists.".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let new_code = body
        .get("employee_code")
        .and_then(Value::as_str)
        .unwrap_or(code.as_str());
    let employee = fetch_employee(pool.get_ref(), new_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    info!(code = %new_code, updated_by = actor.employee_id, "Employee updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!(
            "Employee {} (ID: {}) has been updated successfully! Current role: {} in {}.",
            employee.full_name(),
            employee.employee_code,
            employee.role.display_name(),
            employee.department.display_name(),
        ),
        "employee": employee.redacted_for(actor.role),
    })))
}

async fn toggle_one(pool: &MySqlPool, code: String, active: bool) -> ApiResult<Employee> {
    let mut tx = pool.begin().await?;
    let matched = set_active(&mut tx, std::slice::from_ref(&code), active).await?;
    if matched == 0 {
        return Err(ApiError::NotFound("Employee not found".into()));
    }
    tx.commit().await?;

    fetch_employee(pool, &code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))
}

/// Deactivate Employee (soft delete)
#[utoipa::path(
    post,
    path = "/api/employees/{employee_code}/deactivate",
    params(
        ("employee_code", Path, description = "Employee code, e.g. EMP001")
    ),
    responses(
        (status = 200, description = "Employee and login account deactivated"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    let employee = toggle_one(pool.get_ref(), path.into_inner(), false).await?;

    info!(code = %employee.employee_code, by = actor.employee_id, "Employee deactivated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!(
            "Employee {} (ID: {}) has been deactivated successfully. They will no longer be able to access the system until reactivated.",
            employee.full_name(),
            employee.employee_code,
        ),
    })))
}

/// Reactivate Employee
#[utoipa::path(
    post,
    path = "/api/employees/{employee_code}/activate",
    params(
        ("employee_code", Path, description = "Employee code, e.g. EMP001")
    ),
    responses(
        (status = 200, description = "Employee and login account reactivated"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn activate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    let employee = toggle_one(pool.get_ref(), path.into_inner(), true).await?;

    info!(code = %employee.employee_code, by = actor.employee_id, "Employee reactivated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!(
            "Employee {} (ID: {}) has been reactivated successfully! They can now access the system again with their existing credentials.",
            employee.full_name(),
            employee.employee_code,
        ),
    })))
}

fn plural(count: usize) -> &'static str {
    if count > 1 { "s" } else { "" }
}

fn parse_bulk(payload: &BulkAction) -> Result<BulkActionKind, ApiError> {
    if payload.employee_codes.is_empty() {
        return Err(invalid(
            "No employees selected. Please select at least one employee to perform bulk actions."
                .into(),
        ));
    }
    payload
        .action
        .trim()
        .parse()
        .map_err(|_| invalid("Invalid action selected. Please choose a valid bulk action.".into()))
}

/// Bulk activate / deactivate
#[utoipa::path(
    post,
    path = "/api/employees/bulk",
    request_body = BulkAction,
    responses(
        (status = 200, description = "Bulk action applied"),
        (status = 400, description = "No employees selected or unknown action")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn bulk_action(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkAction>,
) -> ApiResult<HttpResponse> {
    let actor = auth.require_management()?;
    let kind = parse_bulk(&payload)?;
    let active = kind == BulkActionKind::Activate;

    let mut tx = pool.begin().await?;
    let matched = set_active(&mut tx, &payload.employee_codes, active).await?;
    tx.commit().await?;

    let count = payload.employee_codes.len();
    info!(?kind, requested = count, matched, by = actor.employee_id, "Bulk action applied");

    let message = if active {
        format!(
            "Successfully activated {} employee{}. They can now access the system with their existing credentials.",
            count,
            plural(count)
        )
    } else {
        format!(
            "Successfully deactivated {} employee{}. They will no longer be able to access the system until reactivated.",
            count,
            plural(count)
        )
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "matched": matched,
    })))
}
