use crate::{
    api::employee::EMPLOYEE_COLUMNS,
    attendance::{
        rules::Rejection,
        service,
        store::{AttendanceStore, DailyCounts, MySqlAttendanceStore},
    },
    auth::auth::{AuthUser, Profile},
    error::{ApiError, ApiResult},
    model::{attendance::AttendanceRecord, department::Department, employee::Employee, role::Role},
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

#[derive(Debug, FromRow)]
struct RoleCounts {
    total: i64,
    active: i64,
    staff: i64,
    hr_admin: i64,
}

#[derive(Debug, FromRow)]
struct DepartmentCount {
    department: String,
    total: i64,
}

/// Colleague as shown on the staff dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct Colleague {
    #[schema(example = "EMP004")]
    pub employee_code: String,
    #[schema(example = "Jane Roe")]
    pub full_name: String,
    #[schema(value_type = String, example = "Staff")]
    pub role: &'static str,
}

impl From<Employee> for Colleague {
    fn from(e: Employee) -> Self {
        Colleague {
            full_name: e.full_name(),
            employee_code: e.employee_code,
            role: e.role.display_name(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "dashboard", rename_all = "snake_case")]
pub enum Dashboard {
    Manager {
        total_employees: i64,
        staff_count: i64,
        hr_count: i64,
        present_today: i64,
        late_today: i64,
        #[schema(nullable = true)]
        today_attendance: Option<AttendanceRecord>,
    },
    HrAdmin {
        total_employees: i64,
        active_employees: i64,
        /// Keyed by department display name
        #[schema(value_type = Object)]
        department_stats: BTreeMap<&'static str, i64>,
        present_today: i64,
        late_today: i64,
        absent_today: i64,
        #[schema(nullable = true)]
        today_attendance: Option<AttendanceRecord>,
    },
    Staff {
        #[schema(value_type = String, example = "Sales")]
        department: &'static str,
        colleagues: Vec<Colleague>,
        #[schema(nullable = true)]
        today_attendance: Option<AttendanceRecord>,
    },
}

/// Every department appears, with zero when nobody works there.
fn department_stats(rows: Vec<DepartmentCount>) -> BTreeMap<&'static str, i64> {
    let mut stats: BTreeMap<&'static str, i64> = Department::iter()
        .map(|d| (d.display_name(), 0))
        .collect();

    for row in rows {
        if let Ok(department) = row.department.parse::<Department>() {
            *stats.entry(department.display_name()).or_default() += row.total;
        }
    }
    stats
}

fn absent_count(total: i64, counts: &DailyCounts) -> i64 {
    (total - counts.present).max(0)
}

async fn role_counts(pool: &MySqlPool) -> Result<RoleCounts, sqlx::Error> {
    sqlx::query_as::<_, RoleCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            CAST(COALESCE(SUM(is_active), 0) AS SIGNED) AS active,
            CAST(COALESCE(SUM(role = 'staff'), 0) AS SIGNED) AS staff,
            CAST(COALESCE(SUM(role = 'hr_admin'), 0) AS SIGNED) AS hr_admin
        FROM employees
        "#,
    )
    .fetch_one(pool)
    .await
}

async fn build_dashboard(
    pool: &MySqlPool,
    store: &MySqlAttendanceStore,
    profile: Profile,
) -> ApiResult<Dashboard> {
    let now = service::local_now();
    let today_attendance = store.find(profile.employee_id, now.date()).await?;

    let dashboard = match profile.role {
        Role::Manager => {
            let counts = role_counts(pool).await?;
            let daily = store.daily_counts(now.date()).await?;
            Dashboard::Manager {
                total_employees: counts.total,
                staff_count: counts.staff,
                hr_count: counts.hr_admin,
                present_today: daily.present,
                late_today: daily.late,
                today_attendance,
            }
        }
        Role::HrAdmin => {
            let counts = role_counts(pool).await?;
            let daily = store.daily_counts(now.date()).await?;
            let departments = sqlx::query_as::<_, DepartmentCount>(
                "SELECT department, COUNT(*) AS total FROM employees GROUP BY department",
            )
            .fetch_all(pool)
            .await?;

            Dashboard::HrAdmin {
                total_employees: counts.total,
                active_employees: counts.active,
                department_stats: department_stats(departments),
                absent_today: absent_count(counts.total, &daily),
                present_today: daily.present,
                late_today: daily.late,
                today_attendance,
            }
        }
        Role::Staff => {
            let department = sqlx::query_scalar::<_, String>(
                "SELECT department FROM employees WHERE id = ?",
            )
            .bind(profile.employee_id)
            .fetch_optional(pool)
            .await?
            .and_then(|d| d.parse::<Department>().ok())
            .ok_or(ApiError::Rejected(Rejection::ProfileMissing))?;

            let sql = format!(
                "SELECT {} FROM employees WHERE department = ? AND id <> ? AND is_active = TRUE \
                 ORDER BY first_name, last_name",
                EMPLOYEE_COLUMNS
            );
            let colleagues = sqlx::query_as::<_, Employee>(&sql)
                .bind(department.as_ref())
                .bind(profile.employee_id)
                .fetch_all(pool)
                .await?;

            Dashboard::Staff {
                department: department.display_name(),
                colleagues: colleagues.into_iter().map(Colleague::from).collect(),
                today_attendance,
            }
        }
    };

    Ok(dashboard)
}

/// Dashboard for the caller's role
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Role specific dashboard", body = Dashboard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee profile not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
) -> ApiResult<HttpResponse> {
    let profile = auth.profile()?;
    let dashboard = build_dashboard(pool.get_ref(), store.get_ref(), profile).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
