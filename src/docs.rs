use crate::api::attendance::{AttendanceActionResponse, HistoryResponse};
use crate::api::dashboard::{Colleague, Dashboard};
use crate::api::employee::{BulkAction, CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::attendance::rules::{RejectionKind, StatusTag};
use crate::attendance::service::TodayAttendance;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Daily check-in / check-out for employees, with role based dashboards and
employee record management.

### 🔹 Key Features
- **Attendance**
  - Check in during the morning window, check out after the minimum work time
  - Today's status and paginated history
- **Dashboards**
  - Manager, HR/Admin and Staff views
- **Employee Management**
  - Create, update, list, activate and deactivate employees

### 🔐 Security
All endpoints except `/auth/*` require a **JWT Bearer** access token.
Employee management is limited to **Manager** and **HR/Admin** roles.

### 📦 Response Format
Errors are returned as `{ "success": false, "message": ..., "type": ... }`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::dashboard::dashboard,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::activate_employee,
        crate::api::employee::deactivate_employee,
        crate::api::employee::bulk_action,

        crate::api::profile::get_profile,
        crate::api::profile::update_profile
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Dashboard,
            Colleague,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceActionResponse,
            HistoryResponse,
            TodayAttendance,
            StatusTag,
            RejectionKind,
            CreateEmployee,
            EmployeeQuery,
            BulkAction,
            Employee,
            EmployeeListResponse,
            Department,
            Role
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token management"),
        (name = "Dashboard", description = "Role based dashboards"),
        (name = "Attendance", description = "Check-in, check-out and attendance history"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Profile", description = "Self-service profile"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/auth/login",
            "/api/dashboard",
            "/api/attendance/check-in",
            "/api/attendance/check-out",
            "/api/attendance/today",
            "/api/employees/{employee_code}/deactivate",
            "/api/employees/bulk",
            "/api/profile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
