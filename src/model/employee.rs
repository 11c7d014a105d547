use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{department::Department, role::Role};

pub const EMPLOYEE_CODE_PREFIX: &str = "EMP";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone_number": "+8801712345678",
        "address": "12 Main Street",
        "department": "information_technology",
        "role": "staff",
        "hire_date": "2024-01-01",
        "salary": 52000.0,
        "is_active": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone_number: Option<String>,

    #[schema(nullable = true)]
    pub address: Option<String>,

    #[sqlx(try_from = "String")]
    pub department: Department,

    #[sqlx(try_from = "String")]
    pub role: Role,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    /// Only serialized for callers allowed to see salary information.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 52000.0, nullable = true)]
    pub salary: Option<f64>,

    #[schema(example = true)]
    pub is_active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Strip fields the viewer's role may not see.
    pub fn redacted_for(mut self, viewer: Role) -> Self {
        if !viewer.can_view_salary() {
            self.salary = None;
        }
        self
    }
}

/// Employee codes look like `EMP001`.
pub fn validate_employee_code(code: &str) -> Result<(), String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Employee ID is required.".to_string());
    }
    if !code.starts_with(EMPLOYEE_CODE_PREFIX) {
        return Err(format!(
            "Employee ID must start with \"{}\".",
            EMPLOYEE_CODE_PREFIX
        ));
    }
    if code.len() > 10 {
        return Err("Employee ID must be at most 10 characters.".to_string());
    }
    Ok(())
}

pub fn validate_hire_date(hire_date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if hire_date > today {
        return Err("Hire date cannot be in the future.".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("Enter a valid email address.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Employee {
        Employee {
            id: 7,
            employee_code: "EMP007".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@company.com".into(),
            phone_number: None,
            address: None,
            department: Department::Finance,
            role: Role::Staff,
            hire_date: NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
            salary: Some(61000.0),
            is_active: true,
        }
    }

    #[test]
    fn employee_code_needs_prefix() {
        assert!(validate_employee_code("EMP001").is_ok());
        assert_eq!(
            validate_employee_code("E001").unwrap_err(),
            "Employee ID must start with \"EMP\"."
        );
        assert!(validate_employee_code("   ").is_err());
        assert!(validate_employee_code("EMP12345678").is_err());
    }

    #[test]
    fn hire_date_cannot_be_in_future() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(validate_hire_date(today, today).is_ok());
        assert!(validate_hire_date(today.succ_opt().unwrap(), today).is_err());
    }

    #[test]
    fn email_needs_domain() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("@b.com").is_err());
    }

    #[test]
    fn salary_only_visible_to_hr_admin() {
        assert_eq!(sample().redacted_for(Role::HrAdmin).salary, Some(61000.0));
        assert_eq!(sample().redacted_for(Role::Manager).salary, None);

        let json = serde_json::to_value(sample().redacted_for(Role::Staff)).unwrap();
        assert!(json.get("salary").is_none());
        assert_eq!(json["department"], "finance");
    }

    #[test]
    fn full_name_joins_parts() {
        assert_eq!(sample().full_name(), "Ada Lovelace");
    }
}
