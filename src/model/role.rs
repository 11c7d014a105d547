use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Manager,
    HrAdmin,
    Staff,
}

impl Role {
    /// Human readable label used in dashboards and messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::HrAdmin => "HR/Admin",
            Role::Staff => "Staff",
        }
    }

    /// Managers and HR admins maintain employee records and see everyone's attendance.
    pub fn can_manage_employees(&self) -> bool {
        matches!(self, Role::Manager | Role::HrAdmin)
    }

    pub fn can_view_salary(&self) -> bool {
        *self == Role::HrAdmin
    }

    pub fn is_in_management(&self) -> bool {
        matches!(self, Role::Manager | Role::HrAdmin)
    }
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
