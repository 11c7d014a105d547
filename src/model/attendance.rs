use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One employee's attendance for one calendar day.
///
/// `status` is `absent` until a check-in lands; `check_out_time` is only ever
/// written after `check_in_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "employee_id": 1,
    "date": "2026-01-05",
    "check_in_time": "08:05:00",
    "check_out_time": "17:05:00",
    "status": "present",
    "is_late": false,
    "notes": null
}))]
pub struct AttendanceRecord {
    pub employee_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, example = "08:05:00")]
    pub check_in_time: Option<NaiveTime>,

    #[schema(value_type = Option<String>, example = "17:05:00")]
    pub check_out_time: Option<NaiveTime>,

    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,

    pub is_late: bool,

    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// Fresh record for the day, before any check-in.
    pub fn absent(employee_id: u64, date: NaiveDate) -> Self {
        Self {
            employee_id,
            date,
            check_in_time: None,
            check_out_time: None,
            status: AttendanceStatus::Absent,
            is_late: false,
            notes: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in_time.is_some()
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}
