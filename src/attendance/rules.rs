//! Check-in / check-out decisions for a single employee-day.
//!
//! Everything here is pure: the caller supplies the clock, the policy and the
//! stored record (if any) and gets back either the record as it should be
//! persisted or a [`Rejection`] explaining why nothing changes.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::policy::AttendancePolicy;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    OutOfWindow,
    AlreadyDone,
    NotCheckedIn,
    InsufficientDuration,
    ProfileMissing,
}

fn hhmm(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Why a check-in or check-out was refused. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("Check-in is only allowed between {} - {}", hhmm(.opens), hhmm(.closes))]
    CheckInClosed { opens: NaiveTime, closes: NaiveTime },

    #[error("Check-out is only allowed after {}", hhmm(.opens))]
    CheckOutNotOpen { opens: NaiveTime },

    #[error("You have already checked in today")]
    AlreadyCheckedIn,

    #[error("You have already checked out today")]
    AlreadyCheckedOut,

    #[error("No check-in record found for today")]
    NoRecordToday,

    #[error("You must check in first before checking out")]
    CheckInFirst,

    #[error(
        "Minimum work time is {min_hours} hours. You have worked {worked_hours:.1} hours. Please check out after {earliest_hhmm} if you started at {started_hhmm}.",
        earliest_hhmm = hhmm(.earliest),
        started_hhmm = hhmm(.checked_in)
    )]
    InsufficientDuration {
        worked_hours: f64,
        min_hours: f64,
        checked_in: NaiveTime,
        earliest: NaiveTime,
    },

    #[error("Employee profile not found")]
    ProfileMissing,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::CheckInClosed { .. } | Rejection::CheckOutNotOpen { .. } => {
                RejectionKind::OutOfWindow
            }
            Rejection::AlreadyCheckedIn | Rejection::AlreadyCheckedOut => {
                RejectionKind::AlreadyDone
            }
            Rejection::NoRecordToday | Rejection::CheckInFirst => RejectionKind::NotCheckedIn,
            Rejection::InsufficientDuration { .. } => RejectionKind::InsufficientDuration,
            Rejection::ProfileMissing => RejectionKind::ProfileMissing,
        }
    }

    /// Severity shown next to the message: repeat or premature actions are
    /// warnings, requests that can never succeed right now are errors.
    pub fn severity(&self) -> &'static str {
        match self {
            Rejection::AlreadyCheckedIn
            | Rejection::AlreadyCheckedOut
            | Rejection::CheckInFirst
            | Rejection::InsufficientDuration { .. } => "warning",
            _ => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    OnTime,
    Late,
    Complete,
}

/// A permitted action: `record` is the full row to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub record: AttendanceRecord,
    pub status: StatusTag,
    pub message: String,
    /// Set on check-out only, rounded to one decimal.
    pub work_duration_hours: Option<f64>,
}

pub type Decision = Result<Accepted, Rejection>;

pub fn evaluate_check_in(
    policy: &AttendancePolicy,
    employee_id: u64,
    today: NaiveDate,
    now: NaiveTime,
    record: Option<&AttendanceRecord>,
) -> Decision {
    if !policy.within_check_in_window(now) {
        return Err(Rejection::CheckInClosed {
            opens: policy.check_in_opens,
            closes: policy.check_in_closes,
        });
    }

    if record.is_some_and(AttendanceRecord::is_checked_in) {
        return Err(Rejection::AlreadyCheckedIn);
    }

    let is_late = policy.is_late(now);
    let mut record = record
        .cloned()
        .unwrap_or_else(|| AttendanceRecord::absent(employee_id, today));
    record.check_in_time = Some(now);
    record.is_late = is_late;
    record.status = if is_late {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    };

    let (status, message) = if is_late {
        (
            StatusTag::Late,
            format!(
                "Checked in LATE at {}. Please be on time tomorrow.",
                hhmm(&now)
            ),
        )
    } else {
        (
            StatusTag::OnTime,
            format!(
                "Successfully checked in ON TIME at {}. Have a great day!",
                hhmm(&now)
            ),
        )
    };

    Ok(Accepted {
        record,
        status,
        message,
        work_duration_hours: None,
    })
}

pub fn evaluate_check_out(
    policy: &AttendancePolicy,
    today: NaiveDate,
    now: NaiveTime,
    record: Option<&AttendanceRecord>,
) -> Decision {
    if !policy.within_check_out_window(now) {
        return Err(Rejection::CheckOutNotOpen {
            opens: policy.check_out_opens,
        });
    }

    let Some(record) = record else {
        return Err(Rejection::NoRecordToday);
    };
    let Some(check_in) = record.check_in_time else {
        return Err(Rejection::CheckInFirst);
    };
    if record.is_checked_out() {
        return Err(Rejection::AlreadyCheckedOut);
    }

    let worked = work_duration_hours(today, check_in, now);
    if worked < policy.min_work_hours {
        return Err(Rejection::InsufficientDuration {
            worked_hours: worked,
            min_hours: policy.min_work_hours,
            checked_in: check_in,
            earliest: earliest_check_out(policy, check_in),
        });
    }

    let mut record = record.clone();
    record.check_out_time = Some(now);
    let worked = round_to_tenth(worked);

    Ok(Accepted {
        record,
        status: StatusTag::Complete,
        message: format!(
            "Successfully checked out at {}. You worked for {:.1} hours today. Great job!",
            hhmm(&now),
            worked
        ),
        work_duration_hours: Some(worked),
    })
}

/// First moment a check-out satisfies both the window and the minimum duration.
fn earliest_check_out(policy: &AttendancePolicy, check_in: NaiveTime) -> NaiveTime {
    let minimum = Duration::milliseconds((policy.min_work_hours * 3_600_000.0).round() as i64);
    (check_in + minimum).max(policy.check_out_opens)
}

/// Elapsed hours between two clock times on the same date, never negative.
pub fn work_duration_hours(date: NaiveDate, check_in: NaiveTime, check_out: NaiveTime) -> f64 {
    let elapsed = date.and_time(check_out) - date.and_time(check_in);
    (elapsed.num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

pub fn round_to_tenth(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

pub fn can_check_in(
    policy: &AttendancePolicy,
    now: NaiveTime,
    record: Option<&AttendanceRecord>,
) -> bool {
    policy.within_check_in_window(now) && !record.is_some_and(AttendanceRecord::is_checked_in)
}

/// Window and record state only; the minimum duration is checked on submit.
pub fn can_check_out(
    policy: &AttendancePolicy,
    now: NaiveTime,
    record: Option<&AttendanceRecord>,
) -> bool {
    policy.within_check_out_window(now)
        && record.is_some_and(|r| r.is_checked_in() && !r.is_checked_out())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::policy::clock;

    const EMPLOYEE: u64 = 42;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn checked_in_at(time: NaiveTime, late: bool) -> AttendanceRecord {
        let mut record = AttendanceRecord::absent(EMPLOYEE, day());
        record.check_in_time = Some(time);
        record.is_late = late;
        record.status = if late {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        record
    }

    /// Window stays open past the lateness threshold so late check-ins are reachable.
    fn lenient() -> AttendancePolicy {
        AttendancePolicy {
            check_in_closes: clock(10, 0),
            ..AttendancePolicy::default()
        }
    }

    #[test]
    fn check_in_inside_window_is_on_time() {
        let policy = AttendancePolicy::default();

        for now in [at(8, 0, 0), at(8, 30, 0), at(9, 14, 59), at(9, 15, 0)] {
            let accepted = evaluate_check_in(&policy, EMPLOYEE, day(), now, None).unwrap();
            assert_eq!(accepted.status, StatusTag::OnTime);
            assert_eq!(accepted.record.status, AttendanceStatus::Present);
            assert!(!accepted.record.is_late);
            assert_eq!(accepted.record.check_in_time, Some(now));
            assert_eq!(accepted.record.employee_id, EMPLOYEE);
            assert_eq!(accepted.record.date, day());
        }
    }

    #[test]
    fn check_in_outside_window_is_rejected_whatever_the_record() {
        let policy = AttendancePolicy::default();
        let empty = AttendanceRecord::absent(EMPLOYEE, day());
        let done = checked_in_at(at(8, 10, 0), false);

        for now in [at(0, 0, 0), at(7, 59, 59), at(9, 15, 1), at(12, 0, 0), at(18, 0, 0)] {
            for record in [None, Some(&empty), Some(&done)] {
                let err = evaluate_check_in(&policy, EMPLOYEE, day(), now, record).unwrap_err();
                assert_eq!(err.kind(), RejectionKind::OutOfWindow);
                assert_eq!(
                    err.to_string(),
                    "Check-in is only allowed between 08:00 - 09:15"
                );
            }
        }
    }

    #[test]
    fn second_check_in_is_already_done() {
        let policy = AttendancePolicy::default();
        let first = evaluate_check_in(&policy, EMPLOYEE, day(), at(8, 5, 0), None).unwrap();

        let err = evaluate_check_in(&policy, EMPLOYEE, day(), at(8, 10, 0), Some(&first.record))
            .unwrap_err();
        assert_eq!(err, Rejection::AlreadyCheckedIn);
        assert_eq!(err.kind(), RejectionKind::AlreadyDone);
        assert_eq!(err.to_string(), "You have already checked in today");
    }

    #[test]
    fn check_in_fills_an_existing_absent_record() {
        let policy = AttendancePolicy::default();
        let mut existing = AttendanceRecord::absent(EMPLOYEE, day());
        existing.notes = Some("badge reader offline".into());

        let accepted =
            evaluate_check_in(&policy, EMPLOYEE, day(), at(8, 45, 0), Some(&existing)).unwrap();
        assert_eq!(accepted.record.notes.as_deref(), Some("badge reader offline"));
        assert_eq!(accepted.record.status, AttendanceStatus::Present);
    }

    #[test]
    fn check_in_after_threshold_is_late() {
        let accepted = evaluate_check_in(&lenient(), EMPLOYEE, day(), at(9, 20, 0), None).unwrap();

        assert_eq!(accepted.status, StatusTag::Late);
        assert_eq!(accepted.record.status, AttendanceStatus::Late);
        assert!(accepted.record.is_late);
        assert_eq!(
            accepted.message,
            "Checked in LATE at 09:20. Please be on time tomorrow."
        );
    }

    #[test]
    fn on_time_and_late_messages_differ() {
        let on_time = evaluate_check_in(&lenient(), EMPLOYEE, day(), at(9, 15, 0), None).unwrap();
        let late = evaluate_check_in(&lenient(), EMPLOYEE, day(), at(9, 15, 1), None).unwrap();

        assert_eq!(
            on_time.message,
            "Successfully checked in ON TIME at 09:15. Have a great day!"
        );
        assert_ne!(on_time.message, late.message);
        assert_eq!(late.status, StatusTag::Late);
    }

    #[test]
    fn check_out_before_five_is_out_of_window_even_after_long_day() {
        let policy = AttendancePolicy::default();
        let record = checked_in_at(at(8, 0, 0), false);

        for now in [at(12, 0, 0), at(16, 30, 0), at(16, 59, 59)] {
            let err = evaluate_check_out(&policy, day(), now, Some(&record)).unwrap_err();
            assert_eq!(err.kind(), RejectionKind::OutOfWindow);
            assert_eq!(err.to_string(), "Check-out is only allowed after 17:00");
        }
    }

    #[test]
    fn check_out_at_five_after_eight_o_clock_start() {
        let policy = AttendancePolicy::default();
        let record = checked_in_at(at(8, 0, 0), false);

        let accepted = evaluate_check_out(&policy, day(), at(17, 0, 0), Some(&record)).unwrap();
        assert_eq!(accepted.status, StatusTag::Complete);
        assert_eq!(accepted.work_duration_hours, Some(9.0));
        assert_eq!(accepted.record.check_out_time, Some(at(17, 0, 0)));
        assert_eq!(accepted.record.check_in_time, Some(at(8, 0, 0)));
        assert_eq!(
            accepted.message,
            "Successfully checked out at 17:00. You worked for 9.0 hours today. Great job!"
        );
    }

    #[test]
    fn exactly_eight_hours_is_enough() {
        let policy = AttendancePolicy::default();
        let record = checked_in_at(at(9, 0, 0), false);

        let accepted = evaluate_check_out(&policy, day(), at(17, 0, 0), Some(&record)).unwrap();
        assert_eq!(accepted.work_duration_hours, Some(8.0));

        let boundary = checked_in_at(at(9, 15, 0), false);
        assert!(evaluate_check_out(&policy, day(), at(17, 15, 0), Some(&boundary)).is_ok());
    }

    #[test]
    fn short_day_is_rejected_without_touching_the_record() {
        let policy = AttendancePolicy::default();
        let record = checked_in_at(at(9, 30, 0), true);
        let before = record.clone();

        let err = evaluate_check_out(&policy, day(), at(17, 0, 0), Some(&record)).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::InsufficientDuration);
        assert_eq!(
            err,
            Rejection::InsufficientDuration {
                worked_hours: 7.5,
                min_hours: 8.0,
                checked_in: at(9, 30, 0),
                earliest: at(17, 30, 0),
            }
        );
        assert!(
            err.to_string()
                .ends_with("Please check out after 17:30 if you started at 09:30.")
        );
        assert!(err.to_string().contains("You have worked 7.5 hours"));
        assert!(err.to_string().starts_with("Minimum work time is 8 hours."));
        assert_eq!(record, before);

        let retry = evaluate_check_out(&policy, day(), at(17, 30, 0), Some(&record)).unwrap();
        assert_eq!(retry.work_duration_hours, Some(8.0));
        assert_eq!(retry.record.check_out_time, Some(at(17, 30, 0)));
    }

    #[test]
    fn missing_record_and_missing_check_in_are_distinguishable() {
        let policy = AttendancePolicy::default();

        let no_record = evaluate_check_out(&policy, day(), at(17, 5, 0), None).unwrap_err();
        assert_eq!(no_record.kind(), RejectionKind::NotCheckedIn);
        assert_eq!(no_record.to_string(), "No check-in record found for today");

        let absent = AttendanceRecord::absent(EMPLOYEE, day());
        let no_check_in =
            evaluate_check_out(&policy, day(), at(17, 5, 0), Some(&absent)).unwrap_err();
        assert_eq!(no_check_in.kind(), RejectionKind::NotCheckedIn);
        assert_eq!(
            no_check_in.to_string(),
            "You must check in first before checking out"
        );

        assert_ne!(no_record, no_check_in);
        assert_eq!(no_record.severity(), "error");
        assert_eq!(no_check_in.severity(), "warning");
    }

    #[test]
    fn second_check_out_is_already_done() {
        let policy = AttendancePolicy::default();
        let mut record = checked_in_at(at(8, 0, 0), false);
        record.check_out_time = Some(at(17, 0, 0));

        let err = evaluate_check_out(&policy, day(), at(18, 0, 0), Some(&record)).unwrap_err();
        assert_eq!(err, Rejection::AlreadyCheckedOut);
        assert_eq!(err.kind(), RejectionKind::AlreadyDone);
        assert_eq!(err.to_string(), "You have already checked out today");
    }

    #[test]
    fn full_day_on_time() {
        let policy = AttendancePolicy::default();

        let check_in = evaluate_check_in(&policy, EMPLOYEE, day(), at(8, 5, 0), None).unwrap();
        assert_eq!(check_in.status, StatusTag::OnTime);
        assert_eq!(check_in.record.status, AttendanceStatus::Present);
        assert!(!check_in.record.is_late);

        let again = evaluate_check_in(&policy, EMPLOYEE, day(), at(8, 10, 0), Some(&check_in.record));
        assert_eq!(again.unwrap_err().kind(), RejectionKind::AlreadyDone);

        let check_out =
            evaluate_check_out(&policy, day(), at(17, 5, 0), Some(&check_in.record)).unwrap();
        assert_eq!(check_out.work_duration_hours, Some(9.0));
        assert_eq!(check_out.record.check_out_time, Some(at(17, 5, 0)));
        assert_eq!(check_out.record.status, AttendanceStatus::Present);
    }

    #[test]
    fn duration_is_fractional_and_clamped() {
        assert_eq!(work_duration_hours(day(), at(8, 30, 0), at(17, 0, 0)), 8.5);
        assert_eq!(work_duration_hours(day(), at(18, 0, 0), at(17, 0, 0)), 0.0);
        assert_eq!(round_to_tenth(8.96), 9.0);
        assert_eq!(round_to_tenth(8.04), 8.0);
    }

    #[test]
    fn availability_flags_follow_window_and_record() {
        let policy = AttendancePolicy::default();
        let checked_in = checked_in_at(at(8, 0, 0), false);

        assert!(can_check_in(&policy, at(8, 30, 0), None));
        assert!(!can_check_in(&policy, at(8, 30, 0), Some(&checked_in)));
        assert!(!can_check_in(&policy, at(10, 0, 0), None));

        assert!(can_check_out(&policy, at(17, 0, 0), Some(&checked_in)));
        assert!(!can_check_out(&policy, at(16, 0, 0), Some(&checked_in)));
        assert!(!can_check_out(&policy, at(17, 0, 0), None));
    }
}
