use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use super::policy::AttendancePolicy;
use super::rules::{self, Accepted, Rejection};
use super::store::AttendanceStore;
use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("attendance store failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Server local wall clock, truncated to whole seconds to match the TIME columns.
pub fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub async fn check_in<S: AttendanceStore>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: u64,
    now: NaiveDateTime,
) -> Result<Accepted, AttendanceError> {
    let today = now.date();
    let existing = store.find(employee_id, today).await?;

    let accepted =
        rules::evaluate_check_in(policy, employee_id, today, now.time(), existing.as_ref())?;

    if !store.upsert_check_in(&accepted.record).await? {
        debug!(employee_id, %today, "check-in lost race against a concurrent request");
        return Err(Rejection::AlreadyCheckedIn.into());
    }

    info!(employee_id, %today, status = ?accepted.status, "Check-in recorded");
    Ok(accepted)
}

pub async fn check_out<S: AttendanceStore>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: u64,
    now: NaiveDateTime,
) -> Result<Accepted, AttendanceError> {
    let today = now.date();
    let existing = store.find(employee_id, today).await?;

    let accepted = rules::evaluate_check_out(policy, today, now.time(), existing.as_ref())?;

    if !store.upsert_check_out(&accepted.record).await? {
        debug!(employee_id, %today, "check-out lost race against a concurrent request");
        return Err(Rejection::AlreadyCheckedOut.into());
    }

    info!(
        employee_id,
        %today,
        hours = accepted.work_duration_hours,
        "Check-out recorded"
    );
    Ok(accepted)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayAttendance {
    #[schema(nullable = true)]
    pub record: Option<AttendanceRecord>,
    pub can_check_in: bool,
    pub can_check_out: bool,
}

pub async fn today<S: AttendanceStore>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: u64,
    now: NaiveDateTime,
) -> Result<TodayAttendance, AttendanceError> {
    let record = store.find(employee_id, now.date()).await?;

    Ok(TodayAttendance {
        can_check_in: rules::can_check_in(policy, now.time(), record.as_ref()),
        can_check_out: rules::can_check_out(policy, now.time(), record.as_ref()),
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::memory::MemoryAttendanceStore;
    use crate::attendance::policy::clock;
    use crate::attendance::rules::{RejectionKind, StatusTag};
    use crate::model::attendance::AttendanceStatus;
    use chrono::{NaiveDate, NaiveTime};

    const EMPLOYEE: u64 = 5;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_time(NaiveTime::from_hms_opt(h, m, s).unwrap())
    }

    fn rejection(err: AttendanceError) -> Rejection {
        match err {
            AttendanceError::Rejected(r) => r,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    /// Serves a fixed snapshot from `find`, as a request that read before a
    /// concurrent write landed would see it.
    struct StaleReads {
        inner: MemoryAttendanceStore,
        snapshot: Option<AttendanceRecord>,
    }

    impl AttendanceStore for StaleReads {
        async fn find(
            &self,
            _employee_id: u64,
            _date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
            Ok(self.snapshot.clone())
        }

        async fn upsert_check_in(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
            self.inner.upsert_check_in(record).await
        }

        async fn upsert_check_out(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
            self.inner.upsert_check_out(record).await
        }
    }

    #[actix_web::test]
    async fn on_time_day_end_to_end() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy::default();

        let first = check_in(&store, &policy, EMPLOYEE, at(8, 5, 0)).await.unwrap();
        assert_eq!(first.status, StatusTag::OnTime);
        let stored = store.get(EMPLOYEE, day()).unwrap();
        assert_eq!(stored.status, AttendanceStatus::Present);
        assert!(!stored.is_late);

        let again = check_in(&store, &policy, EMPLOYEE, at(8, 10, 0)).await.unwrap_err();
        assert_eq!(rejection(again).kind(), RejectionKind::AlreadyDone);
        assert_eq!(
            store.get(EMPLOYEE, day()).unwrap().check_in_time,
            Some(at(8, 5, 0).time())
        );

        let out = check_out(&store, &policy, EMPLOYEE, at(17, 5, 0)).await.unwrap();
        assert_eq!(out.work_duration_hours, Some(9.0));
        assert_eq!(
            store.get(EMPLOYEE, day()).unwrap().check_out_time,
            Some(at(17, 5, 0).time())
        );
    }

    #[actix_web::test]
    async fn late_check_in_is_stored_as_late() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy {
            check_in_closes: clock(10, 0),
            ..AttendancePolicy::default()
        };

        let accepted = check_in(&store, &policy, EMPLOYEE, at(9, 20, 0)).await.unwrap();
        assert_eq!(accepted.status, StatusTag::Late);

        let stored = store.get(EMPLOYEE, day()).unwrap();
        assert_eq!(stored.status, AttendanceStatus::Late);
        assert!(stored.is_late);
    }

    #[actix_web::test]
    async fn rejected_check_in_creates_nothing() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy::default();

        let err = check_in(&store, &policy, EMPLOYEE, at(9, 20, 0)).await.unwrap_err();
        assert_eq!(rejection(err).kind(), RejectionKind::OutOfWindow);
        assert_eq!(store.len(), 0);
    }

    #[actix_web::test]
    async fn short_day_can_retry_later() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy::default();
        let mut record = AttendanceRecord::absent(EMPLOYEE, day());
        record.check_in_time = Some(at(9, 30, 0).time());
        record.status = AttendanceStatus::Late;
        record.is_late = true;
        store.insert(record.clone());

        let err = check_out(&store, &policy, EMPLOYEE, at(17, 0, 0)).await.unwrap_err();
        assert_eq!(rejection(err).kind(), RejectionKind::InsufficientDuration);
        assert_eq!(store.get(EMPLOYEE, day()), Some(record));

        let retry = check_out(&store, &policy, EMPLOYEE, at(17, 30, 0)).await.unwrap();
        assert_eq!(retry.work_duration_hours, Some(8.0));
        assert!(store.get(EMPLOYEE, day()).unwrap().is_checked_out());
    }

    #[actix_web::test]
    async fn check_out_without_any_record() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy::default();

        let err = check_out(&store, &policy, EMPLOYEE, at(17, 30, 0)).await.unwrap_err();
        assert_eq!(rejection(err), Rejection::NoRecordToday);
        assert_eq!(store.len(), 0);
    }

    #[actix_web::test]
    async fn concurrent_check_ins_have_one_winner() {
        let store = StaleReads {
            inner: MemoryAttendanceStore::default(),
            snapshot: None,
        };
        let policy = AttendancePolicy::default();

        let winner = check_in(&store, &policy, EMPLOYEE, at(8, 1, 0)).await;
        let loser = check_in(&store, &policy, EMPLOYEE, at(8, 2, 0)).await;

        assert!(winner.is_ok());
        assert_eq!(rejection(loser.unwrap_err()), Rejection::AlreadyCheckedIn);
        assert_eq!(store.inner.len(), 1);
        assert_eq!(
            store.inner.get(EMPLOYEE, day()).unwrap().check_in_time,
            Some(at(8, 1, 0).time())
        );
    }

    #[actix_web::test]
    async fn concurrent_check_outs_have_one_winner() {
        let mut record = AttendanceRecord::absent(EMPLOYEE, day());
        record.check_in_time = Some(at(8, 0, 0).time());
        record.status = AttendanceStatus::Present;
        let inner = MemoryAttendanceStore::default();
        inner.insert(record.clone());
        let store = StaleReads {
            inner,
            snapshot: Some(record),
        };
        let policy = AttendancePolicy::default();

        assert!(check_out(&store, &policy, EMPLOYEE, at(17, 0, 0)).await.is_ok());
        let loser = check_out(&store, &policy, EMPLOYEE, at(17, 1, 0)).await;
        assert_eq!(rejection(loser.unwrap_err()), Rejection::AlreadyCheckedOut);
        assert_eq!(
            store.inner.get(EMPLOYEE, day()).unwrap().check_out_time,
            Some(at(17, 0, 0).time())
        );
    }

    #[actix_web::test]
    async fn today_reports_what_is_possible() {
        let store = MemoryAttendanceStore::default();
        let policy = AttendancePolicy::default();

        let morning = today(&store, &policy, EMPLOYEE, at(8, 30, 0)).await.unwrap();
        assert!(morning.record.is_none());
        assert!(morning.can_check_in);
        assert!(!morning.can_check_out);

        check_in(&store, &policy, EMPLOYEE, at(8, 30, 0)).await.unwrap();
        let evening = today(&store, &policy, EMPLOYEE, at(17, 30, 0)).await.unwrap();
        assert!(evening.record.is_some());
        assert!(!evening.can_check_in);
        assert!(evening.can_check_out);
    }
}
