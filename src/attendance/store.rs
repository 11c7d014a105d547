use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

/// Per-day attendance persistence.
///
/// Writes are guarded by the state they expect so that two requests racing on
/// the same `(employee_id, date)` cannot both win: the loser gets `false`.
pub trait AttendanceStore {
    fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>, sqlx::Error>>;

    /// Creates the day row if needed, then writes the check-in fields only if
    /// no check-in is stored yet.
    fn upsert_check_in(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<bool, sqlx::Error>>;

    /// Writes `check_out_time` only if checked in and not yet checked out.
    fn upsert_check_out(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<bool, sqlx::Error>>;
}

const RECORD_COLUMNS: &str =
    "employee_id, date, check_in_time, check_out_time, status, is_late, notes";

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailyCounts {
    /// Present or late.
    #[schema(example = 12)]
    pub present: i64,
    #[schema(example = 2)]
    pub late: i64,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn daily_counts(&self, date: NaiveDate) -> Result<DailyCounts, sqlx::Error> {
        sqlx::query_as::<_, DailyCounts>(
            r#"
            SELECT
                CAST(COALESCE(SUM(status IN ('present', 'late')), 0) AS SIGNED) AS present,
                CAST(COALESCE(SUM(is_late), 0) AS SIGNED) AS late
            FROM attendance
            WHERE date = ?
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await
    }

    /// Newest first. `employee_id` / `date` narrow the listing when present.
    pub async fn history(
        &self,
        employee_id: Option<u64>,
        date: Option<NaiveDate>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<AttendanceRecord>, i64), sqlx::Error> {
        let mut conditions = Vec::new();
        if employee_id.is_some() {
            conditions.push("employee_id = ?");
        }
        if date.is_some() {
            conditions.push("date = ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM attendance {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(id) = employee_id {
            count_query = count_query.bind(id);
        }
        if let Some(d) = date {
            count_query = count_query.bind(d);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {} FROM attendance {} ORDER BY date DESC, check_in_time DESC LIMIT ? OFFSET ?",
            RECORD_COLUMNS, where_clause
        );
        let mut data_query = sqlx::query_as::<_, AttendanceRecord>(&data_sql);
        if let Some(id) = employee_id {
            data_query = data_query.bind(id);
        }
        if let Some(d) = date {
            data_query = data_query.bind(d);
        }
        let rows = data_query
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }
}

impl AttendanceStore for MySqlAttendanceStore {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_check_in(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        // Unique (employee_id, date) makes the insert a no-op for an existing day.
        sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status, is_late)
            VALUES (?, ?, 'absent', FALSE)
            ON DUPLICATE KEY UPDATE employee_id = employee_id
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, status = ?, is_late = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in_time IS NULL
            "#,
        )
        .bind(record.check_in_time)
        .bind(record.status.as_ref())
        .bind(record.is_late)
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_check_out(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in_time IS NOT NULL
            AND check_out_time IS NULL
            "#,
        )
        .bind(record.check_out_time)
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
