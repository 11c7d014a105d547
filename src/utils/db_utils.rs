use chrono::NaiveDate;
use serde_json::Value;
use sqlx::MySqlPool;

use crate::error::ApiError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn to_sql_value(value: &Value) -> Result<SqlValue, ApiError> {
    Ok(match value {
        Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => SqlValue::Date(d),
            Err(_) => SqlValue::String(s.clone()),
        },
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SqlValue::U64(u)
            } else if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(ApiError::Validation("Unsupported number".into()));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(ApiError::Validation("Unsupported JSON value type".into())),
    })
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may appear in `payload`; they are the only
/// identifiers interpolated into the statement.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: SqlValue,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::Validation("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(ApiError::Validation("No fields provided for update".into()));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ApiError::Validation(format!(
            "Field '{}' cannot be updated",
            unknown
        )));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);
    for value in obj.values() {
        values.push(to_sql_value(value)?);
    }
    values.push(id_value);

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// MySQL reports duplicate keys (and other integrity violations) as SQLSTATE 23000.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page (from 1), page size and row offset for `LIMIT ? OFFSET ?`.
/// The offset is widened so a huge page number cannot overflow.
pub fn page_window(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = u64::from(page - 1) * u64::from(per_page);
    (page, per_page, offset)
}

/// `?, ?, ?` for an `IN (...)` list.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
