use serde::{Deserialize, Serialize};

/// Login account. Role and department live on the linked employee profile.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}
