use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    /// Role of the linked employee, if any
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
