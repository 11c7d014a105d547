use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::model::role::Role;
use crate::models::{Claims, TokenType};

/// Identity carried inside every token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub username: String,
    pub employee_id: Option<u64>,
    pub role: Option<Role>,
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
        role: subject.role,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    issue(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
