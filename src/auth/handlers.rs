use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::{ApiError, ApiResult},
    model::{role::Role, user::User},
    models::{LoginReqDto, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Role of the employee linked to a user, if there is one.
async fn linked_role(pool: &MySqlPool, employee_id: Option<u64>) -> Result<Option<Role>, sqlx::Error> {
    let Some(employee_id) = employee_id else {
        return Ok(None);
    };

    let role = sqlx::query_scalar::<_, String>("SELECT role FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;

    Ok(role.and_then(|r| r.parse().ok()))
}

/// Issue an access/refresh pair and persist the refresh token id.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    subject: &TokenSubject,
) -> ApiResult<LoginResponse> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign access token");
                ApiError::Internal
            },
        )?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ApiError::Internal
            },
        )?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::Validation("Username or password required".into()));
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let invalid = || {
        ApiError::Unauthorized(
            "Invalid username or password. Please check your credentials and try again.".into(),
        )
    };

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(invalid());
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    if !db_user.is_active {
        warn!(user_id = db_user.id, "Login refused for deactivated account");
        return Err(ApiError::Forbidden(
            "Your account has been deactivated. Please contact an administrator.".into(),
        ));
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        employee_id: db_user.employee_id,
        role: linked_role(pool.get_ref(), db_user.employee_id).await?,
    };

    let tokens = issue_tokens(pool.get_ref(), &config, &subject).await?;

    // not fatal for the login itself
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, role = ?subject.role, "Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Refresh token invalid, revoked or account deactivated")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let unauthorized = || ApiError::Unauthorized("Invalid token".into());

    let token = bearer(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    // Revoke in one statement so a token can only be rotated once.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ?
        AND revoked = FALSE
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        warn!(user_id = claims.user_id, "Refresh with unknown or revoked token");
        return Err(unauthorized());
    }

    // Role or activation may have changed since the last login.
    let db_user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, employee_id, is_active FROM users WHERE id = ?",
    )
    .bind(claims.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .filter(|u| u.is_active)
    .ok_or_else(unauthorized)?;

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username,
        employee_id: db_user.employee_id,
        role: linked_role(pool.get_ref(), db_user.employee_id).await?,
    };

    let tokens = issue_tokens(pool.get_ref(), &config, &subject).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Logout (revokes the refresh token)
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent: succeed even if the token never existed
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    info!(user_id = claims.user_id, "Logged out");
    HttpResponse::NoContent().finish()
}
