use crate::attendance::rules::Rejection;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::{auth::jwt::verify_token, models::Claims, models::TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use sqlx::{FromRow, MySqlPool};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub role: Option<Role>,
}

/// The employee behind an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub employee_id: u64,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            employee_id: claims.employee_id,
            role: claims.role,
        }
    }
}

pub(crate) fn decode_bearer(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let config = req.app_data::<Data<Config>>().ok_or(ApiError::Internal)?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;
    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Invalid token".into()));
    }

    Ok(claims.into())
}

/// Current state of a login account and its employee, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub user_active: bool,
    pub employee_id: Option<u64>,
    pub role: Option<String>,
    pub employee_active: Option<bool>,
}

pub async fn fetch_account(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<AccountRow>, sqlx::Error> {
    sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT
            u.is_active AS user_active,
            e.id AS employee_id,
            e.role AS role,
            e.is_active AS employee_active
        FROM users u
        LEFT JOIN employees e ON e.id = u.employee_id
        WHERE u.id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Extracted only from what `auth_middleware` stored, so every handler sees
/// an identity that was checked against the database on this request.
impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ApiError::Unauthorized("Missing token".into())),
        )
    }
}

impl AuthUser {
    /// Replace token claims with the stored account state. Employee link and
    /// role may have changed since the token was issued.
    pub fn with_account(self, account: Option<AccountRow>) -> Result<AuthUser, ApiError> {
        let account =
            account.ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))?;

        if !account.user_active || account.employee_active == Some(false) {
            return Err(ApiError::Forbidden(
                "Your account has been deactivated. Please contact an administrator.".into(),
            ));
        }

        Ok(AuthUser {
            employee_id: account.employee_id,
            role: account.role.and_then(|r| r.parse().ok()),
            ..self
        })
    }

    /// Resolve the caller's employee profile, or `ProfileMissing`.
    pub fn profile(&self) -> Result<Profile, ApiError> {
        match (self.employee_id, self.role) {
            (Some(employee_id), Some(role)) => Ok(Profile { employee_id, role }),
            _ => Err(Rejection::ProfileMissing.into()),
        }
    }

    /// Managers and HR admins only.
    pub fn require_management(&self) -> Result<Profile, ApiError> {
        let profile = self.profile()?;
        if profile.role.can_manage_employees() {
            Ok(profile)
        } else {
            Err(ApiError::Forbidden(
                "You don't have permission to manage employees.".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    fn user(role: Option<Role>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            employee_id: role.map(|_| 10),
            role,
        }
    }

    #[test]
    fn profile_requires_linked_employee() {
        assert!(matches!(
            user(None).profile(),
            Err(ApiError::Rejected(Rejection::ProfileMissing))
        ));
        assert_eq!(
            user(Some(Role::Staff)).profile().unwrap(),
            Profile {
                employee_id: 10,
                role: Role::Staff
            }
        );
    }

    #[test]
    fn management_is_manager_or_hr_admin() {
        assert!(user(Some(Role::Manager)).require_management().is_ok());
        assert!(user(Some(Role::HrAdmin)).require_management().is_ok());
        assert!(matches!(
            user(Some(Role::Staff)).require_management(),
            Err(ApiError::Forbidden(_))
        ));
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 4,
            username: "mgr".into(),
            employee_id: Some(2),
            role: Some(Role::Manager),
        }
    }

    #[actix_web::test]
    async fn decodes_access_token() {
        let config = Config::for_tests();
        let token = generate_access_token(&subject(), &config.jwt_secret, 60).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .app_data(Data::new(config))
            .to_http_request();

        let auth = decode_bearer(&req).unwrap();
        assert_eq!(auth.user_id, 4);
        assert_eq!(auth.role, Some(Role::Manager));
    }

    #[actix_web::test]
    async fn refresh_token_is_not_an_access_token() {
        let config = Config::for_tests();
        let (token, _) = generate_refresh_token(&subject(), &config.jwt_secret, 60).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .app_data(Data::new(config))
            .to_http_request();

        assert!(matches!(decode_bearer(&req), Err(ApiError::Unauthorized(_))));
    }

    #[actix_web::test]
    async fn extractor_needs_a_verified_identity() {
        let config = Config::for_tests();
        let token = generate_access_token(&subject(), &config.jwt_secret, 60).unwrap();

        // A bearer token alone is not enough without the middleware's check.
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .app_data(Data::new(config))
            .to_http_request();
        assert!(matches!(
            AuthUser::extract(&req).await,
            Err(ApiError::Unauthorized(_))
        ));

        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(user(Some(Role::Staff)));
        assert_eq!(AuthUser::extract(&req).await.unwrap().role, Some(Role::Staff));
    }

    fn account(user_active: bool, employee: Option<(u64, &str, bool)>) -> Option<AccountRow> {
        Some(AccountRow {
            user_active,
            employee_id: employee.map(|e| e.0),
            role: employee.map(|e| e.1.to_string()),
            employee_active: employee.map(|e| e.2),
        })
    }

    #[test]
    fn stored_role_overrides_token_claims() {
        let demoted = user(Some(Role::Manager))
            .with_account(account(true, Some((10, "staff", true))))
            .unwrap();

        assert_eq!(demoted.role, Some(Role::Staff));
        assert!(matches!(
            demoted.require_management(),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn deactivated_accounts_are_forbidden() {
        for stored in [
            account(false, Some((10, "staff", true))),
            account(true, Some((10, "staff", false))),
            account(false, None),
        ] {
            assert!(matches!(
                user(Some(Role::Staff)).with_account(stored),
                Err(ApiError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn deleted_account_is_unauthorized() {
        assert!(matches!(
            user(Some(Role::Staff)).with_account(None),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn unlinked_account_has_no_profile() {
        let unlinked = user(Some(Role::HrAdmin))
            .with_account(account(true, None))
            .unwrap();

        assert_eq!(unlinked.employee_id, None);
        assert!(matches!(
            unlinked.profile(),
            Err(ApiError::Rejected(Rejection::ProfileMissing))
        ));
    }
}
