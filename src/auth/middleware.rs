use crate::auth::auth::{decode_bearer, fetch_account};
use crate::error::ApiError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use sqlx::MySqlPool;
use tracing::debug;

/// Rejects requests without a valid access token or whose account has been
/// deactivated, and stores the resolved
/// [`AuthUser`](crate::auth::auth::AuthUser) in the request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let claimed = match decode_bearer(req.request()) {
        Ok(user) => user,
        Err(e) => {
            debug!(path = %req.path(), reason = %e, "Rejected unauthenticated request");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    let resolved = match req.app_data::<Data<MySqlPool>>() {
        Some(pool) => match fetch_account(pool.get_ref(), claimed.user_id).await {
            Ok(account) => claimed.with_account(account),
            Err(e) => Err(ApiError::from(e)),
        },
        None => Err(ApiError::Internal),
    };

    let auth_user = match resolved {
        Ok(user) => user,
        Err(e) => {
            debug!(path = %req.path(), reason = %e, "Rejected request after account lookup");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
