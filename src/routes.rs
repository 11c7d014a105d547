use crate::{
    api::{attendance, dashboard, employee, profile},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter; a zero rate is treated as one request per minute
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today))),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/bulk must win over /employees/{code}
                    .service(
                        web::resource("/bulk").route(web::post().to(employee::bulk_action)),
                    )
                    // /employees/{code}
                    .service(
                        web::resource("/{code}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee)),
                    )
                    .service(
                        web::resource("/{code}/activate")
                            .route(web::post().to(employee::activate_employee)),
                    )
                    .service(
                        web::resource("/{code}/deactivate")
                            .route(web::post().to(employee::deactivate_employee)),
                    ),
            )
            .service(
                web::resource("/profile")
                    .route(web::get().to(profile::get_profile))
                    .route(web::put().to(profile::update_profile)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token
