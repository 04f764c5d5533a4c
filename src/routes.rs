use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, middleware::from_fn, web};
use anyhow::anyhow;
use serde_json::json;

use crate::{
    api::{attendance, department, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters. Built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.route("/health", web::get().to(health));
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(limiters.login.clone())
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(web::resource("/checkin").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/checkout").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/report").route(web::get().to(attendance::report)))
                    .service(
                        web::resource("/user/{user_id}")
                            .route(web::get().to(attendance::user_attendance)),
                    )
                    .service(
                        web::resource("/department/{department_id}")
                            .route(web::get().to(attendance::department_attendance)),
                    ),
            )
            .service(
                web::scope("/departments")
                    // /departments
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    // /departments/barcode/{value}
                    .service(
                        web::resource("/barcode/{value}")
                            .route(web::get().to(department::find_badge)),
                    )
                    // /departments/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(department::get_department))
                            .route(web::patch().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    )
                    // /departments/{id}/barcode
                    .service(
                        web::resource("/{id}/barcode")
                            .route(web::post().to(department::regenerate_badge)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::get().to(user::list_users))
                            .route(web::post().to(user::create_user)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            ),
    );
}
