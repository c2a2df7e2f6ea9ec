use crate::{
    api::{branch, dashboard, document, employee, leave, leave_year, settings, user},
    auth::handlers,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Per-peer limiter allowing `requests_per_min` requests a minute.
fn build_limiter(requests_per_min: u32) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
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
        .context("invalid rate limit configuration")?;
    Ok(Governor::new(&cfg))
}

/// Limiters are built once at startup and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::get().to(handlers::login_page))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes; the route guard wrapping the app handles sessions
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(limiters.protected.clone())
            .route("/session", web::get().to(handlers::current_session))
            .route("/navigation", web::get().to(handlers::navigation))
            .route("/permissions/check", web::get().to(handlers::check_permission))
            .route("/dashboard", web::get().to(dashboard::dashboard))
            .route("/me/password", web::put().to(user::change_own_password))
            .service(
                web::scope("/branches")
                    .service(
                        web::resource("")
                            .route(web::get().to(branch::list_branches))
                            .route(web::post().to(branch::create_branch)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(branch::get_branch))
                            .route(web::put().to(branch::update_branch))
                            .route(web::delete().to(branch::delete_branch)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/leave-balance")
                            .route(web::get().to(employee::leave_balance)),
                    ),
            )
            .service(
                web::scope("/leave-years")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_year::list_leave_years))
                            .route(web::post().to(leave_year::create_leave_year)),
                    )
                    // before /{id} so "current" is not taken for an id
                    .service(
                        web::resource("/current")
                            .route(web::get().to(leave_year::current_leave_year)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_year::get_leave_year))
                            .route(web::put().to(leave_year::update_leave_year))
                            .route(web::delete().to(leave_year::delete_leave_year)),
                    )
                    .service(
                        web::resource("/{id}/current")
                            .route(web::put().to(leave_year::set_current_leave_year)),
                    )
                    .service(
                        web::resource("/{id}/archive")
                            .route(web::post().to(leave_year::archive_leave_year)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::list_leaves))
                            .route(web::post().to(leave::create_leave)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::put().to(leave::update_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    ),
            )
            .route("/archived-leaves", web::get().to(leave::list_archived_leaves))
            .service(
                web::scope("/documents")
                    .service(web::resource("").route(web::get().to(document::list_documents)))
                    .service(
                        web::resource("/expiring")
                            .route(web::get().to(document::expiring_documents)),
                    )
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(document::get_employee_documents))
                            .route(web::put().to(document::save_employee_documents)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(document::delete_document)),
                    ),
            )
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings::get_settings))
                    .route(web::put().to(settings::update_settings)),
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
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiters_build_from_defaults() {
        assert!(Limiters::from_config(&crate::config::test_config()).is_ok());
    }

    #[test]
    fn zero_rate_still_builds() {
        assert!(build_limiter(0).is_ok());
    }
}
