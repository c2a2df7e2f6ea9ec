use actix_web::{
    Error, HttpMessage, HttpRequest, HttpResponse,
    body::{BoxBody, MessageBody},
    cookie::Cookie,
    dev::{ServiceRequest, ServiceResponse},
    http::header::LOCATION,
    middleware::Next,
    web::Data,
};
use tracing::debug;

use crate::{
    auth::{
        jwt::verify_token,
        revocation,
        session::{Claims, Session},
    },
    config::Config,
};

pub const AUTH_COOKIE: &str = "auth-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToLogin,
    RedirectToDashboard,
}

#[derive(Debug, Clone)]
pub struct GuardRules {
    pub protected_prefixes: Vec<String>,
    pub login_path: String,
    pub dashboard_path: String,
}

impl GuardRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            protected_prefixes: config.protected_prefixes.clone(),
            login_path: config.login_path.clone(),
            dashboard_path: config.dashboard_path.clone(),
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| matches_prefix(path, prefix))
    }

    pub fn decide(&self, path: &str, authenticated: bool) -> GuardDecision {
        let path = normalize(path);
        if path == normalize(&self.login_path) {
            return if authenticated {
                GuardDecision::RedirectToDashboard
            } else {
                GuardDecision::Proceed
            };
        }
        if !authenticated && self.is_protected(path) {
            return GuardDecision::RedirectToLogin;
        }
        GuardDecision::Proceed
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// `/api` covers `/api` and `/api/...` but not `/api-doc`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let path = normalize(path);
    let prefix = normalize(prefix);
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Bearer header first, then the session cookie.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()))
}

/// A token counts only when it verifies and has not been revoked.
pub fn authenticate(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = extract_token(req)?;
    match verify_token(&token, &config.jwt_secret) {
        Ok(claims) if !revocation::is_revoked(&claims.jti) => Some(claims),
        Ok(_) => {
            debug!("Revoked session token presented");
            None
        }
        Err(e) => {
            debug!(error = %e, "Unusable session token presented");
            None
        }
    }
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

fn redirect(to: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, to.to_string()))
        .finish()
}

pub async fn route_guard(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let had_token = extract_token(req.request()).is_some();
    let claims = authenticate(req.request(), &config);
    let rules = GuardRules::from_config(&config);

    match rules.decide(req.path(), claims.is_some()) {
        GuardDecision::Proceed => {
            if let Some(claims) = claims {
                req.extensions_mut().insert::<Session>(claims.session.clone());
                req.extensions_mut().insert::<Claims>(claims);
            }
            let res = next.call(req).await?;
            Ok(res.map_into_boxed_body())
        }
        GuardDecision::RedirectToLogin => {
            debug!(path = %req.path(), "Unauthenticated request redirected to login");
            let mut resp = redirect(&config.login_path);
            if had_token {
                resp.add_cookie(&removal_cookie())?;
            }
            Ok(req.into_response(resp))
        }
        GuardDecision::RedirectToDashboard => {
            Ok(req.into_response(redirect(&config.dashboard_path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::issue_session_token,
        config::test_config,
        model::{permission::PermissionMap, role::Role},
    };
    use actix_web::{App, http::StatusCode, middleware::from_fn, test as actix_test, web};

    fn rules() -> GuardRules {
        GuardRules {
            protected_prefixes: vec!["/api".into(), "/reports/".into()],
            login_path: "/auth/login".into(),
            dashboard_path: "/api/dashboard".into(),
        }
    }

    #[test]
    fn protected_paths_need_a_session() {
        let rules = rules();
        assert_eq!(rules.decide("/api/employees", false), GuardDecision::RedirectToLogin);
        assert_eq!(rules.decide("/api", false), GuardDecision::RedirectToLogin);
        assert_eq!(rules.decide("/reports/2026", false), GuardDecision::RedirectToLogin);
        assert_eq!(rules.decide("/api/employees", true), GuardDecision::Proceed);
    }

    #[test]
    fn prefix_match_is_segment_aware() {
        let rules = rules();
        assert_eq!(rules.decide("/api-doc/openapi.json", false), GuardDecision::Proceed);
        assert_eq!(rules.decide("/apis", false), GuardDecision::Proceed);
        assert_eq!(rules.decide("/", false), GuardDecision::Proceed);
    }

    #[test]
    fn login_path_bounces_signed_in_users() {
        let rules = rules();
        assert_eq!(rules.decide("/auth/login", true), GuardDecision::RedirectToDashboard);
        assert_eq!(rules.decide("/auth/login/", true), GuardDecision::RedirectToDashboard);
        assert_eq!(rules.decide("/auth/login", false), GuardDecision::Proceed);
        assert_eq!(rules.decide("/auth/logout", true), GuardDecision::Proceed);
    }

    #[test]
    fn login_path_inside_protected_prefix_stays_reachable() {
        let rules = GuardRules {
            protected_prefixes: vec!["/".into()],
            login_path: "/login".into(),
            dashboard_path: "/dashboard".into(),
        };
        assert_eq!(rules.decide("/login", false), GuardDecision::Proceed);
        assert_eq!(rules.decide("/dashboard", false), GuardDecision::RedirectToLogin);
    }

    fn token(config: &Config) -> String {
        let session = Session {
            user_id: 1,
            email: "a@example.com".into(),
            role: Role::User,
            branch_ids: vec![],
            permissions: PermissionMap::defaults_for(Role::User),
        };
        issue_session_token(&session, &config.jwt_secret, 60).unwrap().0
    }

    async fn echo_email(req: HttpRequest) -> HttpResponse {
        match req.extensions().get::<Session>() {
            Some(session) => HttpResponse::Ok().body(session.email.clone()),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    #[actix_web::test]
    async fn middleware_redirects_and_attaches_session() {
        let config = test_config();
        let token = token(&config);
        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(config))
                .wrap(from_fn(route_guard))
                .route("/api/dashboard", web::get().to(echo_email))
                .route("/auth/login", web::get().to(echo_email)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/dashboard").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/auth/login");

        let req = actix_test::TestRequest::get()
            .uri("/api/dashboard")
            .cookie(Cookie::new(AUTH_COOKIE, token.clone()))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "a@example.com");

        let req = actix_test::TestRequest::get()
            .uri("/auth/login")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/api/dashboard");
    }

    #[actix_web::test]
    async fn forged_cookie_is_treated_as_signed_out() {
        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(test_config()))
                .wrap(from_fn(route_guard))
                .route("/auth/login", web::get().to(echo_email))
                .route("/api/dashboard", web::get().to(echo_email)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/auth/login")
            .cookie(Cookie::new(AUTH_COOKIE, "forged"))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "anonymous");

        let req = actix_test::TestRequest::get()
            .uri("/api/dashboard")
            .cookie(Cookie::new(AUTH_COOKIE, "forged"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert!(res.response().cookies().any(|c| c.name() == AUTH_COOKIE));
    }

    #[actix_web::test]
    async fn revoked_token_is_rejected() {
        let config = test_config();
        let token = token(&config);
        let claims = verify_token(&token, &config.jwt_secret).unwrap();
        revocation::revoke(&claims.jti, claims.exp).await;

        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(config))
                .wrap(from_fn(route_guard))
                .route("/api/dashboard", web::get().to(echo_email)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/dashboard")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
    }
}
