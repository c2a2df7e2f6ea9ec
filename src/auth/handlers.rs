use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, SameSite, time::Duration},
    web,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{
        auth::AuthUser,
        guard::{AUTH_COOKIE, authenticate, removal_cookie},
        jwt::issue_session_token,
        password::verify_password,
        permission::{can_named, visible_modules},
        revocation,
        session::Session,
    },
    config::Config,
    error::{AppError, AppResult},
    service::user,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub session: Session,
}

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::seconds(config.session_ttl as i64))
        .finish()
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the token is also set as the auth-token cookie", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let Some(db_user) = user::find_by_email(pool.get_ref(), &payload.email).await? else {
        info!("Invalid credentials: user not found");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &db_user.password_hash) {
        info!(user_id = db_user.id, "Invalid credentials: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let branch_ids = user::branch_ids(pool.get_ref(), db_user.id).await?;
    let session = Session::initialize(&db_user, branch_ids);
    debug!(
        user_id = session.user_id,
        role = %session.role,
        explicit_permissions = db_user.permissions.is_some(),
        "Session initialized"
    );

    let (token, claims) = issue_session_token(&session, &config.jwt_secret, config.session_ttl)?;
    info!(user_id = session.user_id, jti = %claims.jti, "Login successful");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone(), &config))
        .json(LoginResponse { token, session }))
}

/// Where the route guard sends callers without a session.
#[utoipa::path(
    get,
    path = "/auth/login",
    responses((status = 200, description = "Login landing payload", body = Object, example = json!({
        "message": "Sign in required",
        "login": "POST /auth/login"
    }))),
    tag = "Auth"
)]
pub async fn login_page() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Sign in required",
        "login": "POST /auth/login"
    }))
}

/// Revokes the presented token, if any. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out")),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, config: web::Data<Config>) -> AppResult<HttpResponse> {
    if let Some(claims) = authenticate(&req, &config) {
        revocation::revoke(&claims.jti, claims.exp).await;
        info!(user_id = claims.session.user_id, jti = %claims.jti, "Session revoked");
    }

    let mut resp = HttpResponse::NoContent().finish();
    resp.add_cookie(&removal_cookie())
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(resp)
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Current session", body = Session)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn current_session(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth.session)
}

/// Modules the caller may see, with the actions allowed on each.
#[utoipa::path(
    get,
    path = "/api/navigation",
    responses((status = 200, description = "Visible modules in menu order", body = [crate::auth::permission::ModuleAccess])),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn navigation(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(visible_modules(Some(&auth.session)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PermissionCheckQuery {
    /// Module name, e.g. `leaves`
    pub module: String,
    /// Action name, e.g. `create`
    pub action: String,
}

#[utoipa::path(
    get,
    path = "/api/permissions/check",
    params(PermissionCheckQuery),
    responses((status = 200, description = "Evaluator decision", body = Object, example = json!({
        "module": "leaves",
        "action": "create",
        "allowed": true
    }))),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn check_permission(
    auth: Option<AuthUser>,
    query: web::Query<PermissionCheckQuery>,
) -> HttpResponse {
    let session = auth.as_ref().map(|a| &a.session);
    HttpResponse::Ok().json(json!({
        "module": query.module,
        "action": query.action,
        "allowed": can_named(session, &query.module, &query.action),
    }))
}
