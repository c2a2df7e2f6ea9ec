use actix_web::{HttpResponse, web};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::{
        permission::{Action, Module},
        settings::Settings,
    },
    service::settings::{self, SettingsInput},
};

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Application settings", body = Settings),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn get_settings(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::View)?;
    Ok(HttpResponse::Ok().json(settings::get(pool.get_ref()).await?))
}

#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = SettingsInput,
    responses(
        (status = 200, description = "Settings saved", body = Settings),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<SettingsInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Edit)?;
    payload.validate()?;

    let saved = settings::update(pool.get_ref(), &payload).await?;
    info!(user_id = auth.user_id(), "Settings updated");
    Ok(HttpResponse::Ok().json(saved))
}
