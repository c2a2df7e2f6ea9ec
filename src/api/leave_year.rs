use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::permission::{Action, Module},
    service::leave_year::{self, LeaveYearInput},
};

/// Leave years are configured under settings but read by anyone recording leave.
fn require_view(auth: &AuthUser) -> AppResult<()> {
    auth.require_any(&[
        (Module::Leaves, Action::View),
        (Module::Settings, Action::View),
    ])
}

#[utoipa::path(
    get,
    path = "/api/leave-years",
    responses(
        (status = 200, description = "Leave years, newest first", body = [crate::model::leave_year::LeaveYear]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn list_leave_years(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    require_view(&auth)?;
    Ok(HttpResponse::Ok().json(leave_year::list(pool.get_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/leave-years/current",
    responses(
        (status = 200, description = "Current leave year", body = crate::model::leave_year::LeaveYear),
        (status = 404, description = "No current leave year")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn current_leave_year(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    require_view(&auth)?;
    let year = leave_year::current(pool.get_ref())
        .await?
        .ok_or(AppError::NotFound("Current leave year"))?;
    Ok(HttpResponse::Ok().json(year))
}

#[utoipa::path(
    get,
    path = "/api/leave-years/{leave_year_id}",
    params(("leave_year_id" = i64, Path, description = "Leave year ID")),
    responses(
        (status = 200, description = "Leave year", body = crate::model::leave_year::LeaveYear),
        (status = 404, description = "Leave year not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn get_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_view(&auth)?;
    Ok(HttpResponse::Ok().json(leave_year::get(pool.get_ref(), path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/leave-years",
    request_body = LeaveYearInput,
    responses(
        (status = 201, description = "Leave year created", body = crate::model::leave_year::LeaveYear),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Name already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn create_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<LeaveYearInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Create)?;
    payload.validate()?;

    let year = leave_year::create(pool.get_ref(), &payload).await?;
    info!(leave_year_id = year.id, is_current = year.is_current, "Leave year created");
    Ok(HttpResponse::Created().json(year))
}

#[utoipa::path(
    put,
    path = "/api/leave-years/{leave_year_id}",
    params(("leave_year_id" = i64, Path, description = "Leave year ID")),
    request_body = LeaveYearInput,
    responses(
        (status = 200, description = "Leave year updated", body = crate::model::leave_year::LeaveYear),
        (status = 400, description = "Validation failed or leaves fall outside the new range"),
        (status = 404, description = "Leave year not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn update_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<LeaveYearInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Edit)?;
    payload.validate()?;

    let year = leave_year::update(pool.get_ref(), path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(year))
}

#[utoipa::path(
    put,
    path = "/api/leave-years/{leave_year_id}/current",
    params(("leave_year_id" = i64, Path, description = "Leave year ID")),
    responses(
        (status = 200, description = "Leave year is now current", body = crate::model::leave_year::LeaveYear),
        (status = 404, description = "Leave year not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn set_current_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Edit)?;

    let year = leave_year::set_current(pool.get_ref(), path.into_inner()).await?;
    info!(leave_year_id = year.id, "Current leave year changed");
    Ok(HttpResponse::Ok().json(year))
}

#[utoipa::path(
    delete,
    path = "/api/leave-years/{leave_year_id}",
    params(("leave_year_id" = i64, Path, description = "Leave year ID")),
    responses(
        (status = 200, description = "Leave year deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Leave year not found"),
        (status = 409, description = "Leave year still has leaves or archived leaves")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn delete_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Delete)?;
    leave_year::delete(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[utoipa::path(
    post,
    path = "/api/leave-years/{leave_year_id}/archive",
    params(("leave_year_id" = i64, Path, description = "Leave year ID")),
    responses(
        (status = 200, description = "Leaves moved to the archive", body = Object, example = json!({
            "archived": 42
        })),
        (status = 404, description = "Leave year not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave year"
)]
pub async fn archive_leave_year(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Settings, Action::Edit)?;
    let archived = leave_year::archive(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "archived": archived })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{jwt::issue_session_token, session::Session},
        config::test_config,
        model::{permission::PermissionMap, role::Role},
    };
    use actix_web::{App, http::StatusCode, test as actix_test};
    use sqlx::postgres::PgPoolOptions;

    #[actix_web::test]
    async fn creating_a_year_needs_settings_create() {
        let mut permissions = PermissionMap::new();
        permissions.grant(Module::Settings, Action::View);
        permissions.grant(Module::Settings, Action::Edit);
        let session = Session {
            user_id: 3,
            email: "hr@example.com".into(),
            role: Role::User,
            branch_ids: vec![],
            permissions,
        };
        let config = test_config();
        let (token, _) = issue_session_token(&session, &config.jwt_secret, 600).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/leavedesk")
            .unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .route("/api/leave-years", web::post().to(create_leave_year)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/leave-years")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({
                "name": "2027",
                "start_date": "2027-01-01",
                "end_date": "2027-12-31"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
