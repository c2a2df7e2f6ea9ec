use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::{
        leave::Leave,
        permission::{Action, Module},
    },
    service::leave::{self, ArchivedLeaveQuery, LeaveInput, LeaveQuery},
};

/* =========================
List leaves
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = crate::service::leave::LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leaves(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<LeaveQuery>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::View)?;
    let page = leave::list(pool.get_ref(), &auth.scope(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/* =========================
Leave details
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave")),
    responses(
        (status = 200, description = "Leave found", body = Leave),
        (status = 404, description = "Leave not found", body = Object, example = json!({
            "error": "Leave not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::View)?;
    let leave = leave::get(pool.get_ref(), &auth.scope(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Record a leave
========================= */
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body(
        content = LeaveInput,
        description = "Leave payload; duration is derived from the dates",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave recorded", body = Leave),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "error": "One or more fields are invalid",
            "details": { "end_date": ["Leave must fall inside its leave year"] }
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(
    name = "create_leave",
    skip(auth, pool, payload),
    fields(user_id = auth.user_id(), employee_id = payload.employee_id)
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<LeaveInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::Create)?;
    payload.validate()?;

    let leave = leave::create(pool.get_ref(), &auth.scope(), &payload).await?;
    info!(leave_id = leave.id, duration = leave.duration, "Leave recorded");
    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Edit a leave
========================= */
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave")),
    request_body = LeaveInput,
    responses(
        (status = 200, description = "Leave updated", body = Leave),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<LeaveInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::Edit)?;
    payload.validate()?;

    let leave = leave::update(pool.get_ref(), &auth.scope(), path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Delete a leave
========================= */
#[utoipa::path(
    delete,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave")),
    responses(
        (status = 200, description = "Leave deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Leave not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::Delete)?;

    let id = path.into_inner();
    leave::delete(pool.get_ref(), &auth.scope(), id).await?;
    info!(leave_id = id, user_id = auth.user_id(), "Leave deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/* =========================
Archived leaves
========================= */
#[utoipa::path(
    get,
    path = "/api/archived-leaves",
    params(
        ("employee_id" = Option<i64>, Query, description = "Filter by employee"),
        ("leave_year_id" = Option<i64>, Query, description = "Filter by leave year")
    ),
    responses(
        (status = 200, description = "Archived leaves", body = [crate::model::leave::ArchivedLeave]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_archived_leaves(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<ArchivedLeaveQuery>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::View)?;
    let leaves = leave::list_archived(pool.get_ref(), &auth.scope(), &query).await?;
    Ok(HttpResponse::Ok().json(leaves))
}
