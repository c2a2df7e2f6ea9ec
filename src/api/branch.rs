use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::permission::{Action, Module},
    service::branch::{self, BranchInput},
};

/// List branches in the caller's scope
#[utoipa::path(
    get,
    path = "/api/branches",
    responses(
        (status = 200, description = "Branches", body = [crate::model::branch::Branch]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn list_branches(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    auth.require(Module::Branches, Action::View)?;
    let branches = branch::list(pool.get_ref(), &auth.scope()).await?;
    Ok(HttpResponse::Ok().json(branches))
}

/// Get a branch
#[utoipa::path(
    get,
    path = "/api/branches/{branch_id}",
    params(("branch_id" = i64, Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Branch found", body = crate::model::branch::Branch),
        (status = 404, description = "Branch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn get_branch(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Branches, Action::View)?;
    let branch = branch::get(pool.get_ref(), &auth.scope(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(branch))
}

/// Create a branch
#[utoipa::path(
    post,
    path = "/api/branches",
    request_body = BranchInput,
    responses(
        (status = 201, description = "Branch created", body = crate::model::branch::Branch),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Name already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn create_branch(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<BranchInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Branches, Action::Create)?;
    payload.validate()?;

    let branch = branch::create(pool.get_ref(), &payload).await?;
    info!(branch_id = branch.id, user_id = auth.user_id(), "Branch created");
    Ok(HttpResponse::Created().json(branch))
}

/// Rename a branch
#[utoipa::path(
    put,
    path = "/api/branches/{branch_id}",
    params(("branch_id" = i64, Path, description = "Branch ID")),
    request_body = BranchInput,
    responses(
        (status = 200, description = "Branch updated", body = crate::model::branch::Branch),
        (status = 404, description = "Branch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn update_branch(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<BranchInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Branches, Action::Edit)?;
    payload.validate()?;

    let id = path.into_inner();
    if !auth.scope().includes(id) {
        return Err(AppError::NotFound("Branch"));
    }
    let branch = branch::update(pool.get_ref(), id, &payload).await?;
    Ok(HttpResponse::Ok().json(branch))
}

/// Delete a branch
#[utoipa::path(
    delete,
    path = "/api/branches/{branch_id}",
    params(("branch_id" = i64, Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Branch deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Branch not found"),
        (status = 409, description = "Branch still has employees")
    ),
    security(("bearer_auth" = [])),
    tag = "Branch"
)]
pub async fn delete_branch(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Branches, Action::Delete)?;

    let id = path.into_inner();
    if !auth.scope().includes(id) {
        return Err(AppError::NotFound("Branch"));
    }
    branch::delete(pool.get_ref(), id).await?;
    info!(branch_id = id, user_id = auth.user_id(), "Branch deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
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
    async fn branch_outside_scope_is_not_found() {
        let mut permissions = PermissionMap::new();
        for action in [Action::View, Action::Create, Action::Edit, Action::Delete] {
            permissions.grant(Module::Branches, action);
        }
        let session = Session {
            user_id: 7,
            email: "north@example.com".into(),
            role: Role::User,
            branch_ids: vec![1],
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
                .service(
                    web::resource("/api/branches/{id}")
                        .route(web::put().to(update_branch))
                        .route(web::delete().to(delete_branch)),
                ),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/api/branches/2")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({ "name": "North" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = actix_test::TestRequest::delete()
            .uri("/api/branches/2")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
