use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        permission::{Action, Module},
        role::Role,
        user::User,
    },
    service::user::{self, ChangePasswordInput, CreateUserInput, UpdateUserInput},
};

/// Only admins hand out the admin role or rewrite their own access.
fn check_access_grant(auth: &AuthUser, target: Option<i64>, role: Role) -> AppResult<()> {
    if role.is_admin() {
        auth.require_admin()?;
    }
    if target == Some(auth.user_id()) && !auth.session.is_admin() {
        return Err(AppError::forbidden("You cannot change your own access"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users with their branch scope", body = [User]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    auth.require(Module::Users, Action::View)?;
    Ok(HttpResponse::Ok().json(user::list(pool.get_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Users, Action::View)?;
    Ok(HttpResponse::Ok().json(user::get(pool.get_ref(), path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Only admins create admins"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
#[instrument(name = "create_user", skip(auth, pool, payload), fields(email = %payload.email))]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateUserInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Users, Action::Create)?;
    check_access_grant(&auth, None, payload.role)?;
    payload.validate()?;

    let created = user::create(pool.get_ref(), &payload).await?;
    info!(user_id = created.id, role = %created.role, "User created");
    Ok(HttpResponse::Created().json(created))
}

/// Role, branch scope and permission map; a null map resets to role defaults.
/// Takes effect at the user's next login.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body = UpdateUserInput,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Granting admin or editing your own access requires admin"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Unknown branch in branch scope")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<UpdateUserInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Users, Action::Edit)?;

    let id = path.into_inner();
    check_access_grant(&auth, Some(id), payload.role)?;
    let updated = user::update(pool.get_ref(), id, &payload).await?;
    info!(user_id = updated.id, by = auth.user_id(), "User updated");
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Users, Action::Delete)?;

    let id = path.into_inner();
    if id == auth.user_id() {
        return Err(AppError::field("id", "self_delete", "You cannot delete your own account"));
    }

    user::delete(pool.get_ref(), id).await?;
    info!(user_id = id, by = auth.user_id(), "User deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Change the caller's own password
#[utoipa::path(
    put,
    path = "/api/me/password",
    request_body = ChangePasswordInput,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Validation failed or wrong current password")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn change_own_password(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<ChangePasswordInput>,
) -> AppResult<HttpResponse> {
    payload.validate()?;
    user::change_password(pool.get_ref(), auth.user_id(), &payload).await?;
    info!(user_id = auth.user_id(), "Password changed");
    Ok(HttpResponse::NoContent().finish())
}
