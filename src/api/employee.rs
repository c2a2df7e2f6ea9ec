use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::{
        employee::Employee,
        permission::{Action, Module},
    },
    service::{
        employee::{self, EmployeeInput, EmployeeQuery},
        leave,
    },
};

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("branch_id" = Option<i64>, Query, description = "Filter by branch"),
        ("search" = Option<String>, Query, description = "Search by name, code or job title")
    ),
    responses(
        (status = 200, description = "Paginated employee list", body = crate::service::employee::EmployeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Employees, Action::View)?;
    let page = employee::list(pool.get_ref(), &auth.scope(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Get an employee
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "error": "Employee not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Employees, Action::View)?;
    let employee = employee::get(pool.get_ref(), &auth.scope(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Create an employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = EmployeeInput,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate code")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
#[instrument(name = "create_employee", skip(auth, pool, payload), fields(user_id = auth.user_id()))]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<EmployeeInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Employees, Action::Create)?;
    payload.validate()?;
    auth.require_branch(payload.branch_id)?;

    let employee = employee::create(pool.get_ref(), &payload).await?;
    info!(employee_id = employee.id, "Employee created");
    Ok(HttpResponse::Created().json(employee))
}

/// Update an employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    request_body = EmployeeInput,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<EmployeeInput>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Employees, Action::Edit)?;
    payload.validate()?;

    let id = path.into_inner();
    // current and target branch must both be in scope
    employee::get(pool.get_ref(), &auth.scope(), id).await?;
    auth.require_branch(payload.branch_id)?;

    let employee = employee::update(pool.get_ref(), id, &payload).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete an employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Employees, Action::Delete)?;

    let id = path.into_inner();
    employee::get(pool.get_ref(), &auth.scope(), id).await?;
    employee::delete(pool.get_ref(), id).await?;
    info!(employee_id = id, user_id = auth.user_id(), "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the current leave year
    pub leave_year_id: Option<i64>,
}

/// Leave balance of an employee for a leave year
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/leave-balance",
    params(
        ("employee_id" = i64, Path, description = "Employee ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Leave balance", body = crate::service::leave::LeaveBalance),
        (status = 400, description = "No current leave year"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    query: web::Query<BalanceQuery>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Leaves, Action::View)?;
    let balance = leave::balance(
        pool.get_ref(),
        &auth.scope(),
        path.into_inner(),
        query.leave_year_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(balance))
}
