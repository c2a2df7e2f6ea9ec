use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::permission::{Action, Module},
    service::document::{self, DocumentInput, DocumentQuery},
};

/// Document expiry records with derived status
#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Records, most urgent first", body = [crate::model::document::DocumentView]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn list_documents(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<DocumentQuery>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Documents, Action::View)?;
    let views = document::list(pool.get_ref(), &auth.scope(), &query).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Expired or soon-to-expire records
#[utoipa::path(
    get,
    path = "/api/documents/expiring",
    responses(
        (status = 200, description = "Records needing attention", body = [crate::model::document::DocumentView])
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn expiring_documents(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    auth.require(Module::Documents, Action::View)?;
    let views = document::attention_needed(pool.get_ref(), &auth.scope()).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Document record of one employee
#[utoipa::path(
    get,
    path = "/api/documents/employee/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Document record", body = crate::model::document::DocumentView),
        (status = 404, description = "No record for this employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn get_employee_documents(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Documents, Action::View)?;
    let view = document::get_for_employee(pool.get_ref(), &auth.scope(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Create or replace the document record of one employee
#[utoipa::path(
    put,
    path = "/api/documents/employee/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    request_body = DocumentInput,
    responses(
        (status = 200, description = "Document record saved", body = crate::model::document::DocumentView),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn save_employee_documents(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    payload: web::Json<DocumentInput>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[
        (Module::Documents, Action::Create),
        (Module::Documents, Action::Edit),
    ])?;
    payload.validate()?;

    let employee_id = path.into_inner();
    let view = document::upsert(pool.get_ref(), &auth.scope(), employee_id, &payload).await?;
    info!(employee_id, status = %view.status, "Document record saved");
    Ok(HttpResponse::Ok().json(view))
}

/// Delete a document record
#[utoipa::path(
    delete,
    path = "/api/documents/{document_id}",
    params(("document_id" = i64, Path, description = "Document record ID")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn delete_document(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    auth.require(Module::Documents, Action::Delete)?;
    document::delete(pool.get_ref(), &auth.scope(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
