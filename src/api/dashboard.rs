use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::AppResult,
    model::{
        document::DocumentView,
        leave::Leave,
        leave_year::LeaveYear,
        permission::{Action, Module},
    },
    service::{branch, document, employee, leave, leave_year, settings},
};

/// Landing page payload. Sections the caller may not view are left out.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct Dashboard {
    pub company_name: String,
    #[schema(nullable = true)]
    pub current_leave_year: Option<LeaveYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_leave_today: Option<Vec<Leave>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_needing_attention: Option<Vec<DocumentView>>,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard sections visible to the caller", body = Dashboard),
        (status = 303, description = "No session, redirected to login")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(auth: AuthUser, pool: web::Data<PgPool>) -> AppResult<HttpResponse> {
    let pool = pool.get_ref();
    let scope = auth.scope();

    let mut view = Dashboard {
        company_name: settings::get(pool).await?.company_name,
        current_leave_year: leave_year::current(pool).await?,
        ..Default::default()
    };

    if auth.can(Module::Branches, Action::View) {
        view.branch_count = Some(branch::count(pool, &scope).await?);
    }
    if auth.can(Module::Employees, Action::View) {
        view.employee_count = Some(employee::count(pool, &scope).await?);
    }
    if auth.can(Module::Leaves, Action::View) {
        let today = Utc::now().date_naive();
        view.on_leave_today = Some(leave::on_leave(pool, &scope, today).await?);
    }
    if auth.can(Module::Documents, Action::View) {
        view.documents_needing_attention = Some(document::attention_needed(pool, &scope).await?);
    }

    Ok(HttpResponse::Ok().json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hidden_sections_are_omitted() {
        let view = Dashboard {
            company_name: "Acme".into(),
            branch_count: Some(2),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({ "company_name": "Acme", "current_leave_year": null, "branch_count": 2 })
        );
    }
}
