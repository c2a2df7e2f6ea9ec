use crate::api::dashboard::Dashboard;
use crate::auth::handlers::{LoginRequest, LoginResponse};
use crate::auth::permission::ModuleAccess;
use crate::auth::session::Session;
use crate::model::{
    branch::Branch,
    document::{DocumentEntry, DocumentKind, DocumentRecord, DocumentStatus, DocumentView},
    employee::Employee,
    leave::{ArchivedLeave, Leave, LeaveType},
    leave_year::LeaveYear,
    permission::{Action, Module},
    role::Role,
    settings::Settings,
    user::User,
};
use crate::service::{
    branch::BranchInput,
    document::DocumentInput,
    employee::{EmployeeInput, EmployeeListResponse},
    leave::{LeaveBalance, LeaveInput, LeaveListResponse},
    leave_year::LeaveYearInput,
    settings::SettingsInput,
    user::{ChangePasswordInput, CreateUserInput, UpdateUserInput},
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leavedesk API",
        version = "1.0.0",
        description = r#"
## Leave and document tracking

Back office for a multi-branch company: branches, employees, leave years,
leaves with balances and archives, employee document expiries and users.

### Security
Sign in with `POST /auth/login`. The returned token is accepted as a
**Bearer** token and is also set as the `auth-token` cookie. Requests to
`/api` without a valid session are redirected (303) to the login page.

Every action is checked against the caller's permission map. Admins may do
everything; standard users see only the branches in their branch scope.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::login_page,
        crate::auth::handlers::logout,
        crate::auth::handlers::current_session,
        crate::auth::handlers::navigation,
        crate::auth::handlers::check_permission,

        crate::api::dashboard::dashboard,

        crate::api::branch::list_branches,
        crate::api::branch::get_branch,
        crate::api::branch::create_branch,
        crate::api::branch::update_branch,
        crate::api::branch::delete_branch,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::leave_balance,

        crate::api::leave_year::list_leave_years,
        crate::api::leave_year::current_leave_year,
        crate::api::leave_year::get_leave_year,
        crate::api::leave_year::create_leave_year,
        crate::api::leave_year::update_leave_year,
        crate::api::leave_year::set_current_leave_year,
        crate::api::leave_year::delete_leave_year,
        crate::api::leave_year::archive_leave_year,

        crate::api::leave::list_leaves,
        crate::api::leave::get_leave,
        crate::api::leave::create_leave,
        crate::api::leave::update_leave,
        crate::api::leave::delete_leave,
        crate::api::leave::list_archived_leaves,

        crate::api::document::list_documents,
        crate::api::document::expiring_documents,
        crate::api::document::get_employee_documents,
        crate::api::document::save_employee_documents,
        crate::api::document::delete_document,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::create_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,
        crate::api::user::change_own_password
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            Session,
            ModuleAccess,
            Module,
            Action,
            Role,
            Dashboard,
            Branch,
            BranchInput,
            Employee,
            EmployeeInput,
            EmployeeListResponse,
            LeaveYear,
            LeaveYearInput,
            Leave,
            LeaveType,
            LeaveInput,
            LeaveListResponse,
            LeaveBalance,
            ArchivedLeave,
            DocumentRecord,
            DocumentKind,
            DocumentStatus,
            DocumentEntry,
            DocumentView,
            DocumentInput,
            Settings,
            SettingsInput,
            User,
            CreateUserInput,
            UpdateUserInput,
            ChangePasswordInput
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign in, sign out and session introspection"),
        (name = "Dashboard", description = "Landing page"),
        (name = "Branch", description = "Branch management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave year", description = "Leave year configuration"),
        (name = "Leave", description = "Leave records, balances and archive"),
        (name = "Document", description = "Employee document expiry tracking"),
        (name = "Settings", description = "Application settings"),
        (name = "User", description = "User accounts and permissions"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
