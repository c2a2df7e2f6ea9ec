use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::{
    auth::{
        guard::authenticate,
        permission::can,
        session::{BranchScope, Claims, Session},
    },
    config::Config,
    error::AppError,
    model::permission::{Action, Module},
};

/// Authenticated caller. Reads the session the route guard attached, or
/// verifies the token itself on routes the guard does not cover.
pub struct AuthUser {
    pub session: Session,
    pub claims: Claims,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(claims) = req.extensions().get::<Claims>() {
            return ready(Ok(AuthUser {
                session: claims.session.clone(),
                claims: claims.clone(),
            }));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(AppError::Internal(anyhow::anyhow!("Config missing"))));
        };

        ready(
            authenticate(req, config)
                .map(|claims| AuthUser {
                    session: claims.session.clone(),
                    claims,
                })
                .ok_or(AppError::Unauthorized),
        )
    }
}

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.session.user_id
    }

    pub fn can(&self, module: Module, action: Action) -> bool {
        can(Some(&self.session), module, action)
    }

    pub fn require(&self, module: Module, action: Action) -> Result<(), AppError> {
        if self.can(module, action) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "You need the '{module}:{action}' permission for this"
            )))
        }
    }

    /// Passes when any one of the listed capabilities is held.
    pub fn require_any(&self, needed: &[(Module, Action)]) -> Result<(), AppError> {
        match needed.iter().find(|(m, a)| self.can(*m, *a)) {
            Some(_) => Ok(()),
            None => Err(AppError::forbidden("You are not allowed to do this")),
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn scope(&self) -> BranchScope {
        self.session.branch_scope()
    }

    /// Forbids touching rows of a branch outside the caller's scope.
    pub fn require_branch(&self, branch_id: i64) -> Result<(), AppError> {
        if self.scope().includes(branch_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("Branch is outside your scope"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::issue_session_token,
        config::test_config,
        model::{permission::PermissionMap, role::Role},
    };
    use actix_web::test::TestRequest;

    fn session(role: Role) -> Session {
        Session {
            user_id: 5,
            email: "x@example.com".into(),
            role,
            branch_ids: vec![3],
            permissions: PermissionMap::defaults_for(role),
        }
    }

    #[actix_web::test]
    async fn extracts_from_bearer_header_without_guard() {
        let config = test_config();
        let token = issue_session_token(&session(Role::User), &config.jwt_secret, 60)
            .unwrap()
            .0;
        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(config))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_parts();

        let user = AuthUser::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(user.user_id(), 5);
        assert!(user.require(Module::Branches, Action::View).is_ok());
        assert!(matches!(
            user.require(Module::Branches, Action::Delete),
            Err(AppError::Forbidden(_))
        ));
        assert!(user.require_branch(3).is_ok());
        assert!(user.require_branch(4).is_err());
        assert!(user.require_admin().is_err());
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(test_config()))
            .to_http_parts();
        assert!(matches!(
            AuthUser::from_request(&req, &mut payload).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[actix_web::test]
    async fn require_any_accepts_one_match() {
        let config = test_config();
        let token = issue_session_token(&session(Role::User), &config.jwt_secret, 60)
            .unwrap()
            .0;
        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(config))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_parts();
        let user = AuthUser::from_request(&req, &mut payload).await.unwrap();

        assert!(user
            .require_any(&[(Module::Settings, Action::View), (Module::Employees, Action::View)])
            .is_ok());
        assert!(user.require_any(&[(Module::Settings, Action::Edit)]).is_err());
    }
}
