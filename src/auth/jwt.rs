use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    auth::session::{Claims, Session},
    error::AppError,
};

pub(crate) fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Signs the session into a token valid for `ttl` seconds.
pub fn issue_session_token(
    session: &Session,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), AppError> {
    let issued_at = now();
    let claims = Claims {
        sub: session.email.clone(),
        iat: issued_at,
        exp: issued_at + ttl,
        jti: Uuid::new_v4().to_string(),
        session: session.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{permission::PermissionMap, role::Role};

    fn session() -> Session {
        Session {
            user_id: 9,
            email: "hr@example.com".into(),
            role: Role::User,
            branch_ids: vec![1, 2],
            permissions: PermissionMap::defaults_for(Role::User),
        }
    }

    #[test]
    fn token_carries_session() {
        let (token, claims) = issue_session_token(&session(), "secret", 300).unwrap();
        let decoded = verify_token(&token, "secret").unwrap();
        assert_eq!(decoded.session, session());
        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.exp, claims.iat + 300);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = issue_session_token(&session(), "secret", 300).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Token(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = issue_session_token(&session(), "secret", 300).unwrap().1;
        claims.exp = now() - 3_600;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let a = issue_session_token(&session(), "secret", 300).unwrap().1;
        let b = issue_session_token(&session(), "secret", 300).unwrap().1;
        assert_ne!(a.jti, b.jti);
    }
}
