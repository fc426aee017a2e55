use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::TypedHeader;
use axum_extra::typed_header::TypedHeaderRejectionReason;
use headers::Authorization;
use headers::authorization::Bearer;

use crate::auth::TokenIssuer;
use crate::error::JambleError;
use crate::types::UserId;

/// Authenticated caller, taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    TokenIssuer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = JambleError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|rejection| match rejection.reason() {
                TypedHeaderRejectionReason::Missing => {
                    JambleError::Unauthorized("Access denied, no token provided".to_string())
                }
                _ => JambleError::Unauthorized("Malformed authorization header".to_string()),
            })?;
        let issuer = TokenIssuer::from_ref(state);
        issuer.verify(bearer.token()).map(AuthUser)
    }
}

/// Like [`AuthUser`] but absent when no bearer header was sent.
///
/// A header that is present but invalid is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<UserId>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    TokenIssuer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = JambleError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(Self(None));
        }
        let AuthUser(id) = AuthUser::from_request_parts(parts, state).await?;
        Ok(Self(Some(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/me");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_bearer_yields_user() {
        let issuer = TokenIssuer::new("secret", 60);
        let user = Uuid::new_v4();
        let token = issuer.issue(user).unwrap();
        let mut p = parts(Some(&format!("Bearer {token}")));
        let AuthUser(id) = AuthUser::from_request_parts(&mut p, &issuer).await.unwrap();
        assert_eq!(id, user);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let issuer = TokenIssuer::new("secret", 60);
        let mut p = parts(None);
        let err = AuthUser::from_request_parts(&mut p, &issuer).await.unwrap_err();
        assert!(matches!(err, JambleError::Unauthorized(ref m) if m.contains("no token")));

        let mut p = parts(None);
        let MaybeAuthUser(id) = MaybeAuthUser::from_request_parts(&mut p, &issuer)
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_even_when_optional() {
        let issuer = TokenIssuer::new("secret", 60);
        let mut p = parts(Some("Bearer not-a-jwt"));
        assert!(MaybeAuthUser::from_request_parts(&mut p, &issuer).await.is_err());

        let mut p = parts(Some("Basic dXNlcjpwYXNz"));
        assert!(AuthUser::from_request_parts(&mut p, &issuer).await.is_err());
    }
}
