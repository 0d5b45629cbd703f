//! Token authentication extractors.
//!
//! [`RequireAuth`] resolves the caller from the `Authorization` header
//! (a bare token or `Bearer <token>`) and loads the user fresh from the
//! store. [`RequireAdmin`] runs the same check first and then requires the
//! administrator role, so a handler can never check the role of an
//! unauthenticated caller.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use crate::db::UserStore;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Extractor that requires a valid token.
///
/// Rejects with 401 when the header is missing, the token fails
/// verification, or the user no longer exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authorization token required".into()))?;

        let user_id = state.tokens().verify(token)?;
        let user = state
            .store()
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

/// Extractor that requires a valid token belonging to an administrator.
///
/// Rejects with 401 like [`RequireAuth`], then with 403 for other roles.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin denied");
            return Err(AppError::Forbidden("Unauthorized access".into()));
        }

        Ok(Self(user))
    }
}

/// Token from the `Authorization` header, with an optional `Bearer ` prefix.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        // Header trimmed down to a bare scheme.
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/user-auth");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_forms() {
        assert_eq!(bearer_token(&parts_with(Some("abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(
            bearer_token(&parts_with(Some("Bearer abc.def.ghi"))),
            Some("abc.def.ghi")
        );
        assert_eq!(
            bearer_token(&parts_with(Some("bearer  abc.def.ghi "))),
            Some("abc.def.ghi")
        );
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(Some("  "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
