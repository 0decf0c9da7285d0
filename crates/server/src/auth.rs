//! Bearer-token authentication. Tokens are issued by an external identity
//! provider sharing the configured HS256 secret; accounts are created on
//! first sight of a verified subject.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use grantline_core::domain::session::{User, UserId};
use grantline_core::errors::ApplicationError;

use crate::api::{new_correlation_id, ApiError};
use crate::bootstrap::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub exp: u64,
}

fn default_role() -> String {
    "user".to_string()
}

/// The authenticated account behind the request.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized {
                detail: "missing authorization header".to_string(),
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized { detail: "expected a bearer token".to_string() }
        })?;

        let key = DecodingKey::from_secret(state.config.auth.jwt_secret.expose_secret().as_bytes());
        let claims = decode::<Claims>(token, &key, &Validation::default())
            .map_err(|error| ApiError::Unauthorized { detail: error.to_string() })?
            .claims;

        let user_id = UserId(claims.sub);
        let existing = state.users.find_by_id(&user_id).await.map_err(|error| {
            ApiError::Interface(
                ApplicationError::Persistence(error.to_string())
                    .into_interface(new_correlation_id()),
            )
        })?;

        let user = match existing {
            Some(user) => user,
            None => {
                let user = User::new(user_id, claims.username, claims.role, Utc::now());
                state.users.save(user.clone()).await.map_err(|error| {
                    ApiError::Interface(
                        ApplicationError::Persistence(error.to_string())
                            .into_interface(new_correlation_id()),
                    )
                })?;
                user
            }
        };

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
pub(crate) fn issue_token(state: &AppState, sub: &str, username: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: sub.to_string(),
        username: username.to_string(),
        role: "user".to_string(),
        exp: Utc::now().timestamp() as u64 + state.config.auth.token_ttl_secs,
    };
    let key = EncodingKey::from_secret(state.config.auth.jwt_secret.expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key).expect("token should encode")
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequestParts;
    use axum::http::{header, Request};

    use super::{issue_token, AuthUser};
    use crate::api::ApiError;
    use crate::testutil::test_state;

    async fn extract(state: &crate::bootstrap::AppState, token: Option<&str>) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/api/subsidy/sessions");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let (mut parts, ()) = builder.body(()).expect("request should build").into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn valid_token_creates_the_account_on_first_sight() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");

        let AuthUser(user) = extract(&state, Some(&token)).await.expect("token should verify");
        assert_eq!(user.id.0, "u-1");
        assert_eq!(user.username, "alice");

        // Second request finds the same account instead of creating another.
        let AuthUser(again) = extract(&state, Some(&token)).await.expect("token should verify");
        assert_eq!(again.id, user.id);
        assert_eq!(again.created_at, user.created_at);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let state = test_state(vec![]);
        let result = extract(&state, None).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = test_state(vec![]);
        let result = extract(&state, Some("not-a-jwt")).await;
        assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    }
}
