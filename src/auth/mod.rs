//! Bearer-token authentication for the single operator account.
//!
//! There is exactly one credential pair, taken from configuration. A
//! successful login issues a short-lived HS256 access token; every `/api/v1`
//! route requires it.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ErrorResponse;

/// JWT claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the operator email)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Expiration (seconds since epoch)
    pub exp: usize,
    /// Issued at (seconds since epoch)
    pub iat: usize,
    /// Token id
    pub jti: String,
}

/// Authenticated request identity, available to handlers as an extractor.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub name: String,
    pub token_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token creation failed")]
    TokenCreation,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
            details: None,
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginCredentials {
    #[schema(example = "mama@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Issues and validates access tokens against the configured credential.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    admin_email: String,
    admin_password: String,
}

impl AuthService {
    pub fn new(
        jwt_secret: &str,
        token_ttl: Duration,
        admin_email: String,
        admin_password: String,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl,
            admin_email,
            admin_password,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            &cfg.jwt_secret,
            Duration::from_secs(cfg.jwt_expiration as u64),
            cfg.admin_email.clone(),
            cfg.admin_password.clone(),
        )
    }

    /// Checks the credential pair and issues a token on success.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        if email != self.admin_email || password != self.admin_password {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_token()
    }

    fn issue_token(&self) -> Result<TokenResponse, AuthError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: self.admin_email.clone(),
            name: "Operator".to_string(),
            exp: now + self.token_ttl.as_secs() as usize,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenCreation)?;

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.as_secs(),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Middleware guarding the API: validates the bearer token and attaches the
/// authenticated identity to the request.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                let claims = auth_service.validate_token(token)?;

                return Ok(AuthUser {
                    email: claims.sub,
                    name: claims.name,
                    token_id: claims.jti,
                });
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new().route("/login", axum::routing::post(login_handler))
}

/// Login handler
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    )
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<TokenResponse>, AuthError> {
    match auth_service.authenticate(&credentials.email, &credentials.password) {
        Ok(token_pair) => {
            info!(email = %credentials.email, "Login succeeded");
            Ok(Json(token_pair))
        }
        Err(e) => {
            warn!(email = %credentials.email, "Login rejected");
            Err(e)
        }
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            "a_sufficiently_long_testing_secret_with_plenty_of_unique_chars_0123456789",
            Duration::from_secs(3600),
            "mama@example.com".to_string(),
            "12345678".to_string(),
        )
    }

    #[test]
    fn valid_credentials_issue_a_verifiable_token() {
        let auth = service();
        let token = auth
            .authenticate("mama@example.com", "12345678")
            .expect("credentials should be accepted");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let claims = auth
            .validate_token(&token.access_token)
            .expect("freshly issued token should validate");
        assert_eq!(claims.sub, "mama@example.com");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("mama@example.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn wrong_email_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("intruder@example.com", "12345678"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.validate_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let auth = service();
        let other = AuthService::new(
            "another_completely_different_secret_also_long_enough_9876543210_zyxw",
            Duration::from_secs(3600),
            "mama@example.com".to_string(),
            "12345678".to_string(),
        );
        let token = other.authenticate("mama@example.com", "12345678").unwrap();
        assert!(matches!(
            auth.validate_token(&token.access_token),
            Err(AuthError::InvalidToken)
        ));
    }
}
