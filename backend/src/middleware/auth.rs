//! Authentication middleware
//!
//! JWT bearer tokens for operator routes, a static API key for the external
//! integration routes. Both resolve to the [`Actor`] recorded on ledger entries.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ExternalApiConfig;
use crate::error::{AppError, AppResult};
use crate::AppState;
use shared::Actor;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Decode and validate an HS256 access token
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Check an external API call against the configured key
pub fn check_api_key(config: &ExternalApiConfig, headers: &HeaderMap) -> AppResult<()> {
    if !config.enabled {
        return Err(AppError::ExternalApiDisabled);
    }

    match bearer_token(headers) {
        Some(key) if !config.api_key.is_empty() && key == config.api_key => Ok(()),
        Some(_) => Err(AppError::Unauthorized("Invalid API key".to_string())),
        None => Err(AppError::Unauthorized(
            "Missing or invalid Authorization header".to_string(),
        )),
    }
}

/// Require a valid operator token; records the token subject as the actor
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let claims = decode_token(token, &state.config.jwt.secret)?;

    tracing::debug!(user = %claims.sub, role = %claims.role, "authenticated");
    request.extensions_mut().insert(Actor::user(claims.sub));

    Ok(next.run(request).await)
}

/// Require the external API key; records `EXTERNAL_API` as the actor
pub async fn external_api_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_api_key(&state.config.external_api, request.headers())?;

    request.extensions_mut().insert(Actor::external_api());

    Ok(next.run(request).await)
}

/// Extractor for the actor of the current request.
/// Use this in handlers behind either middleware.
#[derive(Clone, Debug)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
