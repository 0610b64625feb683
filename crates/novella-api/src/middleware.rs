use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use novella_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Identity of whoever is calling a public route, if they sent a valid token.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let claims = decode_token(&state.jwt_secret, &token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Attach a [`Viewer`] to public requests. Missing or bad tokens yield an
/// anonymous viewer instead of an error.
pub async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| {
        decode_token(&state.jwt_secret, &token)
            .map_err(|e| debug!("Ignoring invalid token on public route: {}", e))
            .ok()
    });

    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}
