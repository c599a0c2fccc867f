use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use marquee_core::HolderToken;
use marquee_shared::Masked;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims of a signed-in customer. `sub` is the holder identity that every
/// hold and booking is keyed on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

/// Sign a customer token. Sign-in lives in the identity service; this exists
/// for tooling and tests that need a token the API accepts.
pub fn issue_token(
    auth: &AuthConfig,
    subject: &str,
    email: Option<&str>,
) -> Result<String, AppError> {
    let claims = CustomerClaims {
        sub: subject.to_string(),
        email: email.map(str::to_string),
        role: "CUSTOMER".to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Customer Authentication Middleware
// ============================================================================

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract bearer token
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".into()))?;

    // 2. Decode and validate JWT
    let token_data = decode::<CustomerClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::AuthenticationError("Token has no subject".into()));
    }

    // 3. Inject holder identity and claims
    let holder = HolderToken::new(token_data.claims.sub.clone());
    tracing::debug!("Authenticated {}", Masked(&holder));
    req.extensions_mut().insert(holder);
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
