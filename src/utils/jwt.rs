use actix_web::{HttpMessage, HttpRequest};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;

/// Token issuance lives outside this service; only verification happens here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<i64, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

/// Caller identity resolved by the auth middleware. Handlers behind the
/// protected scope can rely on it being present.
pub fn authenticated_user_id(req: &HttpRequest) -> Result<i64, ApiError> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.id)
        .ok_or_else(|| ApiError::Unauthorized("Missing authenticated user".to_string()))
}
