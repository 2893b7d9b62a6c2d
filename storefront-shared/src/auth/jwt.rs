/// Session tokens
///
/// A session is an HS256-signed JWT naming the user and the role they had
/// when they logged in. The token travels in the `session` cookie set at
/// login, or in an `Authorization: Bearer` header for non-browser clients.
///
/// The role claim is a hint only: the access gate reloads the user on
/// every request and trusts the stored role and status.
///
/// # Token Structure
///
/// ```json
/// {
///   "sub": 42,
///   "role": "buyer",
///   "iss": "storefront",
///   "iat": 1234567890,
///   "exp": 1234654290,
///   "nbf": 1234567890
/// }
/// ```
///
/// # Example
///
/// ```
/// use storefront_shared::auth::jwt::{create_token, validate_token, Claims};
/// use storefront_shared::models::user::Role;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let claims = Claims::new(42, Role::Buyer, Duration::hours(24));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::Role;

const ISSUER: &str = "storefront";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,
}

/// Session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,

    /// Role at login time
    pub role: Role,

    pub iss: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiry (Unix seconds)
    pub exp: i64,

    /// Not before (Unix seconds)
    pub nbf: i64,
}

impl Claims {
    pub fn new(user_id: i64, role: Role, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into a token
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, issuer, expiry and not-before, then returns the claims
///
/// # Errors
///
/// `Expired` for an expired token, `ValidationError` for anything else
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
