/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the reuse check
/// - [`jwt`]: signed session tokens
/// - [`middleware`]: resolving a request's session into an [`middleware::AuthContext`]
/// - [`authorization`]: role and ownership checks over that context
///
/// # Example
///
/// ```no_run
/// use storefront_shared::auth::password::{hash_password, verify_password};
/// use storefront_shared::auth::jwt::{create_token, Claims};
/// use storefront_shared::models::user::Role;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(1, Role::Buyer, chrono::Duration::hours(24));
/// let token = create_token(&claims, "a-secret-that-is-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
