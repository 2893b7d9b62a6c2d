/// Authorization checks over an authenticated session
///
/// Pure predicates: the session (and the user behind it) was already
/// loaded by [`super::middleware::authenticate`].
///
/// # Role sets
///
/// | Area | Roles |
/// |------|-------|
/// | buyer dashboard | buyer, seller |
/// | seller pages | seller |
/// | seller registration | buyer |
/// | admin pages | admin |

use super::middleware::AuthContext;
use crate::models::user::Role;

/// Roles allowed to browse the buyer catalog
pub const SHOPPERS: &[Role] = &[Role::Buyer, Role::Seller];

/// Roles allowed on seller pages
pub const SELLERS: &[Role] = &[Role::Seller];

/// Roles allowed to apply to become a seller
pub const APPLICANTS: &[Role] = &[Role::Buyer];

/// Roles allowed on admin pages
pub const ADMINS: &[Role] = &[Role::Admin];

/// Authorization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires one of {required:?}, has {actual}")]
    InsufficientRole {
        required: Vec<Role>,
        actual: Role,
    },

    /// User doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Requires the session's role to be one of `roles`
pub fn require_role(auth: &AuthContext, roles: &[Role]) -> Result<(), AuthzError> {
    if !auth.has_role(roles) {
        return Err(AuthzError::InsufficientRole {
            required: roles.to_vec(),
            actual: auth.role,
        });
    }

    Ok(())
}

/// Requires the session's user to own a resource
pub fn require_ownership(auth: &AuthContext, resource_owner_id: i64) -> Result<(), AuthzError> {
    if auth.user_id != resource_owner_id {
        return Err(AuthzError::NotAuthorized);
    }

    Ok(())
}
