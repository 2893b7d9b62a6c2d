/// Access control gate
///
/// `session_gate` resolves the session on every request it guards and puts
/// the [`AuthContext`] into the request extensions. The role gates run
/// after it and only look at that context:
///
/// ```text
/// .route_layer(from_fn(require_seller))                 // runs second
/// .route_layer(from_fn_with_state(state, session_gate)) // runs first
/// ```

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{OriginalUri, Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use storefront_shared::{
    auth::{
        authorization::{require_role, ADMINS, APPLICANTS, SELLERS, SHOPPERS},
        middleware::{authenticate, AuthContext, AuthError},
    },
    models::user::Role,
};
use tracing::debug;

/// Requires a valid session for an existing, active user
///
/// Failure redirects to `/login?next=<this path>`.
pub async fn session_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = match authenticate(&state.db, state.session_secret(), req.headers()).await {
        Ok(auth) => auth,
        Err(AuthError::DatabaseError(e)) => return Err(e.into()),
        Err(e) => {
            let return_to = return_path(&req);
            debug!(path = %return_to, reason = %e, "No usable session");
            return Err(ApiError::Unauthenticated {
                return_to: Some(return_to),
            });
        }
    };

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

pub async fn require_shopper(req: Request, next: Next) -> Result<Response, ApiError> {
    role_gate(req, next, SHOPPERS).await
}

pub async fn require_seller(req: Request, next: Next) -> Result<Response, ApiError> {
    role_gate(req, next, SELLERS).await
}

pub async fn require_applicant(req: Request, next: Next) -> Result<Response, ApiError> {
    role_gate(req, next, APPLICANTS).await
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    role_gate(req, next, ADMINS).await
}

async fn role_gate(req: Request, next: Next, roles: &[Role]) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthenticated {
            return_to: Some(return_path(&req)),
        })?;

    require_role(auth, roles)?;

    Ok(next.run(req).await)
}

/// Path and query the client asked for, for the login page to send the
/// user back
///
/// Nested routers see the URI with their prefix stripped, so the
/// unmodified [`OriginalUri`] is preferred.
fn return_path(req: &Request) -> String {
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| req.uri());

    uri_path_and_query(uri)
}

fn uri_path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
