/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. Session and role failures
/// render as `303 See Other` redirects to the login page so browsers land
/// somewhere useful; everything else renders as a JSON body:
///
/// ```json
/// { "error": "conflict", "message": "Email already exists" }
/// ```

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use storefront_shared::{
    auth::{
        authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
    },
    storage::StorageError,
    workflow::WorkflowError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Wrong credentials (401)
    Unauthorized(String),

    /// No usable session: redirect to `/login?next=<return_to>`
    Unauthenticated { return_to: Option<String> },

    /// Signed in with the wrong role: redirect to `/login`
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email or a refused status change
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Checkout without any usable cart line (400)
    EmptySelection,

    /// Order transaction rolled back (500)
    OrderPlacementFailed,

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "not_found")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Unauthenticated { .. } => write!(f, "Not signed in"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::EmptySelection => write!(f, "No cart items selected"),
            ApiError::OrderPlacementFailed => write!(f, "Order placement failed"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthenticated { return_to } => {
                return Redirect::to(&login_location(return_to.as_deref())).into_response();
            }
            ApiError::Forbidden(msg) => {
                tracing::debug!("Forbidden: {}", msg);
                return Redirect::to("/login").into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::EmptySelection => (
                StatusCode::BAD_REQUEST,
                "empty_selection",
                "No items selected for checkout".to_string(),
                None,
            ),
            ApiError::OrderPlacementFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "order_placement_failed",
                "Your order could not be placed, your cart was not changed".to_string(),
                None,
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// `/login`, with `next` set when there is a page to come back to
pub fn login_location(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) if !path.is_empty() => match serde_urlencoded::to_string([("next", path)]) {
            Ok(query) => format!("/login?{}", query),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unencodable return path");
                "/login".to_string()
            }
        },
        _ => "/login".to_string(),
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some("users_email_key") => {
                        ApiError::Conflict("Email already exists".to_string())
                    }
                    Some("users_name_key") => {
                        ApiError::Conflict("Name already taken".to_string())
                    }
                    Some("categories_name_key") => {
                        ApiError::Conflict("Category already exists".to_string())
                    }
                    Some(constraint) => {
                        ApiError::Conflict(format!("Constraint violation: {}", constraint))
                    }
                    None => ApiError::Conflict("Duplicate value".to_string()),
                }
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::BadRequest("Referenced record does not exist".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert workflow errors to API errors
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::EmptySelection => ApiError::EmptySelection,
            WorkflowError::InvalidQuantity(_) => ApiError::invalid("quantity", err.to_string()),
            WorkflowError::NotFound(_) => ApiError::NotFound(err.to_string()),
            WorkflowError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            WorkflowError::OrderPlacementFailed(cause) => {
                tracing::error!(error = %cause, "Order placement rolled back");
                ApiError::OrderPlacementFailed
            }
            WorkflowError::Store(e) => e.into(),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(e) => e.into(),
            _ => ApiError::Unauthenticated { return_to: None },
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthenticated { return_to: None },
        }
    }
}

/// Convert upload errors to API errors
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => ApiError::InternalError(format!("Upload failed: {}", e)),
            other => ApiError::invalid("file", other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

/// Convert `validator` failures into field details
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use storefront_shared::models::order::OrderStatus;

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");
    }

    #[test]
    fn test_unauthenticated_redirects_with_next() {
        let response = ApiError::Unauthenticated {
            return_to: Some("/cart?tab=saved items".to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2Fcart%3Ftab%3Dsaved+items");
    }

    #[test]
    fn test_forbidden_redirects_to_login() {
        let response = ApiError::Forbidden("admins only".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[test]
    fn test_workflow_error_mapping() {
        let response = ApiError::from(WorkflowError::EmptySelection).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(WorkflowError::NotFound("Order")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(WorkflowError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response =
            ApiError::from(WorkflowError::OrderPlacementFailed(sqlx::Error::PoolTimedOut))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(WorkflowError::InvalidQuantity(0));
        assert!(matches!(err, ApiError::ValidationError(ref d) if d[0].field == "quantity"));
    }

    #[test]
    fn test_sqlx_row_not_found() {
        let response = ApiError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_errors_are_client_errors() {
        let err = ApiError::from(StorageError::TooLarge { size: 11, limit: 10 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail::new("email", "Invalid email format"),
            ValidationErrorDetail::new("password", "Password too short"),
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
