/// Catalog endpoints
///
/// - `GET /buyer_dashboard?category_id=&query=` - categories plus the
///   filtered, non-archived products
/// - `GET /categories` - JSON category list
/// - `POST /add_category` - JSON category create

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefront_shared::{
    auth::middleware::AuthContext,
    models::{
        category::Category,
        product::{CatalogFilter, Product},
    },
};

/// Raw dashboard query; `category_id` may be `all` or blank
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category_id: Option<String>,
    pub query: Option<String>,
}

impl CatalogQuery {
    fn into_filter(self) -> ApiResult<CatalogFilter> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| ApiError::invalid("category_id", "Unknown category"))?,
            ),
        };

        Ok(CatalogFilter {
            category_id,
            query: self.query,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BuyerDashboard {
    pub user: AuthContext,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub selected_category: Option<i64>,
    pub search_query: Option<String>,
}

pub async fn buyer_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<BuyerDashboard>> {
    let filter = query.into_filter()?;

    let categories = Category::list(&state.db).await?;
    let products = Product::list_catalog(&state.db, &filter).await?;

    tracing::debug!(
        user_id = auth.user_id,
        category_id = ?filter.category_id,
        results = products.len(),
        "Catalog listed"
    );

    Ok(Json(BuyerDashboard {
        user: auth,
        categories,
        products,
        selected_category: filter.category_id,
        search_query: filter.query,
    }))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(Category::list(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub category_name: Option<String>,
}

/// Creates a category; a taken name is a `409`
pub async fn add_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let name = req
        .category_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::invalid("category_name", "Category name is required"))?;

    let mut conn = state.db.acquire().await?;
    let category = Category::create(&mut *conn, name).await?;

    tracing::info!(user_id = auth.user_id, category_id = category.id, "Category created");

    Ok(Json(category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_query_parsing() {
        let all = CatalogQuery {
            category_id: Some("all".to_string()),
            query: None,
        };
        assert_eq!(all.into_filter().unwrap().category_id, None);

        let blank = CatalogQuery {
            category_id: Some(" ".to_string()),
            query: Some("pen".to_string()),
        };
        let filter = blank.into_filter().unwrap();
        assert_eq!(filter.category_id, None);
        assert_eq!(filter.query.as_deref(), Some("pen"));

        let one = CatalogQuery {
            category_id: Some("7".to_string()),
            query: None,
        };
        assert_eq!(one.into_filter().unwrap().category_id, Some(7));

        let bad = CatalogQuery {
            category_id: Some("seven".to_string()),
            query: None,
        };
        assert!(bad.into_filter().is_err());
    }
}
