/// Seller endpoints
///
/// Everything here sits behind the seller gate and only ever touches the
/// signed-in seller's own products and order lines.
///
/// - `GET /seller_dashboard` - metrics and own products
/// - `GET /seller_orders` - own order lines grouped per order
/// - `POST /update_order_status` - set own items' status, then roll up
/// - `POST /add_product` - multipart create, optional image and category
/// - `GET|POST /edit_product/:id`
/// - `POST /archive_product/:id`, `POST /unarchive_product/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::forms::MultipartForm,
};
use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use storefront_shared::{
    auth::middleware::AuthContext,
    models::{
        category::Category,
        order::{OrderStatus, SellerMetrics, SellerOrder},
        product::{CreateProduct, Product, UpdateProduct},
    },
    workflow::fulfillment,
};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct SellerDashboard {
    pub user: AuthContext,
    pub metrics: SellerMetrics,
    pub products: Vec<Product>,
}

pub async fn seller_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SellerDashboard>> {
    let metrics = SellerMetrics::for_seller(&state.db, auth.user_id).await?;
    let products = Product::list_by_seller(&state.db, auth.user_id).await?;

    Ok(Json(SellerDashboard {
        user: auth,
        metrics,
        products,
    }))
}

pub async fn seller_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<SellerOrder>>> {
    Ok(Json(SellerOrder::for_seller(&state.db, auth.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusForm {
    pub order_id: i64,
    pub status: String,
}

/// Sets the status of the seller's items in one order
///
/// # Errors
///
/// - `422`: unknown status
/// - `404`: the order has no items of this seller
/// - `409`: the order is cancelled, or `Cancelled` was requested
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<UpdateOrderStatusForm>,
) -> ApiResult<Redirect> {
    let status = OrderStatus::parse(form.status.trim())
        .ok_or_else(|| ApiError::invalid("status", format!("Unknown status '{}'", form.status)))?;

    let order_status =
        fulfillment::update_order_item_status(&state.db, auth.user_id, form.order_id, status)
            .await?;

    tracing::debug!(
        order_id = form.order_id,
        seller_id = auth.user_id,
        %order_status,
        "Order status after seller update"
    );

    Ok(Redirect::to("/seller_orders"))
}

/// Editable product fields, shared by the add and edit forms
#[derive(Debug, Deserialize, Validate)]
pub struct ProductFields {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub product_name: String,

    #[validate(length(max = 100, message = "Size must be at most 100 characters"))]
    pub size: String,

    #[validate(range(min = 0, message = "Pages cannot be negative"))]
    pub pages: i32,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,

    /// Decimal price as typed, e.g. `12.50`
    pub price: String,
}

impl ProductFields {
    fn from_multipart(form: &MultipartForm) -> ApiResult<Self> {
        Ok(Self {
            product_name: form.required("product_name")?.to_string(),
            size: form.text("size").unwrap_or_default().to_string(),
            pages: form.number("pages")?,
            stock: form.number("stock")?,
            price: form.required("price")?.to_string(),
        })
    }

    fn into_update(self) -> ApiResult<UpdateProduct> {
        self.validate()?;

        let price_cents = parse_price_cents(&self.price)
            .ok_or_else(|| ApiError::invalid("price", "Price must look like 12.50"))?;

        Ok(UpdateProduct {
            product_name: self.product_name.trim().to_string(),
            size: self.size.trim().to_string(),
            pages: self.pages,
            stock: self.stock,
            price_cents,
        })
    }
}

/// Lists a new product
///
/// Form fields: `product_name`, `size`, `pages`, `stock`, `price`, and
/// either `category_id` or `new_category_name`; optional file `image`.
pub async fn add_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Redirect> {
    let form = MultipartForm::read(multipart).await?;
    let fields = ProductFields::from_multipart(&form)?.into_update()?;
    let category_id: Option<i64> = form.optional_number("category_id")?;
    let new_category = form.text("new_category_name").map(str::to_string);

    let image_path = form.save_file(&state.uploads, "image").await?;

    let result = create_product(
        &state,
        auth.user_id,
        category_id,
        new_category,
        fields,
        image_path.clone(),
    )
    .await;

    match result {
        Ok(product) => {
            tracing::info!(seller_id = auth.user_id, product_id = product.id, "Product listed");
            Ok(Redirect::to("/seller_dashboard"))
        }
        Err(e) => {
            if let Some(stored) = image_path {
                if let Err(cleanup) = state.uploads.remove(&stored).await {
                    tracing::warn!(error = %cleanup, file = %stored, "Orphaned product image");
                }
            }
            Err(e)
        }
    }
}

/// Category creation and product insert commit together
async fn create_product(
    state: &AppState,
    seller_id: i64,
    category_id: Option<i64>,
    new_category: Option<String>,
    fields: UpdateProduct,
    image_path: Option<String>,
) -> ApiResult<Product> {
    let mut tx = state.db.begin().await?;

    let category_id = match new_category {
        Some(name) => Some(Category::create(&mut *tx, &name).await?.id),
        None => category_id,
    };

    let product = Product::create(
        &mut *tx,
        seller_id,
        CreateProduct {
            category_id,
            product_name: fields.product_name,
            size: fields.size,
            pages: fields.pages,
            stock: fields.stock,
            price_cents: fields.price_cents,
            image_path,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(product)
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<Product>> {
    Product::find_owned(&state.db, product_id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

pub async fn edit_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
    Form(fields): Form<ProductFields>,
) -> ApiResult<Redirect> {
    let update = fields.into_update()?;

    Product::update(&state.db, product_id, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    tracing::info!(seller_id = auth.user_id, product_id, "Product updated");
    Ok(Redirect::to("/seller_dashboard"))
}

pub async fn archive_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
) -> ApiResult<Redirect> {
    set_archived(&state, auth.user_id, product_id, true).await
}

pub async fn unarchive_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<i64>,
) -> ApiResult<Redirect> {
    set_archived(&state, auth.user_id, product_id, false).await
}

async fn set_archived(
    state: &AppState,
    seller_id: i64,
    product_id: i64,
    archived: bool,
) -> ApiResult<Redirect> {
    if !Product::set_archived(&state.db, product_id, seller_id, archived).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }

    tracing::info!(seller_id, product_id, archived, "Product archive flag changed");
    Ok(Redirect::to("/seller_dashboard"))
}

/// Parses a non-negative decimal price into cents
///
/// Accepts at most two decimals: `12`, `12.5`, `12.50`, `.99`.
pub fn parse_price_cents(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || fraction.len() > 2
    {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}
