/// End-to-end tests through the router against a real database
///
/// Run with: cargo test -p storefront-api --test api_tests
/// (requires DATABASE_URL, see tests/common/mod.rs)

mod common;

use axum::http::{header, StatusCode};
use common::*;
use serde_json::json;
use storefront_shared::models::cart::CartItem;
use storefront_shared::models::order::{Order, OrderStatus};
use storefront_shared::models::user::{Role, User, UserStatus};

async fn user_count(ctx: &TestContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&ctx.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_creates_buyer() {
    let Some(ctx) = TestContext::new().await else { return };

    let name = format!("signup-{}", uuid::Uuid::new_v4().simple());
    let email = format!("{name}@example.com");
    let password = format!("pw-{}", uuid::Uuid::new_v4().simple());

    let response = ctx
        .send(post_form(
            "/signup",
            None,
            &[("name", &name), ("email", &email), ("password", &password)],
        ))
        .await;
    assert_redirect(&response, "/login");

    let user = User::find_by_email(&ctx.db, &email).await.unwrap().unwrap();
    assert_eq!(user.name, name);
    assert_eq!(user.role, Role::Buyer);
    assert_eq!(user.status, UserStatus::Active);
    assert_ne!(user.password_hash, password);
}

#[tokio::test]
async fn test_signup_with_existing_email_is_rejected() {
    let Some(ctx) = TestContext::new().await else { return };

    let (existing, _) = create_user(&ctx.db, Role::Buyer).await;
    let before = user_count(&ctx).await;

    let response = ctx
        .send(post_form(
            "/signup",
            None,
            &[
                ("name", &format!("{}-other", existing.name)),
                ("email", &existing.email),
                ("password", &format!("pw-{}", uuid::Uuid::new_v4().simple())),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "conflict");

    // Other tests may insert concurrently, so check the row itself too
    assert!(user_count(&ctx).await >= before);
    let reloaded = User::find_by_email(&ctx.db, &existing.email).await.unwrap().unwrap();
    assert_eq!(reloaded.id, existing.id);
    assert_eq!(reloaded.name, existing.name);
    assert_eq!(reloaded.password_hash, existing.password_hash);
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE name = $1")
        .bind(format!("{}-other", existing.name))
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(taken, 0);
}

#[tokio::test]
async fn test_signup_rejects_reused_password() {
    let Some(ctx) = TestContext::new().await else { return };

    let (_, password) = create_user(&ctx.db, Role::Buyer).await;
    let name = format!("reuse-{}", uuid::Uuid::new_v4().simple());

    let response = ctx
        .send(post_form(
            "/signup",
            None,
            &[
                ("name", &name),
                ("email", &format!("{name}@example.com")),
                ("password", &password),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(User::find_by_email(&ctx.db, &format!("{name}@example.com"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_login_sets_session_and_redirects_by_role() {
    let Some(ctx) = TestContext::new().await else { return };

    let (seller, password) = create_user(&ctx.db, Role::Seller).await;

    let response = ctx
        .send(post_form(
            "/login",
            None,
            &[("email", &seller.email), ("password", &password)],
        ))
        .await;
    assert_redirect(&response, "/seller_dashboard");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = ctx.send(get("/seller_dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["user_id"], seller.id);

    // `next` wins over the role dashboard
    let response = ctx
        .send(post_form(
            "/login",
            None,
            &[
                ("email", &seller.email),
                ("password", &password),
                ("next", "/seller_orders"),
            ],
        ))
        .await;
    assert_redirect(&response, "/seller_orders");
}

#[tokio::test]
async fn test_login_failures() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, password) = create_user(&ctx.db, Role::Buyer).await;

    let response = ctx
        .send(post_form(
            "/login",
            None,
            &[("email", &buyer.email), ("password", "wrong-password")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    User::set_status(&ctx.db, buyer.id, UserStatus::Archived).await.unwrap();
    let response = ctx
        .send(post_form(
            "/login",
            None,
            &[("email", &buyer.email), ("password", &password)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_archived_user_loses_session() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let cookie = session_cookie(&buyer);

    let response = ctx.send(get("/cart", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    User::set_status(&ctx.db, buyer.id, UserStatus::Archived).await.unwrap();
    let response = ctx.send(get("/cart", Some(&cookie))).await;
    assert_redirect(&response, "/login?next=%2Fcart");
}

#[tokio::test]
async fn test_role_gates() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let (admin, _) = create_user(&ctx.db, Role::Admin).await;
    let buyer_cookie = session_cookie(&buyer);
    let admin_cookie = session_cookie(&admin);

    let response = ctx.send(get("/seller_dashboard", Some(&buyer_cookie))).await;
    assert_redirect(&response, "/login");

    let response = ctx.send(get("/admin/dashboard", Some(&buyer_cookie))).await;
    assert_redirect(&response, "/login");

    // Admins don't shop
    let response = ctx.send(get("/buyer_dashboard", Some(&admin_cookie))).await;
    assert_redirect(&response, "/login");

    let response = ctx.send(get("/admin/dashboard", Some(&admin_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_flow() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let (seller, _) = create_user(&ctx.db, Role::Seller).await;
    let cookie = session_cookie(&buyer);
    let address = create_address(&ctx.db, &buyer).await;
    let pen = create_product(&ctx.db, &seller, 250).await;
    let pad = create_product(&ctx.db, &seller, 1000).await;

    for (product, qty) in [(&pen, "2"), (&pad, "1")] {
        let response = ctx
            .send(post_form(
                "/_cart",
                Some(&cookie),
                &[("product_id", &product.id.to_string()), ("quantity", qty)],
            ))
            .await;
        assert_redirect(&response, "/cart");
    }

    let response = ctx.send(get("/cart", Some(&cookie))).await;
    let body = json_body(response).await;
    assert_eq!(body["total_cents"], 1500);

    // Review only the pen
    let selected = format!("[{}]", pen.id);
    let response = ctx
        .send(post_form("/checkout", Some(&cookie), &[("selected_items", &selected)]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_cents"], 500);
    assert_eq!(body["addresses"][0]["id"], address.id);

    let response = ctx
        .send(post_form(
            "/place_order",
            Some(&cookie),
            &[
                ("address_id", &address.id.to_string()),
                ("payment_method", "cash"),
                ("selected_items", &selected),
            ],
        ))
        .await;
    assert_redirect(&response, "/orders_dashboard");

    let orders = Order::list_for_user(&ctx.db, buyer.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_amount_cents, 500);

    let remaining: Vec<i64> = CartItem::list_for_user(&ctx.db, buyer.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.product_id)
        .collect();
    assert_eq!(remaining, vec![pad.id]);

    let response = ctx.send(get("/orders_dashboard", Some(&cookie))).await;
    let body = json_body(response).await;
    assert_eq!(body["groups"][0]["status"], "Pending");
    assert_eq!(body["groups"][0]["orders"][0]["id"], orders[0].id);
    assert_eq!(body["groups"][0]["orders"][0]["lines"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let cookie = session_cookie(&buyer);
    let address = create_address(&ctx.db, &buyer).await;

    let response = ctx
        .send(post_form("/checkout", Some(&cookie), &[("selected_items", "[]")]))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "empty_selection");

    let response = ctx
        .send(post_form(
            "/place_order",
            Some(&cookie),
            &[
                ("address_id", &address.id.to_string()),
                ("payment_method", "cash"),
                ("selected_items", "[999999999]"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(Order::list_for_user(&ctx.db, buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seller_fulfillment_and_buyer_cancel() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let (seller, _) = create_user(&ctx.db, Role::Seller).await;
    let (other_seller, _) = create_user(&ctx.db, Role::Seller).await;
    let buyer_cookie = session_cookie(&buyer);
    let seller_cookie = session_cookie(&seller);
    let other_cookie = session_cookie(&other_seller);

    let address = create_address(&ctx.db, &buyer).await;
    let product = create_product(&ctx.db, &seller, 300).await;
    ctx.send(post_form(
        "/_cart",
        Some(&buyer_cookie),
        &[("product_id", &product.id.to_string())],
    ))
    .await;
    ctx.send(post_form(
        "/place_order",
        Some(&buyer_cookie),
        &[
            ("address_id", &address.id.to_string()),
            ("payment_method", "card"),
            ("selected_items", &format!("[{}]", product.id)),
        ],
    ))
    .await;
    let order = Order::list_for_user(&ctx.db, buyer.id).await.unwrap().remove(0);

    // A seller with no lines in the order can't touch it
    let response = ctx
        .send(post_form(
            "/update_order_status",
            Some(&other_cookie),
            &[("order_id", &order.id.to_string()), ("status", "Shipped")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .send(post_form(
            "/update_order_status",
            Some(&seller_cookie),
            &[("order_id", &order.id.to_string()), ("status", "Shipped")],
        ))
        .await;
    assert_redirect(&response, "/seller_orders");
    let reloaded = Order::find_by_id(&ctx.db, order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Shipped);

    let response = ctx.send(get("/seller_orders", Some(&seller_cookie))).await;
    let body = json_body(response).await;
    assert_eq!(body[0]["order_id"], order.id);
    assert_eq!(body[0]["lines"][0]["seller_status"], "Shipped");

    // Someone else's order looks missing
    let (stranger, _) = create_user(&ctx.db, Role::Buyer).await;
    let response = ctx
        .send(post_form(
            &format!("/cancel_order/{}", order.id),
            Some(&session_cookie(&stranger)),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .send(post_form(&format!("/cancel_order/{}", order.id), Some(&buyer_cookie), &[]))
        .await;
    assert_redirect(&response, "/orders_dashboard");
    let reloaded = Order::find_by_id(&ctx.db, order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Cancelled);

    // Cancelled orders are frozen for sellers
    let response = ctx
        .send(post_form(
            "/update_order_status",
            Some(&seller_cookie),
            &[("order_id", &order.id.to_string()), ("status", "Delivered")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_seller_product_management() {
    let Some(ctx) = TestContext::new().await else { return };

    let (seller, _) = create_user(&ctx.db, Role::Seller).await;
    let (other, _) = create_user(&ctx.db, Role::Seller).await;
    let cookie = session_cookie(&seller);
    let product = create_product(&ctx.db, &seller, 100).await;

    let response = ctx
        .send(post_form(
            &format!("/edit_product/{}", product.id),
            Some(&cookie),
            &[
                ("product_name", "Renamed"),
                ("size", "A3"),
                ("pages", "10"),
                ("stock", "7"),
                ("price", "3.25"),
            ],
        ))
        .await;
    assert_redirect(&response, "/seller_dashboard");

    let response = ctx
        .send(get(&format!("/edit_product/{}", product.id), Some(&cookie)))
        .await;
    let body = json_body(response).await;
    assert_eq!(body["product_name"], "Renamed");
    assert_eq!(body["price_cents"], 325);

    // Not visible to another seller
    let response = ctx
        .send(get(
            &format!("/edit_product/{}", product.id),
            Some(&session_cookie(&other)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .send(post_form(&format!("/archive_product/{}", product.id), Some(&cookie), &[]))
        .await;
    assert_redirect(&response, "/seller_dashboard");

    let response = ctx.send(get("/seller_dashboard", Some(&cookie))).await;
    let body = json_body(response).await;
    assert_eq!(body["products"][0]["is_archive"], true);
    assert_eq!(body["metrics"]["total_stock"], 0);
}

#[tokio::test]
async fn test_admin_moderation() {
    let Some(ctx) = TestContext::new().await else { return };

    let (admin, _) = create_user(&ctx.db, Role::Admin).await;
    let (user, _) = create_user(&ctx.db, Role::Buyer).await;
    let cookie = session_cookie(&admin);

    let response = ctx
        .send(post_form(
            &format!("/admin/change_role/{}", user.id),
            Some(&cookie),
            &[("role", "seller")],
        ))
        .await;
    assert_redirect(&response, "/admin/dashboard");
    let reloaded = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.role, Role::Seller);

    let response = ctx
        .send(post_form(
            &format!("/admin/change_role/{}", user.id),
            Some(&cookie),
            &[("role", "overlord")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .send(post_form(&format!("/admin/archive_user/{}", user.id), Some(&cookie), &[]))
        .await;
    assert_redirect(&response, "/admin/dashboard");
    let reloaded = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, UserStatus::Archived);

    let response = ctx
        .send(post_form(&format!("/admin/unarchive_user/{}", user.id), Some(&cookie), &[]))
        .await;
    assert_redirect(&response, "/admin/dashboard");

    let response = ctx
        .send(post_form(&format!("/admin/archive_user/{}", admin.id), Some(&cookie), &[]))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_settings() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, password) = create_user(&ctx.db, Role::Buyer).await;
    let (other, _) = create_user(&ctx.db, Role::Buyer).await;
    let cookie = session_cookie(&buyer);

    let response = ctx
        .send(post_json(
            "/update-profile",
            Some(&cookie),
            json!({ "name": buyer.name, "email": other.email }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let new_email = format!("renamed-{}@example.com", uuid::Uuid::new_v4().simple());
    let response = ctx
        .send(post_json(
            "/update-profile",
            Some(&cookie),
            json!({ "name": buyer.name, "email": new_email }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reloaded = User::find_by_id(&ctx.db, buyer.id).await.unwrap().unwrap();
    assert_eq!(reloaded.email, new_email);

    let response = ctx
        .send(post_json(
            "/change-password",
            Some(&cookie),
            json!({ "currentPassword": "wrong-password", "newPassword": "another-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(post_json(
            "/change-password",
            Some(&cookie),
            json!({ "currentPassword": password, "newPassword": "another-long-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_addresses() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let (other, _) = create_user(&ctx.db, Role::Buyer).await;
    let cookie = session_cookie(&buyer);

    let response = ctx
        .send(post_form(
            "/add_address",
            Some(&cookie),
            &[("name", "Home"), ("address", "3 Elm Road"), ("phone", "555-0102")],
        ))
        .await;
    assert_redirect(&response, "/addresses_dashboard");

    let response = ctx.send(get("/addresses_dashboard", Some(&cookie))).await;
    let body = json_body(response).await;
    let address_id = body[0]["id"].as_i64().unwrap();
    assert_eq!(body[0]["address"], "3 Elm Road");

    let response = ctx
        .send(post_form(
            &format!("/delete_address/{address_id}"),
            Some(&session_cookie(&other)),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .send(post_form(&format!("/delete_address/{address_id}"), Some(&cookie), &[]))
        .await;
    assert_redirect(&response, "/addresses_dashboard");
}

#[tokio::test]
async fn test_health() {
    let Some(ctx) = TestContext::new().await else { return };

    let response = ctx.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_overlong_payment_method_is_a_validation_error() {
    let Some(ctx) = TestContext::new().await else { return };

    let (buyer, _) = create_user(&ctx.db, Role::Buyer).await;
    let (seller, _) = create_user(&ctx.db, Role::Seller).await;
    let cookie = session_cookie(&buyer);
    let address = create_address(&ctx.db, &buyer).await;
    let product = create_product(&ctx.db, &seller, 100).await;
    ctx.send(post_form(
        "/_cart",
        Some(&cookie),
        &[("product_id", &product.id.to_string())],
    ))
    .await;

    let response = ctx
        .send(post_form(
            "/place_order",
            Some(&cookie),
            &[
                ("address_id", &address.id.to_string()),
                ("payment_method", &"p".repeat(51)),
                ("selected_items", &format!("[{}]", product.id)),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["details"][0]["field"], "payment_method");

    assert!(Order::list_for_user(&ctx.db, buyer.id).await.unwrap().is_empty());
    assert_eq!(CartItem::list_for_user(&ctx.db, buyer.id).await.unwrap().len(), 1);
}
