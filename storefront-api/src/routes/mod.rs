/// Route handlers, one module per area
///
/// - `health`: health check
/// - `auth`: signup, login, logout
/// - `catalog`: buyer dashboard and categories
/// - `cart`, `checkout`, `orders`: the buying flow
/// - `seller`: seller dashboard, products and order fulfillment
/// - `registration`: buyer applications to become a seller
/// - `admin`: seller approval and user moderation
/// - `addresses`, `account`: address book and account settings
/// - `forms`: multipart form reading shared by the upload routes

pub mod account;
pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod forms;
pub mod health;
pub mod orders;
pub mod registration;
pub mod seller;
