/// Database models for Storefront
///
/// This module contains all database models and their queries.
///
/// # Models
///
/// - `user`: Accounts with role (buyer/seller/admin) and status
/// - `category`: Product categories
/// - `product`: Seller-owned catalog entries
/// - `address`: Buyer shipping addresses
/// - `cart`: Cart lines, unique per (user, product)
/// - `order`: Orders, order items and the status vocabulary
/// - `seller_request`: Seller onboarding requests reviewed by admins
///
/// Status-like columns are stored as text and decoded into enums through
/// `TryFrom<String>`, which reports unknown values as [`UnknownVariant`].

pub mod address;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod seller_request;
pub mod user;

/// A text column held a value that maps to no enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Enum being decoded
    pub kind: &'static str,

    /// Offending value
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
