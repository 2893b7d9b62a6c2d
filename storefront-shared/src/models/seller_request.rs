/// Seller onboarding requests
///
/// A buyer submits a request with business details and two uploaded
/// documents. An admin either approves it, which promotes the requesting
/// user to the seller role, or rejects it. Only pending requests can be
/// reviewed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::user::{Role, User};
use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl SellerRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerRequestStatus::Pending => "pending",
            SellerRequestStatus::Approved => "approved",
            SellerRequestStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for SellerRequestStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(SellerRequestStatus::Pending),
            "approved" => Ok(SellerRequestStatus::Approved),
            "rejected" => Ok(SellerRequestStatus::Rejected),
            _ => Err(UnknownVariant::new("seller request status", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SellerRequest {
    pub id: i64,

    /// Applicant
    pub user_id: i64,

    pub business_name: String,
    pub contact_number: String,
    pub email: String,

    /// Uploaded identity document (filename in the upload directory)
    pub id_proof: Option<String>,

    pub profile_description: String,
    pub payment_details: String,

    /// Uploaded sample product photo (filename in the upload directory)
    pub product_photo: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: SellerRequestStatus,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateSellerRequest {
    pub business_name: String,
    pub contact_number: String,
    pub email: String,
    pub id_proof: Option<String>,
    pub profile_description: String,
    pub payment_details: String,
    pub product_photo: Option<String>,
}

const REQUEST_COLUMNS: &str = "id, user_id, business_name, contact_number, email, id_proof, \
                               profile_description, payment_details, product_photo, status, created_at";

impl SellerRequest {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        data: CreateSellerRequest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SellerRequest>(&format!(
            r#"
            INSERT INTO seller_requests
                (user_id, business_name, contact_number, email, id_proof,
                 profile_description, payment_details, product_photo, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(data.business_name)
        .bind(data.contact_number)
        .bind(data.email)
        .bind(data.id_proof)
        .bind(data.profile_description)
        .bind(data.payment_details)
        .bind(data.product_photo)
        .fetch_one(pool)
        .await
    }

    /// Requests awaiting review, oldest first
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SellerRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM seller_requests WHERE status = 'pending' ORDER BY created_at, id"
        ))
        .fetch_all(pool)
        .await
    }

    /// Approves a pending request and promotes its user to seller
    ///
    /// Both writes commit together. Returns `None` when the request doesn't
    /// exist or was already reviewed.
    pub async fn approve(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let request = sqlx::query_as::<_, SellerRequest>(&format!(
            r#"
            UPDATE seller_requests SET status = 'approved'
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            return Ok(None);
        };

        User::set_role(&mut *tx, request.user_id, Role::Seller).await?;
        tx.commit().await?;

        info!(request_id = id, user_id = request.user_id, "Seller request approved");
        Ok(Some(request))
    }

    /// Rejects a pending request
    pub async fn reject(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, SellerRequest>(&format!(
            r#"
            UPDATE seller_requests SET status = 'rejected'
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        if let Some(request) = &request {
            info!(request_id = id, user_id = request.user_id, "Seller request rejected");
        }

        Ok(request)
    }
}
