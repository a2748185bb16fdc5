use actix_web::{post, web, HttpResponse};
use log::warn;
use serde_json::json;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::campaign_model::CampaignStatus;
use crate::models::payment_model::{PaymentRow, PaymentStatus};
use crate::types::payment_types::{callback_disposition, CallbackDisposition, PaymentCallbackRequest};

/// Telebirr notifies us here once the payer finishes (or abandons) the charge.
/// The payment flip is a single conditional update, so replayed or concurrent
/// deliveries for one transaction cannot apply twice; only the delivery that
/// performed the flip may activate the campaign.
#[post("/payments/callback")]
pub async fn payment_callback(
    db_pool: web::Data<PgPool>,
    body: web::Json<PaymentCallbackRequest>,
) -> Result<HttpResponse, ApiError> {
    let mapped = PaymentStatus::from_provider(&body.status);

    let flipped = sqlx::query_as::<_, PaymentRow>(
        r#"
        UPDATE payments
        SET status = $1
        WHERE telebirr_transaction_id = $2 AND status = $3
        RETURNING id, campaign_id, user_id, amount, commission, telebirr_transaction_id,
                  status, created_at
        "#,
    )
    .bind(mapped.as_str())
    .bind(&body.transaction_id)
    .bind(PaymentStatus::Pending.as_str())
    .fetch_optional(db_pool.get_ref())
    .await?;

    let payment = match flipped {
        Some(payment) => payment,
        None => return absorb_or_reject(db_pool.get_ref(), &body.transaction_id, mapped).await,
    };

    if mapped == PaymentStatus::Completed {
        let activated = sqlx::query("UPDATE campaigns SET status = $1 WHERE id = $2 AND status = $3")
            .bind(CampaignStatus::Active.as_str())
            .bind(payment.campaign_id)
            .bind(CampaignStatus::Pending.as_str())
            .execute(db_pool.get_ref())
            .await?;
        if activated.rows_affected() == 0 {
            warn!(
                "campaign {} was not pending when payment {} completed",
                payment.campaign_id, payment.id
            );
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Payment status updated" })))
}

/// The guarded update matched nothing: either the transaction is unknown, or
/// the payment is already terminal and this delivery is a replay (or a
/// contradiction, which is logged but still absorbed; terminal states never
/// transition).
async fn absorb_or_reject(
    pool: &PgPool,
    transaction_id: &str,
    incoming: PaymentStatus,
) -> Result<HttpResponse, ApiError> {
    let existing = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, campaign_id, user_id, amount, commission, telebirr_transaction_id,
               status, created_at
        FROM payments
        WHERE telebirr_transaction_id = $1
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;

    let payment = existing.ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    let disposition = PaymentStatus::parse(&payment.status)
        .map(|stored| callback_disposition(stored, incoming));
    if disposition != Some(CallbackDisposition::AlreadyApplied) {
        warn!(
            "conflicting callback for transaction {transaction_id}: stored {}, delivered {}",
            payment.status,
            incoming.as_str()
        );
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Payment already processed" })))
}
