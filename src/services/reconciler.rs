use chrono::{Duration as ChronoDuration, Utc};
use log::{error, info, warn};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::models::campaign_model::{CampaignRow, CampaignStatus};
use crate::models::payment_model::{commission_for, insert_payment, NewPayment};
use crate::services::telebirr::{ChargeRequest, TelebirrClient, CURRENCY};

/// A campaign persists before the provider charge, so a provider failure
/// leaves it `pending` with no payment row. This sweep finds those orphans
/// once they are older than the grace period and retries the charge; the
/// campaign id as idempotency key keeps the retry from double-charging.
pub fn spawn(pool: PgPool, client: TelebirrClient, config: AppConfig) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.reconcile_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep(&pool, &client, &config).await {
                Ok(0) => {}
                Ok(recovered) => info!("reconciled {recovered} orphaned campaigns"),
                Err(err) => error!("reconciliation sweep failed: {err}"),
            }
        }
    });
}

pub async fn sweep(
    pool: &PgPool,
    client: &TelebirrClient,
    config: &AppConfig,
) -> Result<u32, sqlx::Error> {
    let cutoff = Utc::now() - ChronoDuration::seconds(config.reconcile_grace.as_secs() as i64);

    let orphans = sqlx::query_as::<_, CampaignRow>(
        r#"
        SELECT id, title, description, industry, budget, tiktok_url, performance_model,
               deadline, creator_id, status, created_at
        FROM campaigns c
        WHERE c.status = $1
          AND c.created_at < $2
          AND NOT EXISTS (SELECT 1 FROM payments p WHERE p.campaign_id = c.id)
        ORDER BY c.created_at ASC
        LIMIT 20
        "#,
    )
    .bind(CampaignStatus::Pending.as_str())
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut recovered = 0;
    for campaign in orphans {
        let commission = commission_for(campaign.budget, config.commission_rate);
        let charge = ChargeRequest {
            amount: campaign.budget + commission,
            currency: CURRENCY,
            description: format!("Campaign: {}", campaign.title),
            user_id: campaign.creator_id,
            idempotency_key: campaign.id.to_string(),
        };

        let receipt = match client.initiate_charge(&charge).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!("charge retry for campaign {} failed: {err}", campaign.id);
                continue;
            }
        };

        let payment = NewPayment {
            campaign_id: campaign.id,
            user_id: campaign.creator_id,
            amount: charge.amount,
            commission,
            telebirr_transaction_id: receipt.transaction_id.clone(),
        };
        if let Err(err) = insert_payment(pool, &payment).await {
            error!(
                "payment insert for campaign {} (transaction {}) failed: {err}",
                campaign.id, receipt.transaction_id
            );
            continue;
        }
        recovered += 1;
    }

    Ok(recovered)
}
