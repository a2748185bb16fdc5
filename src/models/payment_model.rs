use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Payment lifecycle. Both `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    /// Telebirr reports "SUCCESS" for a settled charge; every other value is
    /// treated as a failure.
    pub fn from_provider(provider_status: &str) -> Self {
        if provider_status == "SUCCESS" {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }
}

pub fn commission_for(budget: Decimal, rate: Decimal) -> Decimal {
    budget * rate
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub commission: Decimal,
    pub telebirr_transaction_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub campaign_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub commission: Decimal,
    pub telebirr_transaction_id: String,
}

/// Shared by the creation workflow and the reconciler: both record the
/// provider's transaction with the payment still pending.
pub async fn insert_payment(pool: &PgPool, payment: &NewPayment) -> Result<PaymentRow, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments (campaign_id, user_id, amount, commission, telebirr_transaction_id, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, campaign_id, user_id, amount, commission, telebirr_transaction_id, status, created_at
        "#,
    )
    .bind(payment.campaign_id)
    .bind(payment.user_id)
    .bind(payment.amount)
    .bind(payment.commission)
    .bind(&payment.telebirr_transaction_id)
    .bind(PaymentStatus::Pending.as_str())
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn commission_and_amount_are_exact() {
        let budget = dec!(1000);
        let rate = dec!(0.1);
        let commission = commission_for(budget, rate);
        assert_eq!(commission, dec!(100));
        assert_eq!(budget + commission, dec!(1100));
    }

    #[test]
    fn commission_keeps_fractional_precision() {
        let commission = commission_for(dec!(333.33), dec!(0.10));
        assert_eq!(commission, dec!(33.333));
        assert_eq!(dec!(333.33) + commission, dec!(366.663));
    }

    #[test]
    fn provider_status_maps_to_internal() {
        assert_eq!(
            PaymentStatus::from_provider("SUCCESS"),
            PaymentStatus::Completed
        );
        assert_eq!(
            PaymentStatus::from_provider("FAILED"),
            PaymentStatus::Failed
        );
        assert_eq!(
            PaymentStatus::from_provider("CANCELLED"),
            PaymentStatus::Failed
        );
        assert_eq!(PaymentStatus::from_provider(""), PaymentStatus::Failed);
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Completed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }
}
