use std::time::Duration;

use log::warn;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

/// All campaign budgets are denominated in Ethiopian birr.
pub const CURRENCY: &str = "ETB";

#[derive(Debug, Error)]
pub enum TelebirrError {
    #[error("request to payment provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider returned status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub currency: &'static str,
    pub description: String,
    pub user_id: i64,
    /// Campaign id. The provider treats repeated charges under one key as a
    /// single charge, so retries are exactly-once-effective.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub payment_url: String,
}

/// HTTP client for the (mocked) Telebirr charge API. Carries an explicit
/// request timeout and a bounded linear-backoff retry budget.
#[derive(Clone)]
pub struct TelebirrClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl TelebirrClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.provider_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.telebirr_api_url.trim_end_matches('/').to_string(),
            api_key: config.telebirr_api_key.clone(),
            max_attempts: config.provider_max_attempts.max(1),
            retry_delay: config.provider_retry_delay,
        })
    }

    pub async fn initiate_charge(
        &self,
        charge: &ChargeRequest,
    ) -> Result<ChargeReceipt, TelebirrError> {
        let url = format!("{}/payment", self.base_url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post_charge(&url, charge).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "charge attempt {attempt} for key {} failed: {err}",
                        charge.idempotency_key
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_charge(
        &self,
        url: &str,
        charge: &ChargeRequest,
    ) -> Result<ChargeReceipt, TelebirrError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(charge)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TelebirrError::Status(response.status()));
        }
        Ok(response.json::<ChargeReceipt>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn charge_request_serializes_to_provider_wire_shape() {
        let charge = ChargeRequest {
            amount: dec!(1100),
            currency: CURRENCY,
            description: "Campaign: X".to_string(),
            user_id: 7,
            idempotency_key: "42".to_string(),
        };
        let body = serde_json::to_value(&charge).unwrap();
        assert_eq!(body["currency"], "ETB");
        assert_eq!(body["userId"], 7);
        assert_eq!(body["idempotencyKey"], "42");
        assert_eq!(body["description"], "Campaign: X");
    }

    #[test]
    fn charge_receipt_parses_provider_response() {
        let receipt: ChargeReceipt = serde_json::from_str(
            r#"{"transactionId": "tx1", "paymentUrl": "https://mock.telebirr.com/pay"}"#,
        )
        .unwrap();
        assert_eq!(receipt.transaction_id, "tx1");
        assert_eq!(receipt.payment_url, "https://mock.telebirr.com/pay");
    }
}
