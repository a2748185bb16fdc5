pub mod campaign_types;
pub mod payment_types;
