pub mod campaign_model;
pub mod payment_model;
