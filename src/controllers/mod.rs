pub mod campaign_controller;
pub mod payment_controller;
