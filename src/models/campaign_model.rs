use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign lifecycle. A campaign only becomes `Active` through a completed
/// payment; `Completed` is reached by an external collaborator (deadline
/// expiry or manual closure), never by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Active,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(CampaignStatus::Pending),
            "active" => Some(CampaignStatus::Active),
            "completed" => Some(CampaignStatus::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        matches!(
            (self, next),
            (CampaignStatus::Pending, CampaignStatus::Active)
                | (CampaignStatus::Active, CampaignStatus::Completed)
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub industry: String,
    pub budget: Decimal,
    pub tiktok_url: String,
    pub performance_model: String,
    pub deadline: DateTime<Utc>,
    pub creator_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Listing row: campaign joined with a partial creator view and the
/// application count. Only the creator's name and profile URL are exposed.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct CampaignListRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub industry: String,
    pub budget: Decimal,
    pub tiktok_url: String,
    pub performance_model: String,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub creator_id: i64,
    pub creator_name: String,
    pub creator_tiktok_url: Option<String>,
    pub applications: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_only_activates() {
        assert!(CampaignStatus::Pending.can_transition_to(CampaignStatus::Active));
        assert!(!CampaignStatus::Pending.can_transition_to(CampaignStatus::Completed));
        assert!(!CampaignStatus::Pending.can_transition_to(CampaignStatus::Pending));
    }

    #[test]
    fn no_reverse_transitions() {
        assert!(!CampaignStatus::Active.can_transition_to(CampaignStatus::Pending));
        assert!(!CampaignStatus::Completed.can_transition_to(CampaignStatus::Active));
        assert!(!CampaignStatus::Completed.can_transition_to(CampaignStatus::Pending));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            CampaignStatus::Pending,
            CampaignStatus::Active,
            CampaignStatus::Completed,
        ] {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CampaignStatus::parse("archived"), None);
    }
}
