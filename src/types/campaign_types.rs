use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use url::Url;
use validator::{Validate, ValidationError};

use crate::config::BudgetThresholds;
use crate::models::campaign_model::CampaignListRow;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Billing basis for a campaign: cost per acquisition, click, engagement, or
/// a fixed fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceModel {
    Cpa,
    Cpc,
    Cpe,
    Fixed,
}

impl PerformanceModel {
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceModel::Cpa => "cpa",
            PerformanceModel::Cpc => "cpc",
            PerformanceModel::Cpe => "cpe",
            PerformanceModel::Fixed => "fixed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cpa" => Some(PerformanceModel::Cpa),
            "cpc" => Some(PerformanceModel::Cpc),
            "cpe" => Some(PerformanceModel::Cpe),
            "fixed" => Some(PerformanceModel::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Industry is required"))]
    pub industry: String,
    #[validate(custom(function = validate_budget))]
    pub budget: Decimal,
    #[validate(custom(function = validate_tiktok_url))]
    pub tiktok_url: String,
    #[validate(custom(function = validate_performance_model))]
    pub performance_model: String,
    #[validate(custom(function = validate_deadline))]
    pub deadline: String,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_budget(budget: &Decimal) -> Result<(), ValidationError> {
    if *budget > Decimal::ZERO {
        Ok(())
    } else {
        Err(invalid("budget", "Budget must be a positive number"))
    }
}

fn validate_tiktok_url(raw: &str) -> Result<(), ValidationError> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|_| invalid("tiktok_url", "Valid TikTok URL is required"))
}

fn validate_performance_model(raw: &str) -> Result<(), ValidationError> {
    PerformanceModel::parse(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("performance_model", "Invalid performance model"))
}

fn validate_deadline(raw: &str) -> Result<(), ValidationError> {
    parse_deadline(raw)
        .map(|_| ())
        .ok_or_else(|| invalid("deadline", "Valid deadline is required"))
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Coarse budget grouping used by the listing filter. Ranges are half-open
/// `[min, max)`, so a budget exactly at a threshold lands in exactly one
/// bucket (the upper one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetBucket {
    Micro,
    Small,
    Medium,
    Large,
}

impl BudgetBucket {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "micro" => Some(BudgetBucket::Micro),
            "small" => Some(BudgetBucket::Small),
            "medium" => Some(BudgetBucket::Medium),
            "large" => Some(BudgetBucket::Large),
            _ => None,
        }
    }

    /// Inclusive lower and exclusive upper bound for this bucket.
    pub fn range(self, thresholds: &BudgetThresholds) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            BudgetBucket::Micro => (None, Some(thresholds.micro_max)),
            BudgetBucket::Small => (Some(thresholds.micro_max), Some(thresholds.small_max)),
            BudgetBucket::Medium => (Some(thresholds.small_max), Some(thresholds.medium_max)),
            BudgetBucket::Large => (Some(thresholds.medium_max), None),
        }
    }

    pub fn containing(budget: Decimal, thresholds: &BudgetThresholds) -> Self {
        if budget < thresholds.micro_max {
            BudgetBucket::Micro
        } else if budget < thresholds.small_max {
            BudgetBucket::Small
        } else if budget < thresholds.medium_max {
            BudgetBucket::Medium
        } else {
            BudgetBucket::Large
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CampaignListQuery {
    pub industry: Option<String>,
    pub budget: Option<String>,
    pub performance: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CampaignListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }
}

/// Resolved listing filter: bucket names are already translated to numeric
/// bounds, so query assembly is a plain AND chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignFilter {
    pub industry: Option<String>,
    pub performance: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
}

impl CampaignFilter {
    /// Unknown bucket names add no budget clause; industry and performance
    /// are exact matches against the stored fields.
    pub fn from_query(query: &CampaignListQuery, thresholds: &BudgetThresholds) -> Self {
        let (budget_min, budget_max) = query
            .budget
            .as_deref()
            .and_then(BudgetBucket::parse)
            .map(|bucket| bucket.range(thresholds))
            .unwrap_or((None, None));
        Self {
            industry: query.industry.clone().filter(|s| !s.is_empty()),
            performance: query.performance.clone().filter(|s| !s.is_empty()),
            budget_min,
            budget_max,
        }
    }

    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut prefix = " WHERE ";
        if let Some(industry) = &self.industry {
            builder.push(prefix).push("c.industry = ").push_bind(industry.clone());
            prefix = " AND ";
        }
        if let Some(performance) = &self.performance {
            builder
                .push(prefix)
                .push("c.performance_model = ")
                .push_bind(performance.clone());
            prefix = " AND ";
        }
        if let Some(min) = self.budget_min {
            builder.push(prefix).push("c.budget >= ").push_bind(min);
            prefix = " AND ";
        }
        if let Some(max) = self.budget_max {
            builder.push(prefix).push("c.budget < ").push_bind(max);
        }
    }
}

pub fn page_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(limit)
}

/// Never 0: an empty listing still has one (empty) page.
pub fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit);
    ((total + limit - 1) / limit).max(1)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorView {
    pub id: i64,
    pub name: String,
    pub tiktok_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignView {
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
    pub applications: i64,
    pub creator: CreatorView,
}

impl From<CampaignListRow> for CampaignView {
    fn from(row: CampaignListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            industry: row.industry,
            budget: row.budget,
            tiktok_url: row.tiktok_url,
            performance_model: row.performance_model,
            deadline: row.deadline,
            status: row.status,
            created_at: row.created_at,
            applications: row.applications,
            creator: CreatorView {
                id: row.creator_id,
                name: row.creator_name,
                tiktok_url: row.creator_tiktok_url,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignView>,
    pub total: i64,
    pub page: u32,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn thresholds() -> BudgetThresholds {
        BudgetThresholds::default()
    }

    fn query(
        industry: Option<&str>,
        budget: Option<&str>,
        performance: Option<&str>,
    ) -> CampaignListQuery {
        CampaignListQuery {
            industry: industry.map(String::from),
            budget: budget.map(String::from),
            performance: performance.map(String::from),
            page: None,
            limit: None,
        }
    }

    #[test]
    fn threshold_value_lands_in_exactly_one_bucket() {
        let t = thresholds();
        assert_eq!(BudgetBucket::containing(dec!(15000), &t), BudgetBucket::Small);
        assert_eq!(BudgetBucket::containing(dec!(100000), &t), BudgetBucket::Medium);
        assert_eq!(BudgetBucket::containing(dec!(300000), &t), BudgetBucket::Large);
        assert_eq!(BudgetBucket::containing(dec!(14999.99), &t), BudgetBucket::Micro);
        assert_eq!(BudgetBucket::containing(dec!(299999.99), &t), BudgetBucket::Medium);
    }

    #[test]
    fn bucket_ranges_are_half_open() {
        let t = thresholds();
        assert_eq!(BudgetBucket::Micro.range(&t), (None, Some(dec!(15000))));
        assert_eq!(
            BudgetBucket::Small.range(&t),
            (Some(dec!(15000)), Some(dec!(100000)))
        );
        assert_eq!(
            BudgetBucket::Medium.range(&t),
            (Some(dec!(100000)), Some(dec!(300000)))
        );
        assert_eq!(BudgetBucket::Large.range(&t), (Some(dec!(300000)), None));
    }

    #[test]
    fn unknown_bucket_adds_no_budget_clause() {
        let filter = CampaignFilter::from_query(&query(None, Some("huge"), None), &thresholds());
        assert_eq!(filter.budget_min, None);
        assert_eq!(filter.budget_max, None);
    }

    #[test]
    fn filter_assembles_and_chain() {
        let filter = CampaignFilter::from_query(
            &query(Some("tech"), Some("large"), Some("cpc")),
            &thresholds(),
        );
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns c");
        filter.push_where(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM campaigns c WHERE c.industry = $1 \
             AND c.performance_model = $2 AND c.budget >= $3"
        );
    }

    #[test]
    fn empty_filter_adds_no_where() {
        let filter = CampaignFilter::from_query(&query(None, None, None), &thresholds());
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns c");
        filter.push_where(&mut builder);
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM campaigns c");
    }

    #[test]
    fn medium_bucket_binds_both_bounds() {
        let filter = CampaignFilter::from_query(&query(None, Some("medium"), None), &thresholds());
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns c");
        filter.push_where(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM campaigns c WHERE c.budget >= $1 AND c.budget < $2"
        );
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let mut q = query(None, None, None);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        q.page = Some(0);
        q.limit = Some(0);
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 1);
    }

    #[test]
    fn page_math() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn deadline_accepts_date_and_rfc3339() {
        assert!(parse_deadline("2030-01-01").is_some());
        assert!(parse_deadline("2030-01-01T12:30:00Z").is_some());
        assert!(parse_deadline("2030-01-01T12:30:00+03:00").is_some());
        assert!(parse_deadline("next friday").is_none());
        assert!(parse_deadline("2030-13-40").is_none());
    }

    fn valid_request() -> CreateCampaignRequest {
        CreateCampaignRequest {
            title: "X".to_string(),
            description: "d".to_string(),
            industry: "tech".to_string(),
            budget: dec!(1000),
            tiktok_url: "https://t.co/x".to_string(),
            performance_model: "cpc".to_string(),
            deadline: "2030-01-01".to_string(),
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn each_bad_field_is_reported_by_name() {
        let mut request = valid_request();
        request.title = String::new();
        request.budget = dec!(0);
        request.tiktok_url = "not a url".to_string();
        request.performance_model = "cpm".to_string();
        request.deadline = "soon".to_string();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("budget"));
        assert!(fields.contains_key("tiktok_url"));
        assert!(fields.contains_key("performance_model"));
        assert!(fields.contains_key("deadline"));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn negative_budget_is_rejected() {
        let mut request = valid_request();
        request.budget = dec!(-50);
        assert!(request.validate().is_err());
    }

    #[test]
    fn performance_model_is_a_closed_set() {
        for model in ["cpa", "cpc", "cpe", "fixed"] {
            assert!(PerformanceModel::parse(model).is_some());
        }
        assert!(PerformanceModel::parse("CPA").is_none());
        assert!(PerformanceModel::parse("cpm").is_none());
    }
}
