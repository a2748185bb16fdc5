use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::campaign_model::{CampaignListRow, CampaignRow, CampaignStatus};
use crate::models::payment_model::{commission_for, insert_payment, NewPayment};
use crate::services::telebirr::{ChargeRequest, TelebirrClient, CURRENCY};
use crate::types::campaign_types::{
    page_offset, parse_deadline, total_pages, CampaignFilter, CampaignListQuery,
    CampaignListResponse, CampaignView, CreateCampaignRequest,
};
use crate::utils::jwt::authenticated_user_id;

const LIST_SELECT: &str = "SELECT c.id, c.title, c.description, c.industry, c.budget, \
     c.tiktok_url, c.performance_model, c.deadline, c.status, c.created_at, \
     u.id AS creator_id, u.name AS creator_name, u.tiktok_url AS creator_tiktok_url, \
     (SELECT COUNT(*) FROM campaign_applications a WHERE a.campaign_id = c.id) AS applications \
     FROM campaigns c JOIN users u ON u.id = c.creator_id";

#[get("/campaigns")]
pub async fn get_campaigns(
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    query: web::Query<CampaignListQuery>,
) -> impl Responder {
    let page = query.page();
    let limit = query.limit();
    let filter = CampaignFilter::from_query(&query, &config.budget_thresholds);

    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns c");
    filter.push_where(&mut count_builder);
    let total = match count_builder
        .build_query_scalar::<i64>()
        .fetch_one(db_pool.get_ref())
        .await
    {
        Ok(total) => total,
        Err(err) => {
            error!("campaign count query failed: {err}");
            return list_failure(page);
        }
    };

    let mut list_builder = QueryBuilder::<Postgres>::new(LIST_SELECT);
    filter.push_where(&mut list_builder);
    list_builder
        .push(" ORDER BY c.created_at DESC, c.id DESC LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(page_offset(page, limit));

    let rows = match list_builder
        .build_query_as::<CampaignListRow>()
        .fetch_all(db_pool.get_ref())
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            error!("campaign listing query failed: {err}");
            return list_failure(page);
        }
    };

    HttpResponse::Ok().json(CampaignListResponse {
        campaigns: rows.into_iter().map(CampaignView::from).collect(),
        total,
        page,
        pages: total_pages(total, limit),
    })
}

/// A failed listing is reported as a failure with an empty result set, never
/// dressed up as data.
fn list_failure(page: u32) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "campaigns": [],
        "total": 0,
        "page": page,
        "pages": 1,
        "error": "Failed to fetch campaigns"
    }))
}

#[post("/campaigns")]
pub async fn create_campaign(
    req: HttpRequest,
    db_pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    telebirr: web::Data<TelebirrClient>,
    body: web::Json<CreateCampaignRequest>,
) -> Result<HttpResponse, ApiError> {
    let creator_id = authenticated_user_id(&req)?;

    let input = body.into_inner();
    input
        .validate()
        .map_err(|errors| ApiError::from_validation(&errors))?;
    let deadline = parse_deadline(&input.deadline).ok_or_else(|| {
        ApiError::Validation(vec![crate::error::FieldError::new(
            "deadline",
            "Valid deadline is required",
        )])
    })?;

    let campaign = sqlx::query_as::<_, CampaignRow>(
        r#"
        INSERT INTO campaigns (title, description, industry, budget, tiktok_url,
                               performance_model, deadline, creator_id, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, title, description, industry, budget, tiktok_url, performance_model,
                  deadline, creator_id, status, created_at
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.industry)
    .bind(input.budget)
    .bind(&input.tiktok_url)
    .bind(&input.performance_model)
    .bind(deadline)
    .bind(creator_id)
    .bind(CampaignStatus::Pending.as_str())
    .fetch_one(db_pool.get_ref())
    .await?;

    let commission = commission_for(campaign.budget, config.commission_rate);
    let charge = ChargeRequest {
        amount: campaign.budget + commission,
        currency: CURRENCY,
        description: format!("Campaign: {}", campaign.title),
        user_id: creator_id,
        idempotency_key: campaign.id.to_string(),
    };

    // The campaign row is already committed; if the charge fails it stays
    // pending with no payment row and the reconciler picks it up.
    let receipt = telebirr.initiate_charge(&charge).await.map_err(|err| {
        error!("payment charge failed for campaign {}: {err}", campaign.id);
        ApiError::ExternalProvider(err.to_string())
    })?;

    let payment = NewPayment {
        campaign_id: campaign.id,
        user_id: creator_id,
        amount: charge.amount,
        commission,
        telebirr_transaction_id: receipt.transaction_id.clone(),
    };
    insert_payment(db_pool.get_ref(), &payment)
        .await
        .map_err(|err| {
            error!(
                "payment row insert for campaign {} (transaction {}) failed: {err}",
                campaign.id, receipt.transaction_id
            );
            ApiError::Persistence(err)
        })?;

    Ok(HttpResponse::Ok().json(json!({ "paymentUrl": receipt.payment_url })))
}

#[post("/campaigns/{campaign_id}/apply")]
pub async fn apply_to_campaign(
    req: HttpRequest,
    db_pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticated_user_id(&req)?;
    let campaign_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .fetch_optional(db_pool.get_ref())
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Campaign not found".to_string()));
    }

    // Applications are a set: re-applying is a no-op, never a double count.
    sqlx::query(
        "INSERT INTO campaign_applications (campaign_id, user_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(campaign_id)
    .bind(user_id)
    .execute(db_pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Application recorded" })))
}
