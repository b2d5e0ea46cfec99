use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::apps::UsageRecord,
    domain::entities::{
        read_model::SubscriptionStatus, risk_state::RiskState, subscription::SubscriptionState,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{app_id}", delete(teardown_app))
        .route("/{app_id}/subscriptions", get(list_subscriptions))
        .route("/{app_id}/usage", get(list_usage))
        .route("/{app_id}/metrics", get(get_metrics))
        .route("/{app_id}/resync", post(resync_app))
}

/// Subscriptions are identified to clients by their partner GID.
#[derive(Debug, Serialize)]
struct SubscriptionStatusResponse {
    subscription_id: String,
    myshopify_domain: String,
    shop_name: String,
    plan_name: String,
    risk_state: RiskState,
    is_paid_current_cycle: bool,
    months_overdue: i32,
    last_successful_charge_date: Option<DateTime<Utc>>,
    expected_next_charge_date: Option<DateTime<Utc>>,
    status: SubscriptionState,
}

impl From<SubscriptionStatus> for SubscriptionStatusResponse {
    fn from(s: SubscriptionStatus) -> Self {
        Self {
            subscription_id: s.shopify_gid,
            myshopify_domain: s.myshopify_domain,
            shop_name: s.shop_name,
            plan_name: s.plan_name,
            risk_state: s.risk_state,
            is_paid_current_cycle: s.is_paid_current_cycle,
            months_overdue: s.months_overdue,
            last_successful_charge_date: s.last_successful_charge_date,
            expected_next_charge_date: s.expected_next_charge_date,
            status: s.status,
        }
    }
}

#[derive(Debug, Serialize)]
struct UsageResponse {
    usage_id: String,
    billed: bool,
    billing_date: DateTime<Utc>,
    amount_cents: i64,
    description: Option<String>,
    subscription: Option<SubscriptionStatusResponse>,
}

impl From<UsageRecord> for UsageResponse {
    fn from(record: UsageRecord) -> Self {
        let usage = record.usage;
        Self {
            usage_id: usage.shopify_gid,
            billed: usage.billed,
            billing_date: usage.billing_date,
            amount_cents: usage.amount_cents,
            description: usage.description,
            subscription: record.subscription.map(Into::into),
        }
    }
}

async fn list_subscriptions(
    State(app_state): State<AppState>,
    Path(app_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let statuses = app_state
        .app_use_cases
        .subscription_statuses(app_id)
        .await?;

    let response: Vec<SubscriptionStatusResponse> =
        statuses.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

async fn list_usage(
    State(app_state): State<AppState>,
    Path(app_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let records = app_state.app_use_cases.usage_records(app_id).await?;

    let response: Vec<UsageResponse> = records.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

async fn get_metrics(
    State(app_state): State<AppState>,
    Path(app_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let metrics = app_state.metrics_use_cases.app_metrics(app_id).await?;
    Ok(Json(metrics))
}

async fn resync_app(
    State(app_state): State<AppState>,
    Path(app_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let summary = app_state.app_use_cases.resync_app(app_id).await?;
    Ok(Json(summary))
}

async fn teardown_app(
    State(app_state): State<AppState>,
    Path(app_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let summary = app_state.app_use_cases.teardown_app(app_id).await?;
    Ok(Json(summary))
}
