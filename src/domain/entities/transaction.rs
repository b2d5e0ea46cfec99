use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "charge_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeType {
    Recurring,
    Usage,
    OneTime,
    Refund,
}

impl ChargeType {
    /// Refunds are stored with their sign as reported; everything else is revenue.
    pub fn is_revenue(&self) -> bool {
        !matches!(self, ChargeType::Refund)
    }
}

/// Ledger record of one partner charge event. Upserted by `shopify_gid`.
///
/// Linked to its subscription only through `myshopify_domain`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub app_id: Uuid,
    pub shopify_gid: String,
    pub myshopify_domain: String,
    pub charge_type: ChargeType,
    pub net_amount_cents: i64,
    pub description: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}
