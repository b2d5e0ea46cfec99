use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Processing fee charged on every gross amount, in basis points (2.9%).
const PROCESSING_FEE_BPS: i64 = 290;

/// Platform revenue-share schedule an app is billed under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
pub enum RevenueShareTier {
    #[default]
    #[serde(rename = "DEFAULT_20")]
    #[strum(serialize = "DEFAULT_20")]
    Default20,
    #[serde(rename = "SMALL_DEV_0")]
    #[strum(serialize = "SMALL_DEV_0")]
    SmallDev0,
    #[serde(rename = "SMALL_DEV_15")]
    #[strum(serialize = "SMALL_DEV_15")]
    SmallDev15,
    #[serde(rename = "LARGE_DEV_15")]
    #[strum(serialize = "LARGE_DEV_15")]
    LargeDev15,
}

impl RevenueShareTier {
    /// Share of gross revenue kept by the platform, in whole percent.
    pub fn share_percent(&self) -> i64 {
        match self {
            RevenueShareTier::Default20 => 20,
            RevenueShareTier::SmallDev0 => 0,
            RevenueShareTier::SmallDev15 | RevenueShareTier::LargeDev15 => 15,
        }
    }

    /// Parse a stored tier literal. Unknown or empty values fall back to
    /// [`RevenueShareTier::Default20`].
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

/// Fee split of one gross amount. All values are non-negative cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub gross_amount_cents: i64,
    pub revenue_share_cents: i64,
    pub processing_fee_cents: i64,
    pub tax_on_fees_cents: i64,
    pub total_fees_cents: i64,
    pub net_amount_cents: i64,
}

/// Split `gross_cents` into platform fees and developer net.
///
/// Every component is truncated on its own and tax is taken on the truncated
/// components, so the result matches the partner's payout statements to the
/// cent. Callers must pass `gross_cents >= 0` and `0.0 <= tax_rate <= 1.0`.
pub fn calculate_fee_breakdown(
    gross_cents: i64,
    tier: RevenueShareTier,
    tax_rate: f64,
) -> FeeBreakdown {
    debug_assert!(gross_cents >= 0, "gross_cents must not be negative");
    debug_assert!(
        (0.0..=1.0).contains(&tax_rate),
        "tax_rate must be within [0, 1]"
    );

    let revenue_share_cents = gross_cents * tier.share_percent() / 100;
    let processing_fee_cents = gross_cents * PROCESSING_FEE_BPS / 10_000;
    let tax_on_fees_cents =
        ((revenue_share_cents + processing_fee_cents) as f64 * tax_rate).floor() as i64;
    let total_fees_cents = revenue_share_cents + processing_fee_cents + tax_on_fees_cents;

    FeeBreakdown {
        gross_amount_cents: gross_cents,
        revenue_share_cents,
        processing_fee_cents,
        tax_on_fees_cents,
        total_fees_cents,
        net_amount_cents: gross_cents - total_fees_cents,
    }
}
