use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How many consecutive billing cycles a subscription has gone unpaid.
///
/// Produced by the partner sync, consumed here. Variants are declared in
/// order of escalating risk so the derived `Ord` can be used for comparisons.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "risk_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskState {
    #[default]
    Safe,
    OneCycleMissed,
    TwoCyclesMissed,
    Churned,
}

impl RiskState {
    /// Missed at least one cycle but not yet churned.
    pub fn is_at_risk(&self) -> bool {
        matches!(self, RiskState::OneCycleMissed | RiskState::TwoCyclesMissed)
    }

    pub fn is_churned(&self) -> bool {
        matches!(self, RiskState::Churned)
    }
}
