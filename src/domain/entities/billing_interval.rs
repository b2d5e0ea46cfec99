use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Recurring charge cadence of a subscription plan.
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
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "billing_interval", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingInterval {
    #[default]
    Monthly,
    Annual,
}

impl BillingInterval {
    /// Nominal cycle length used for coarse overdue estimates.
    ///
    /// This is NOT the distance between two charge dates; use
    /// [`BillingInterval::next_charge_date`] for that.
    pub const fn days_in_cycle(&self) -> i64 {
        match self {
            BillingInterval::Monthly => 30,
            BillingInterval::Annual => 365,
        }
    }

    fn months(&self) -> Months {
        match self {
            BillingInterval::Monthly => Months::new(1),
            BillingInterval::Annual => Months::new(12),
        }
    }

    /// Calendar-aware next charge date. Month ends clamp to the last day of
    /// the target month (Jan 31 -> Feb 28/29, Feb 29 -> Feb 28 next year).
    pub fn next_charge_date(&self, last: DateTime<Utc>) -> DateTime<Utc> {
        // Only fails past year 262143.
        last.checked_add_months(self.months())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
