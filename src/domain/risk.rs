//! Pure lookups mapping risk inputs to multipliers and margins to a verdict.

use super::entities::{RiskLevel, RiskStatus};

/// Margin below which a bid is considered dangerous.
pub const DANGER_MARGIN_PCT: f64 = 5.0;
/// Margin below which a bid is considered tight.
pub const WARNING_MARGIN_PCT: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskMultipliers {
    pub maintenance: f64,
    pub fuel: f64,
}

/// Operating-stress factors applied to maintenance and fuel.
pub fn multipliers_for(level: RiskLevel) -> RiskMultipliers {
    match level {
        RiskLevel::Low => RiskMultipliers {
            maintenance: 1.0,
            fuel: 1.0,
        },
        RiskLevel::Medium => RiskMultipliers {
            maintenance: 1.2,
            fuel: 1.0,
        },
        RiskLevel::High => RiskMultipliers {
            maintenance: 1.5,
            fuel: 1.1,
        },
    }
}

/// Classifies a margin percentage. Thresholds are inclusive on the upper band,
/// so exactly 5% is a warning and exactly 15% is safe. NaN is dangerous.
pub fn classify(margin_percent: f64) -> RiskStatus {
    if margin_percent.is_nan() || margin_percent < DANGER_MARGIN_PCT {
        RiskStatus::Danger
    } else if margin_percent < WARNING_MARGIN_PCT {
        RiskStatus::Warning
    } else {
        RiskStatus::Safe
    }
}
