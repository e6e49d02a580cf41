use serde::{Deserialize, Serialize};

use super::{
    entities::{CostParameterSet, RiskLevel, RiskStatus, ScopeConfig},
    risk::{classify, multipliers_for},
};

/// Annual capital recovery charged against the machine value.
pub const CAPITAL_RECOVERY_RATE: f64 = 0.15;
/// Margin reported when the revenue cap leaves nothing to divide by.
pub const DEGENERATE_MARGIN_PCT: f64 = -100.0;

/// Monthly cost items feeding the total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub operator_cost: f64,
    pub capital_cost_monthly: f64,
    pub hourly_fuel_cost: f64,
    pub monthly_fuel_cost: f64,
    pub monthly_maintenance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub total_monthly_cost: f64,
    pub hourly_break_even: f64,
    pub projected_profit: f64,
    pub margin_percent: f64,
    pub status: RiskStatus,
    pub total_contract_profit: f64,
    pub breakdown: CostBreakdown,
}

/// Monthly projection for a tender. The arithmetic order is fixed so results
/// are reproducible to the last bit.
pub fn compute(
    scope: &ScopeConfig,
    costs: &CostParameterSet,
    risk_level: RiskLevel,
) -> CalculationResult {
    let multipliers = multipliers_for(risk_level);
    let machine_value = costs.machine_value.user_value;

    let operator_cost = if scope.has_operator {
        costs.operator_salary.user_value * (1.0 + costs.social_charges_rate)
    } else {
        0.0
    };

    let capital_cost_monthly = (machine_value * CAPITAL_RECOVERY_RATE) / 12.0;

    let hourly_fuel_cost =
        costs.diesel_price.user_value * costs.fuel_consumption_rate * multipliers.fuel;
    let monthly_fuel_cost = if scope.has_fuel {
        hourly_fuel_cost * scope.monthly_hours
    } else {
        0.0
    };

    let monthly_maintenance =
        ((machine_value * costs.maintenance_rate) / 12.0) * multipliers.maintenance;

    let total_monthly_cost =
        operator_cost + capital_cost_monthly + monthly_fuel_cost + monthly_maintenance;
    let hourly_break_even = total_monthly_cost / scope.monthly_hours.max(1.0);

    let projected_profit = scope.revenue_cap - total_monthly_cost;
    let margin_percent = margin_percent(projected_profit, scope.revenue_cap);
    let total_contract_profit = projected_profit * scope.contract_months as f64;

    CalculationResult {
        total_monthly_cost,
        hourly_break_even,
        projected_profit,
        margin_percent,
        status: classify(margin_percent),
        total_contract_profit,
        breakdown: CostBreakdown {
            operator_cost,
            capital_cost_monthly,
            hourly_fuel_cost,
            monthly_fuel_cost,
            monthly_maintenance,
        },
    }
}

fn margin_percent(projected_profit: f64, revenue_cap: f64) -> f64 {
    if revenue_cap <= 0.0 || !revenue_cap.is_finite() {
        return DEGENERATE_MARGIN_PCT;
    }
    let margin = (projected_profit / revenue_cap) * 100.0;
    if margin.is_finite() {
        margin
    } else {
        DEGENERATE_MARGIN_PCT
    }
}
