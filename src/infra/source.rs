use std::future::Future;

use thiserror::Error;

use crate::domain::{CostParameter, CostParameterSet, RegionCode};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("no {table} row for {key}")]
    NotFound { table: &'static str, key: String },
    #[error("expected one {table} row for {key}, got {count}")]
    Ambiguous {
        table: &'static str,
        key: String,
        count: usize,
    },
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: f64 },
}

/// Regional reference costs as published, with percentages still whole numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionalCostRecord {
    pub diesel_price_per_liter: f64,
    pub operator_base_salary: f64,
    pub social_charges_percent: f64,
    pub fuel_consumption_per_hour: f64,
    pub maintenance_rate_percent: f64,
}

impl RegionalCostRecord {
    /// Converts to system defaults. Percentages are scaled to fractions; any
    /// negative or non-finite figure rejects the whole record.
    pub fn into_parameters(self, machine_value: f64) -> Result<CostParameterSet, SourceError> {
        let checked = |field: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(SourceError::InvalidField { field, value })
            }
        };

        Ok(CostParameterSet {
            diesel_price: CostParameter::from_system(checked(
                "diesel price",
                self.diesel_price_per_liter,
            )?),
            operator_salary: CostParameter::from_system(checked(
                "operator salary",
                self.operator_base_salary,
            )?),
            machine_value: CostParameter::from_system(checked("machine value", machine_value)?),
            social_charges_rate: checked("social charges", self.social_charges_percent)? / 100.0,
            fuel_consumption_rate: checked("fuel consumption", self.fuel_consumption_per_hour)?,
            maintenance_rate: checked("maintenance rate", self.maintenance_rate_percent)? / 100.0,
        })
    }
}

/// Supplies the reference cost parameters for a region.
pub trait CostParameterSource {
    fn fetch(
        &self,
        region: &RegionCode,
    ) -> impl Future<Output = Result<CostParameterSet, SourceError>> + Send;
}

/// Answers whether an account has paid access.
pub trait EntitlementSource {
    fn is_premium(&self, account: &str) -> impl Future<Output = Result<bool, SourceError>> + Send;
}
