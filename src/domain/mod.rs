//! Cost and margin calculation for tender bids.

pub mod app_state;
pub mod entities;
pub mod evaluation;
pub mod overrides;
pub mod report;
pub mod risk;

pub use app_state::{FetchOutcome, FetchState, RegionRequest, Session};
pub use entities::{
    CostField, CostParameter, CostParameterSet, Entitlement, RegionCode, RegionError, RiskLevel,
    RiskStatus, ScopeConfig, ScopeError,
};
pub use evaluation::{compute, CalculationResult, CostBreakdown};
pub use overrides::{parse_override, ParameterOverrideTracker};
pub use report::{ReportError, ReportSnapshot};
pub use risk::{classify, multipliers_for, RiskMultipliers};
