//! Calculator session: owns the scope, risk level, cost parameters and the
//! derived result, and sequences region fetches so a superseded response never
//! lands on top of a newer one.

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    entities::{
        CostField, CostParameterSet, Entitlement, RegionCode, RiskLevel, RiskStatus, ScopeConfig,
        ScopeError,
    },
    evaluation::{compute, CalculationResult},
    overrides::ParameterOverrideTracker,
    report::{ReportError, ReportSnapshot},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchState {
    /// No region has been requested yet.
    Idle,
    Loading { generation: u64 },
    Ready,
    /// The last fetch failed; the result stays absent until a retry succeeds.
    Unavailable { reason: String },
}

/// Ticket for an in-flight region fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRequest {
    pub region: RegionCode,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer request was issued; this response was dropped.
    Superseded,
    Failed,
}

#[derive(Clone, Debug)]
pub struct Session {
    region: RegionCode,
    scope: ScopeConfig,
    risk_level: RiskLevel,
    entitlement: Entitlement,
    tracker: Option<ParameterOverrideTracker>,
    fetch: FetchState,
    generation: u64,
    result: Option<CalculationResult>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Entitlement::Free)
    }
}

impl Session {
    pub fn new(entitlement: Entitlement) -> Self {
        Self {
            region: RegionCode::default(),
            scope: ScopeConfig::default(),
            risk_level: RiskLevel::default(),
            entitlement,
            tracker: None,
            fetch: FetchState::Idle,
            generation: 0,
            result: None,
        }
    }

    pub fn region(&self) -> &RegionCode {
        &self.region
    }

    pub fn scope(&self) -> &ScopeConfig {
        &self.scope
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn entitlement(&self) -> Entitlement {
        self.entitlement
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch
    }

    pub fn tracker(&self) -> Option<&ParameterOverrideTracker> {
        self.tracker.as_ref()
    }

    /// Current projection, absent while loading or after a failed fetch.
    pub fn result(&self) -> Option<&CalculationResult> {
        self.result.as_ref()
    }

    /// Starts a region switch. The previous result is withdrawn until the
    /// matching [`Session::complete_region_fetch`] call lands.
    pub fn begin_region_switch(&mut self, region: RegionCode) -> RegionRequest {
        self.generation += 1;
        self.region = region.clone();
        self.fetch = FetchState::Loading {
            generation: self.generation,
        };
        self.result = None;
        debug!(%region, generation = self.generation, "region fetch started");
        RegionRequest {
            region,
            generation: self.generation,
        }
    }

    pub fn complete_region_fetch<E: std::fmt::Display>(
        &mut self,
        request: RegionRequest,
        response: Result<CostParameterSet, E>,
    ) -> FetchOutcome {
        if request.generation != self.generation {
            debug!(
                region = %request.region,
                generation = request.generation,
                current = self.generation,
                "discarding superseded region response"
            );
            return FetchOutcome::Superseded;
        }

        match response {
            Ok(defaults) => {
                match self.tracker.as_mut() {
                    Some(tracker) => tracker.load_system_defaults(defaults),
                    None => self.tracker = Some(ParameterOverrideTracker::new(defaults)),
                }
                self.fetch = FetchState::Ready;
                self.recompute();
                info!(region = %request.region, "regional cost parameters loaded");
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(region = %request.region, "cost parameters unavailable: {err}");
                self.fetch = FetchState::Unavailable {
                    reason: err.to_string(),
                };
                self.result = None;
                FetchOutcome::Failed
            }
        }
    }

    /// Replaces the scope if it validates; the previous scope is kept otherwise.
    pub fn set_scope(&mut self, scope: ScopeConfig) -> Result<(), ScopeError> {
        scope.validate()?;
        self.scope = scope;
        self.recompute();
        Ok(())
    }

    pub fn set_risk_level(&mut self, level: RiskLevel) {
        self.risk_level = level;
        self.recompute();
    }

    /// Applies a user override. Refused without premium entitlement or while no
    /// regional parameters are loaded.
    pub fn set_override(&mut self, field: CostField, raw: &str) -> bool {
        if self.fetch != FetchState::Ready {
            debug!(field = field.key(), "override ignored while parameters are not loaded");
            return false;
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return false;
        };
        let applied = tracker.set_override(field, raw, self.entitlement);
        if applied {
            self.recompute();
        }
        applied
    }

    pub fn set_entitlement(&mut self, entitlement: Entitlement) {
        if self.entitlement != entitlement {
            info!(premium = entitlement.is_premium(), "entitlement changed");
        }
        self.entitlement = entitlement;
    }

    fn recompute(&mut self) {
        if self.fetch != FetchState::Ready {
            self.result = None;
            return;
        }
        self.result = self
            .tracker
            .as_ref()
            .map(|tracker| compute(&self.scope, tracker.parameters(), self.risk_level));
    }

    /// Frozen copy of everything a report needs.
    pub fn report_snapshot(&self) -> Result<ReportSnapshot, ReportError> {
        if !self.entitlement.is_premium() {
            return Err(ReportError::NotEntitled);
        }
        let (Some(result), Some(tracker)) = (self.result.as_ref(), self.tracker.as_ref()) else {
            return Err(ReportError::ResultUnavailable);
        };
        if result.status == RiskStatus::Danger {
            return Err(ReportError::CriticalRisk {
                margin_percent: result.margin_percent,
            });
        }

        Ok(ReportSnapshot {
            audit_id: Uuid::new_v4(),
            generated_at: OffsetDateTime::now_utc(),
            region: self.region.clone(),
            risk_level: self.risk_level,
            scope: self.scope.clone(),
            costs: tracker.parameters().clone(),
            overrides: tracker.overrides(),
            result: result.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CostParameter;

    fn costs(diesel: f64) -> CostParameterSet {
        CostParameterSet {
            diesel_price: CostParameter::from_system(diesel),
            operator_salary: CostParameter::from_system(3000.0),
            machine_value: CostParameter::from_system(350_000.0),
            social_charges_rate: 0.85,
            fuel_consumption_rate: 9.0,
            maintenance_rate: 0.06,
        }
    }

    fn region(code: &str) -> RegionCode {
        RegionCode::parse(code).unwrap()
    }

    fn loaded(entitlement: Entitlement) -> Session {
        let mut session = Session::new(entitlement);
        let request = session.begin_region_switch(region("SP"));
        let outcome = session.complete_region_fetch::<String>(request, Ok(costs(5.80)));
        assert_eq!(outcome, FetchOutcome::Applied);
        session
    }

    #[test]
    fn result_absent_until_first_fetch() {
        let mut session = Session::default();
        assert!(session.result().is_none());
        assert_eq!(session.fetch_state(), &FetchState::Idle);

        session.begin_region_switch(region("SP"));
        assert!(session.result().is_none());
        assert!(matches!(session.fetch_state(), FetchState::Loading { .. }));
    }

    #[test]
    fn loaded_session_computes_result() {
        let session = loaded(Entitlement::Free);
        let result = session.result().expect("result");
        assert!((result.total_monthly_cost - 22_465.0).abs() < 1e-6);
        assert_eq!(result.status, RiskStatus::Safe);
    }

    #[test]
    fn every_mutation_recomputes() {
        let mut session = loaded(Entitlement::Premium);

        session.set_risk_level(RiskLevel::High);
        assert!((session.result().unwrap().total_monthly_cost - 24_034.0).abs() < 1e-6);

        session
            .set_scope(ScopeConfig {
                revenue_cap: 0.0,
                ..ScopeConfig::default()
            })
            .unwrap();
        assert_eq!(session.result().unwrap().status, RiskStatus::Danger);

        session.set_scope(ScopeConfig::default()).unwrap();
        assert!(session.set_override(CostField::DieselPrice, "0"));
        let result = session.result().unwrap();
        assert_eq!(result.breakdown.monthly_fuel_cost, 0.0);
    }

    #[test]
    fn invalid_scope_keeps_previous_values() {
        let mut session = loaded(Entitlement::Free);
        let before = session.result().cloned();

        let err = session
            .set_scope(ScopeConfig {
                contract_months: 0,
                ..ScopeConfig::default()
            })
            .unwrap_err();

        assert_eq!(err, ScopeError::ZeroMonths);
        assert_eq!(session.scope(), &ScopeConfig::default());
        assert_eq!(session.result().cloned(), before);
    }

    #[test]
    fn superseded_response_is_discarded() {
        let mut session = Session::new(Entitlement::Premium);
        let first = session.begin_region_switch(region("SP"));
        let second = session.begin_region_switch(region("MG"));

        let outcome = session.complete_region_fetch::<String>(second, Ok(costs(6.10)));
        assert_eq!(outcome, FetchOutcome::Applied);

        let outcome = session.complete_region_fetch::<String>(first, Ok(costs(5.80)));
        assert_eq!(outcome, FetchOutcome::Superseded);

        assert_eq!(session.region().as_str(), "MG");
        let tracker = session.tracker().unwrap();
        assert_eq!(tracker.parameters().diesel_price.system_value, 6.10);
    }

    #[test]
    fn stale_response_cannot_complete_pending_switch() {
        let mut session = loaded(Entitlement::Free);
        let stale = RegionRequest {
            region: region("SP"),
            generation: 1,
        };
        session.begin_region_switch(region("PR"));

        let outcome = session.complete_region_fetch::<String>(stale, Ok(costs(9.99)));
        assert_eq!(outcome, FetchOutcome::Superseded);
        assert!(session.result().is_none());
    }

    #[test]
    fn failed_fetch_leaves_result_absent_until_retry() {
        let mut session = loaded(Entitlement::Free);

        let request = session.begin_region_switch(region("MG"));
        let outcome = session.complete_region_fetch(request, Err("connection refused"));
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(session.result().is_none());
        assert_eq!(
            session.fetch_state(),
            &FetchState::Unavailable {
                reason: "connection refused".to_string()
            }
        );

        session.set_risk_level(RiskLevel::Low);
        assert!(session.result().is_none());

        let retry = session.begin_region_switch(region("MG"));
        session.complete_region_fetch::<String>(retry, Ok(costs(6.10)));
        assert!(session.result().is_some());
    }

    #[test]
    fn region_switch_clears_overrides() {
        let mut session = loaded(Entitlement::Premium);
        assert!(session.set_override(CostField::MachineValue, "500000"));
        assert_eq!(session.tracker().unwrap().override_count(), 1);

        let request = session.begin_region_switch(region("MG"));
        session.complete_region_fetch::<String>(request, Ok(costs(6.10)));

        let tracker = session.tracker().unwrap();
        assert_eq!(tracker.override_count(), 0);
        assert_eq!(tracker.parameters().machine_value.user_value, 350_000.0);
    }

    #[test]
    fn overrides_refused_while_loading() {
        let mut session = loaded(Entitlement::Premium);
        session.begin_region_switch(region("MG"));
        assert!(!session.set_override(CostField::DieselPrice, "7"));
    }

    #[test]
    fn upgrade_unlocks_overrides_on_next_write() {
        let mut session = loaded(Entitlement::Free);
        assert!(!session.set_override(CostField::DieselPrice, "7"));

        session.set_entitlement(Entitlement::Premium);
        assert!(session.set_override(CostField::DieselPrice, "7"));
        assert!(session.tracker().unwrap().is_overridden(CostField::DieselPrice));
    }

    #[test]
    fn report_is_gated() {
        let session = loaded(Entitlement::Free);
        assert_eq!(session.report_snapshot().unwrap_err(), ReportError::NotEntitled);

        let mut session = Session::new(Entitlement::Premium);
        assert_eq!(
            session.report_snapshot().unwrap_err(),
            ReportError::ResultUnavailable
        );

        let request = session.begin_region_switch(region("SP"));
        session.complete_region_fetch::<String>(request, Ok(costs(5.80)));
        session
            .set_scope(ScopeConfig {
                revenue_cap: 1000.0,
                ..ScopeConfig::default()
            })
            .unwrap();
        assert!(matches!(
            session.report_snapshot(),
            Err(ReportError::CriticalRisk { .. })
        ));
    }

    #[test]
    fn report_snapshot_is_frozen() {
        let mut session = loaded(Entitlement::Premium);
        session.set_override(CostField::OperatorSalary, "3200");
        let snapshot = session.report_snapshot().unwrap();

        session.set_override(CostField::DieselPrice, "9");
        session.set_risk_level(RiskLevel::High);

        assert_eq!(snapshot.overrides, vec![CostField::OperatorSalary]);
        assert_eq!(snapshot.risk_level, RiskLevel::Medium);
        assert_eq!(snapshot.costs.diesel_price.user_value, 5.80);
        assert_eq!(snapshot.region.as_str(), "SP");
    }
}
