//! Async wiring between the calculator session and its external sources.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    domain::{
        CalculationResult, CostField, Entitlement, FetchOutcome, RegionCode, ReportError,
        ReportSnapshot, RiskLevel, ScopeConfig, ScopeError, Session,
    },
    infra::{CostParameterSource, EntitlementSource},
};

/// Shared handle to one calculator session. The lock is never held across a
/// fetch, so a newer region request can start while an older one is pending.
#[derive(Clone, Default)]
pub struct SessionHandle {
    state: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            state: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn select_region<S>(&self, source: &S, region: RegionCode) -> FetchOutcome
    where
        S: CostParameterSource,
    {
        let request = self.state.lock().await.begin_region_switch(region);
        let response = source.fetch(&request.region).await;
        self.state
            .lock()
            .await
            .complete_region_fetch(request, response)
    }

    /// Reads the account's entitlement. Lookup failures count as free access.
    pub async fn refresh_entitlement<E>(&self, source: &E, account: &str) -> Entitlement
    where
        E: EntitlementSource,
    {
        let entitlement = match source.is_premium(account).await {
            Ok(premium) => Entitlement::from_premium(premium),
            Err(err) => {
                warn!(account, "entitlement lookup failed: {err}");
                Entitlement::Free
            }
        };
        self.state.lock().await.set_entitlement(entitlement);
        entitlement
    }

    pub async fn set_entitlement(&self, entitlement: Entitlement) {
        self.state.lock().await.set_entitlement(entitlement);
    }

    pub async fn set_scope(&self, scope: ScopeConfig) -> Result<(), ScopeError> {
        self.state.lock().await.set_scope(scope)
    }

    pub async fn set_risk_level(&self, level: RiskLevel) {
        self.state.lock().await.set_risk_level(level);
    }

    pub async fn set_override(&self, field: CostField, raw: &str) -> bool {
        self.state.lock().await.set_override(field, raw)
    }

    pub async fn result(&self) -> Option<CalculationResult> {
        self.state.lock().await.result().cloned()
    }

    pub async fn report_snapshot(&self) -> Result<ReportSnapshot, ReportError> {
        self.state.lock().await.report_snapshot()
    }

    /// Runs `f` against the session under the lock.
    pub async fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&*self.state.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex as StdMutex};

    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        domain::{CostParameter, CostParameterSet, FetchState, RiskStatus},
        infra::SourceError,
    };

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

    /// Answers immediately from a fixed table; unknown regions fail.
    struct TableSource(HashMap<String, f64>);

    impl CostParameterSource for TableSource {
        async fn fetch(&self, region: &RegionCode) -> Result<CostParameterSet, SourceError> {
            self.0
                .get(region.as_str())
                .map(|diesel| costs(*diesel))
                .ok_or_else(|| SourceError::NotFound {
                    table: "cost_parameters",
                    key: region.to_string(),
                })
        }
    }

    /// Holds each response until the test releases it.
    #[derive(Default)]
    struct GatedSource {
        gates: StdMutex<HashMap<String, oneshot::Receiver<f64>>>,
    }

    impl GatedSource {
        fn gate(&self, code: &str) -> oneshot::Sender<f64> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(code.to_string(), rx);
            tx
        }
    }

    impl CostParameterSource for GatedSource {
        async fn fetch(&self, region: &RegionCode) -> Result<CostParameterSet, SourceError> {
            let rx = self.gates.lock().unwrap().remove(region.as_str());
            match rx {
                Some(rx) => rx
                    .await
                    .map(costs)
                    .map_err(|_| SourceError::Api("gate dropped".into())),
                None => Err(SourceError::Api("no gate".into())),
            }
        }
    }

    struct FixedEntitlement(Result<bool, ()>);

    impl EntitlementSource for FixedEntitlement {
        async fn is_premium(&self, _account: &str) -> Result<bool, SourceError> {
            self.0
                .map_err(|_| SourceError::Api("profiles unavailable".into()))
        }
    }

    fn table() -> TableSource {
        TableSource(HashMap::from([
            ("SP".to_string(), 5.80),
            ("MG".to_string(), 6.10),
        ]))
    }

    #[tokio::test]
    async fn region_selection_produces_result() {
        let handle = SessionHandle::default();
        assert!(handle.result().await.is_none());

        let outcome = handle.select_region(&table(), region("SP")).await;
        assert_eq!(outcome, FetchOutcome::Applied);

        let result = handle.result().await.expect("result");
        assert!((result.total_monthly_cost - 22_465.0).abs() < 1e-6);
        assert_eq!(result.status, RiskStatus::Safe);
    }

    #[tokio::test]
    async fn unknown_region_is_unavailable() {
        let handle = SessionHandle::default();
        handle.select_region(&table(), region("SP")).await;

        let outcome = handle.select_region(&table(), region("AC")).await;
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(handle.result().await.is_none());
        let state = handle.with_session(|s| s.fetch_state().clone()).await;
        assert!(matches!(state, FetchState::Unavailable { .. }));
    }

    #[tokio::test]
    async fn last_region_request_wins() {
        let handle = SessionHandle::default();
        let source = GatedSource::default();
        let sp = source.gate("SP");
        let mg = source.gate("MG");

        let first = handle.select_region(&source, region("SP"));
        let second = handle.select_region(&source, region("MG"));
        let release = async {
            tokio::task::yield_now().await;
            mg.send(6.10).unwrap();
            tokio::task::yield_now().await;
            sp.send(5.80).unwrap();
        };

        let (first, second, ()) = tokio::join!(first, second, release);
        assert_eq!(first, FetchOutcome::Superseded);
        assert_eq!(second, FetchOutcome::Applied);

        let diesel = handle
            .with_session(|s| s.tracker().map(|t| t.parameters().diesel_price.system_value))
            .await;
        assert_eq!(diesel, Some(6.10));
        assert_eq!(
            handle.with_session(|s| s.region().clone()).await,
            region("MG")
        );
    }

    #[tokio::test]
    async fn result_withheld_while_fetch_in_flight() {
        let handle = SessionHandle::default();
        handle.select_region(&table(), region("SP")).await;
        assert!(handle.result().await.is_some());

        let source = GatedSource::default();
        let mg = source.gate("MG");
        let pending = handle.select_region(&source, region("MG"));
        let observe = async {
            tokio::task::yield_now().await;
            let during = handle.result().await;
            mg.send(6.10).unwrap();
            during
        };

        let (outcome, during) = tokio::join!(pending, observe);
        assert!(during.is_none());
        assert_eq!(outcome, FetchOutcome::Applied);
        assert!(handle.result().await.is_some());
    }

    #[tokio::test]
    async fn entitlement_gates_overrides_and_reports() {
        let handle = SessionHandle::default();
        handle.select_region(&table(), region("SP")).await;

        let granted = handle
            .refresh_entitlement(&FixedEntitlement(Ok(false)), "user@example.com")
            .await;
        assert_eq!(granted, Entitlement::Free);
        assert!(!handle.set_override(CostField::DieselPrice, "7.00").await);
        assert_eq!(
            handle.report_snapshot().await.unwrap_err(),
            ReportError::NotEntitled
        );

        handle
            .refresh_entitlement(&FixedEntitlement(Ok(true)), "user@example.com")
            .await;
        assert!(handle.set_override(CostField::DieselPrice, "7.00").await);
        let snapshot = handle.report_snapshot().await.unwrap();
        assert_eq!(snapshot.overrides, vec![CostField::DieselPrice]);
    }

    #[tokio::test]
    async fn failed_entitlement_lookup_means_free() {
        let handle = SessionHandle::default();
        handle.set_entitlement(Entitlement::Premium).await;
        let granted = handle
            .refresh_entitlement(&FixedEntitlement(Err(())), "user@example.com")
            .await;
        assert_eq!(granted, Entitlement::Free);
    }

    #[tokio::test]
    async fn scope_and_risk_changes_recompute() {
        let handle = SessionHandle::default();
        handle.select_region(&table(), region("SP")).await;

        handle.set_risk_level(RiskLevel::High).await;
        let result = handle.result().await.unwrap();
        assert!((result.total_monthly_cost - 24_034.0).abs() < 1e-6);

        handle
            .set_scope(ScopeConfig {
                revenue_cap: 0.0,
                ..ScopeConfig::default()
            })
            .await
            .unwrap();
        let result = handle.result().await.unwrap();
        assert_eq!(result.margin_percent, -100.0);
        assert_eq!(result.status, RiskStatus::Danger);
    }
}
