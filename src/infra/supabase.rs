//! Thin asynchronous client for the reference-data backend (PostgREST).
//!
//! - `cost_parameters` holds diesel price, base salary and social charges per state.
//! - `machine_specs` holds consumption and maintenance rate per machine type.
//! - `profiles` holds the paid-access flag per account e-mail.
//!
//! Fresh regional lookups are cached in memory for the configured TTL. Expired
//! entries are never served, not even when a refetch fails.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::source::{CostParameterSource, EntitlementSource, RegionalCostRecord, SourceError};
use crate::{
    config::SourceConfig,
    domain::{CostParameterSet, RegionCode},
    util::version::user_agent,
};

const REST_PREFIX: &str = "rest/v1/";

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: SourceConfig,
    cache: Arc<Mutex<HashMap<RegionCode, Cached<CostParameterSet>>>>,
}

impl SupabaseClient {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            config,
            cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn fetch_record(&self, region: &RegionCode) -> Result<RegionalCostRecord, SourceError> {
        let costs: CostParametersRow = self
            .single_row("cost_parameters", "state_uf", region.as_str())
            .await?;
        let machine: MachineSpecRow = self
            .single_row("machine_specs", "machine_type", &self.config.machine_type)
            .await?;
        Ok(RegionalCostRecord::from((costs, machine)))
    }

    async fn single_row<T>(
        &self,
        table: &'static str,
        column: &str,
        key: &str,
    ) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair(column, &format!("eq.{key}"));
        debug!(%url, "querying reference data");

        let rows: Vec<T> = self.fetch_json(self.http.get(url)).await?;
        exactly_one(rows, table, key)
    }

    async fn fetch_json<T>(&self, builder: RequestBuilder) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(api_error_message(status, &body)));
        }

        Ok(response.json().await?)
    }

    fn table_url(&self, table: &str) -> Result<Url, url::ParseError> {
        self.config.base_url.join(REST_PREFIX)?.join(table)
    }

    async fn cached(&self, region: &RegionCode) -> Option<CostParameterSet> {
        let cache = self.cache.lock().await;
        let hit = cache
            .get(region)
            .and_then(|entry| entry.if_fresh(self.config.cache_ttl));
        if hit.is_some() {
            debug!(%region, "serving cached cost parameters");
        }
        hit
    }

    async fn store(&self, region: &RegionCode, value: CostParameterSet) {
        let mut cache = self.cache.lock().await;
        cache.insert(region.clone(), Cached::new(value, SystemTime::now()));
    }
}

impl CostParameterSource for SupabaseClient {
    async fn fetch(&self, region: &RegionCode) -> Result<CostParameterSet, SourceError> {
        if let Some(hit) = self.cached(region).await {
            return Ok(hit);
        }

        let record = self.fetch_record(region).await?;
        let parameters = record.into_parameters(self.config.machine_value)?;
        self.store(region, parameters.clone()).await;
        info!(%region, "fetched regional cost parameters");
        Ok(parameters)
    }
}

impl EntitlementSource for SupabaseClient {
    async fn is_premium(&self, account: &str) -> Result<bool, SourceError> {
        let mut url = self.table_url("profiles")?;
        url.query_pairs_mut()
            .append_pair("select", "is_pro")
            .append_pair("email", &format!("eq.{account}"));

        let rows: Vec<ProfileRow> = self.fetch_json(self.http.get(url)).await?;
        premium_from_rows(rows, account)
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<T> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(self.value.clone())
        } else {
            None
        }
    }
}

fn exactly_one<T>(mut rows: Vec<T>, table: &'static str, key: &str) -> Result<T, SourceError> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        0 => Err(SourceError::NotFound {
            table,
            key: key.to_string(),
        }),
        count => Err(SourceError::Ambiguous {
            table,
            key: key.to_string(),
            count,
        }),
    }
}

/// An account without a profile row has no paid access; more than one row
/// for the same e-mail is an error.
fn premium_from_rows(rows: Vec<ProfileRow>, account: &str) -> Result<bool, SourceError> {
    match exactly_one(rows, "profiles", account) {
        Ok(row) => Ok(row.is_pro.unwrap_or(false)),
        Err(SourceError::NotFound { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

/// PostgREST error bodies carry a `message`; anything else falls back to the status line.
fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|err| err.message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CostParametersRow {
    avg_diesel_price: f64,
    operator_base_salary: f64,
    social_charges_percent: f64,
}

#[derive(Debug, Deserialize)]
struct MachineSpecRow {
    avg_consumption_l_h: f64,
    maintenance_rate_percent: f64,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    is_pro: Option<bool>,
}

impl From<(CostParametersRow, MachineSpecRow)> for RegionalCostRecord {
    fn from((costs, machine): (CostParametersRow, MachineSpecRow)) -> Self {
        Self {
            diesel_price_per_liter: costs.avg_diesel_price,
            operator_base_salary: costs.operator_base_salary,
            social_charges_percent: costs.social_charges_percent,
            fuel_consumption_per_hour: machine.avg_consumption_l_h,
            maintenance_rate_percent: machine.maintenance_rate_percent,
        }
    }
}
