//! Metrics backend for fitness queries

use std::time::Duration;

use async_trait::async_trait;
use chaosai_common::{ChaosError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::executor::CommandExecutor;

/// Samples requested per query window
pub const QUERY_GRANULARITY: i64 = 100;

#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Scalar value of `query` over `[start, end]`
    async fn query_range(&self, query: &str, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<f64>;
}

/// Prometheus / Thanos HTTP API client
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<Series>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<(f64, String)>,
}

#[derive(Debug, Deserialize)]
struct RouteList {
    items: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    spec: RouteSpec,
}

#[derive(Debug, Deserialize)]
struct RouteSpec {
    host: String,
}

impl PrometheusClient {
    pub fn new(url: &str, token: &str) -> Result<Self> {
        // Cluster routes serve self-signed certificates.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(60))
            .build()?;

        let base_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", url.trim_end_matches('/'))
        };

        Ok(Self {
            http,
            base_url,
            token: token.trim().to_string(),
        })
    }

    /// Resolve endpoint and token from `PROMETHEUS_URL` / `PROMETHEUS_TOKEN`,
    /// falling back to the cluster's thanos-query route and `oc whoami -t`
    pub async fn discover(kubeconfig: &str, executor: &dyn CommandExecutor) -> Result<Self> {
        let url = match std::env::var("PROMETHEUS_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                let output = executor
                    .execute(&format!(
                        "kubectl --kubeconfig={} -n openshift-monitoring get route -l app.kubernetes.io/name=thanos-query -o json",
                        kubeconfig
                    ))
                    .await?;
                let routes: RouteList = serde_json::from_str(&output.log).map_err(|e| {
                    ChaosError::Metrics(format!("unable to read thanos-query route: {}", e))
                })?;
                routes
                    .items
                    .into_iter()
                    .next()
                    .map(|route| route.spec.host)
                    .ok_or_else(|| ChaosError::Metrics("no thanos-query route found".into()))?
            }
        };

        let token = match std::env::var("PROMETHEUS_TOKEN") {
            Ok(token) if !token.is_empty() => token,
            _ => {
                executor
                    .execute(&format!("oc --kubeconfig={} whoami -t", kubeconfig))
                    .await?
                    .log
            }
        };

        debug!(url = %url, "Prometheus endpoint resolved");
        Self::new(&url, &token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Step between samples for a window
pub fn query_step(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    ((end - start).num_seconds() / QUERY_GRANULARITY).max(1)
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    #[instrument(skip(self))]
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64> {
        let step = query_step(start, end);
        let params = [
            ("query", query.to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("step", format!("{}s", step)),
        ];

        let response: QueryResponse = self
            .http
            .get(format!("{}/api/v1/query_range", self.base_url))
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        last_value(response)
    }
}

/// Last sample of the first series
fn last_value(response: QueryResponse) -> Result<f64> {
    if response.status != "success" {
        return Err(ChaosError::Metrics(
            response
                .error
                .unwrap_or_else(|| format!("query status {}", response.status)),
        ));
    }

    let (_, raw) = response
        .data
        .and_then(|data| data.result.into_iter().next())
        .and_then(|series| series.values.into_iter().last())
        .ok_or_else(|| ChaosError::Metrics("query returned no samples".into()))?;

    raw.parse::<f64>()
        .map_err(|e| ChaosError::Metrics(format!("unparsable sample '{}': {}", raw, e)))
}

/// Uniform values in `[0, 1)`, for runs without a metrics backend
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBackend;

#[async_trait]
impl MetricsBackend for RandomBackend {
    async fn query_range(
        &self,
        _query: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64> {
        Ok(rand::thread_rng().gen::<f64>())
    }
}
