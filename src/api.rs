use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::logging::{json_log, obj, v_str};
use crate::session::Session;

pub const HEADER_API_KEY: &str = "X-API-Key";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// The ten-field transaction feature payload consumed by `/score` and
/// `/explain`. Field names and types are the wire contract; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePayload {
    pub age: i64,
    pub income: f64,
    pub account_age_days: i64,
    pub num_txn_30d: i64,
    pub avg_txn_amount_30d: f64,
    pub num_chargebacks_180d: i64,
    pub device_change_count_30d: i64,
    pub geo_distance_from_last_txn_km: f64,
    pub is_international: bool,
    pub merchant_risk_score: f64,
}

impl FeaturePayload {
    /// Demo seed: an established, low-risk account profile.
    pub fn seed_low() -> Self {
        Self {
            age: 34,
            income: 85000.0,
            account_age_days: 540,
            num_txn_30d: 22,
            avg_txn_amount_30d: 120.5,
            num_chargebacks_180d: 0,
            device_change_count_30d: 1,
            geo_distance_from_last_txn_km: 3.2,
            is_international: false,
            merchant_risk_score: 0.18,
        }
    }

    /// Demo seed: a fresh account with chargebacks and a distant device.
    pub fn seed_high() -> Self {
        Self {
            age: 19,
            income: 12000.0,
            account_age_days: 12,
            num_txn_30d: 48,
            avg_txn_amount_30d: 310.9,
            num_chargebacks_180d: 2,
            device_change_count_30d: 5,
            geo_distance_from_last_txn_km: 1400.0,
            is_international: true,
            merchant_risk_score: 0.92,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed response views
//
// Every field is optional-with-default: a missing field renders as a
// placeholder downstream, it never fails a request that already succeeded.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreResponse {
    #[serde(default)]
    pub risk_probability: Option<f64>,
    #[serde(default)]
    pub risk_probability_event: Option<f64>,
    #[serde(default)]
    pub risk_label: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub explanation: Option<Explanation>,
}

impl ScoreResponse {
    pub fn from_value(v: &Value) -> Self {
        serde_json::from_value(v.clone()).unwrap_or_default()
    }

    /// Event-level probability when the model reports one, else the plain one.
    pub fn probability(&self) -> Option<f64> {
        self.risk_probability_event.or(self.risk_probability)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Explanation {
    #[serde(default)]
    pub top_features: Vec<TopFeature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopFeature {
    #[serde(default)]
    pub feature: String,
    #[serde(default)]
    pub shap_value: f64,
    #[serde(default)]
    pub contribution_percent: f64,
    #[serde(default)]
    pub direction: String,
}

impl TopFeature {
    pub fn increases_risk(&self) -> bool {
        self.direction == "increases_risk"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalExplain {
    #[serde(default)]
    pub items: Vec<GlobalItem>,
}

impl GlobalExplain {
    pub fn from_value(v: &Value) -> Self {
        serde_json::from_value(v.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalItem {
    #[serde(default)]
    pub feature: String,
    #[serde(default)]
    pub importance_percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub metrics: ModelMetrics,
}

impl ModelInfo {
    pub fn from_value(v: &Value) -> Self {
        serde_json::from_value(v.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub test: SplitMetrics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SplitMetrics {
    #[serde(default)]
    pub auc: Option<f64>,
    #[serde(default)]
    pub brier: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthMe {
    #[serde(default)]
    pub principal: Principal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Principal {
    #[serde(default = "unknown_role")]
    pub role: String,
    #[serde(default)]
    pub read_only: bool,
}

impl Default for Principal {
    fn default() -> Self {
        Self { role: unknown_role(), read_only: false }
    }
}

fn unknown_role() -> String {
    "unknown".to_string()
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: TransportRequest) -> Result<TransportResponse>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self.client.request(req.method, req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        // Raw body is read regardless of outcome so failures keep their text.
        let body = resp.text().await?;
        Ok(TransportResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Gateway client
// ---------------------------------------------------------------------------

/// Thin wrapper over the scoring API. Resolves the base from the session's
/// environment on every call, attaches the API key when one is set, and
/// normalizes every failure into a single error kind whose message embeds the
/// status code and the response body. No retry, no explicit timeout.
pub struct ApiClient {
    config: Config,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self { config, transport: Box::new(HttpTransport::new()) }
    }

    pub fn with_transport(config: Config, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Caller headers in `extra_headers` are merged after the defaults, so a
    /// caller can add to or override the content type.
    pub async fn call(
        &self,
        session: &Session,
        path: &str,
        method: Method,
        body: Option<&Value>,
        extra_headers: &[(String, String)],
    ) -> Result<Value> {
        let base = self.config.base_for(session.environment());
        let url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;

        let mut headers = vec![(HEADER_CONTENT_TYPE.to_string(), "application/json".to_string())];
        let key = session.api_key();
        if !key.is_empty() {
            headers.push((HEADER_API_KEY.to_string(), key));
        }
        headers.extend(extra_headers.iter().cloned());

        let req = TransportRequest {
            method,
            url,
            headers,
            body: body.map(|b| b.to_string()),
        };
        let resp = self.transport.send(req).await?;

        json_log(
            "api",
            obj(&[
                ("path", v_str(path)),
                ("status", serde_json::json!(resp.status)),
            ]),
        );

        // Best-effort parse: non-JSON bodies are kept as raw text.
        let data: Value = serde_json::from_str(&resp.body)
            .unwrap_or_else(|_| Value::String(resp.body.clone()));

        if !(200..300).contains(&resp.status) {
            let msg = match &data {
                Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| resp.body.clone()),
            };
            return Err(anyhow!("HTTP {}: {}", resp.status, msg));
        }
        Ok(data)
    }

    pub async fn score(&self, session: &Session, payload: &FeaturePayload) -> Result<Value> {
        let body = serde_json::to_value(payload)?;
        self.call(session, "/score", Method::POST, Some(&body), &[]).await
    }

    pub async fn explain(&self, session: &Session, payload: &FeaturePayload) -> Result<Value> {
        let body = serde_json::to_value(payload)?;
        self.call(session, "/explain", Method::POST, Some(&body), &[]).await
    }

    pub async fn global_explain(&self, session: &Session) -> Result<Value> {
        self.call(session, "/global-explain", Method::GET, None, &[]).await
    }

    pub async fn model_info(&self, session: &Session) -> Result<Value> {
        self.call(session, "/model-info", Method::GET, None, &[]).await
    }

    pub async fn auth_me(&self, session: &Session) -> Result<AuthMe> {
        let v = self.call(session, "/auth/me", Method::GET, None, &[]).await?;
        Ok(serde_json::from_value(v).unwrap_or_default())
    }

    /// Quick check that the stored key is accepted. Best-effort by design:
    /// failures land in page-specific diagnostic panes, not here.
    pub async fn ping_auth(&self, session: &Session) {
        let _ = self.model_info(session).await;
    }
}
