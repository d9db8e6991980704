//! Graph data service: the network boundary the explorer fetches from.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use txmap_core::{
    AddressInfo, AddressMap, DenylistResponse, Direction, Error, GraphPayload, Network,
    NetworkFamily, Result, TransactionDetail, TransactionMap,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub graph_path: String,
    pub dash_path: String,
    pub timeout_secs: u64,
    pub default_graph_limit: u32,
    pub tran_no: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            graph_path: "/ts/v2/graph/".to_string(),
            dash_path: "/ts/dash/".to_string(),
            timeout_secs: 30,
            default_graph_limit: 50,
            tran_no: "transight_web_page".to_string(),
        }
    }
}

fn default_count() -> u32 {
    10
}

/// Search settings for one graph request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            count: default_count(),
            start_time: None,
            end_time: None,
            direction: Direction::All,
            page: 0,
            limit: None,
        }
    }
}

impl QueryParams {
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AddressInfo,
    Graph,
    Transaction,
}

/// Service path for a network, relative to the graph base path.
pub fn endpoint(network: Network, kind: Endpoint) -> String {
    let prefix = network.endpoint_prefix();
    match (kind, network) {
        (Endpoint::AddressInfo, _) => format!("{}/address", prefix),
        (Endpoint::Transaction, _) => format!("{}/transaction", prefix),
        (Endpoint::Graph, Network::Btc) => format!("{}/transaction-map", prefix),
        (Endpoint::Graph, Network::Erc) => format!("{}/map/internal", prefix),
        (Endpoint::Graph, _) => format!("{}/map", prefix),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    pub address: String,
    pub offset: u32,
    pub limit: u32,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl GraphRequest {
    pub fn build(network: Network, address: &str, params: &QueryParams, default_limit: u32) -> Self {
        let limit = params.limit.unwrap_or(default_limit);
        Self {
            address: address.to_string(),
            offset: params.page.saturating_mul(limit),
            limit,
            count: params.count,
            start: params.start_time.clone(),
            end: params.end_time.clone(),
            direction: params.direction,
            token_id: network.token_id().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct DenylistRequest<'a> {
    wallet_address: &'a str,
    tran_dtm: String,
    tran_no: &'a str,
}

#[async_trait]
pub trait GraphDataService: Send + Sync {
    async fn address_info(&self, network: Network, address: &str) -> Result<AddressInfo>;

    async fn transaction_map(&self, network: Network, address: &str, params: &QueryParams) -> Result<GraphPayload>;

    async fn transaction_detail(&self, network: Network, tx_id: &str) -> Result<TransactionDetail>;

    async fn denylist_info(&self, address: &str) -> Result<DenylistResponse>;
}

/// Unwraps an optional top-level `data` envelope.
fn unwrap_envelope<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    let inner = match body {
        serde_json::Value::Object(mut map) if map.get("data").map_or(false, |d| d.is_object()) => {
            map.remove("data").unwrap_or_default()
        }
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };
    Ok(serde_json::from_value(inner)?)
}

pub struct HttpGraphDataService {
    http: Client,
    config: ServiceConfig,
}

impl HttpGraphDataService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Service(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn url(&self, base_path: &str, service: &str) -> String {
        format!("{}{}{}", self.config.base_url.trim_end_matches('/'), base_path, service)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Service(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Service(format!(
                "{} returned {}: {}",
                url,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Service(format!("Failed to parse response from {}: {}", url, e)))?;
        unwrap_envelope(body)
    }
}

#[async_trait]
impl GraphDataService for HttpGraphDataService {
    async fn address_info(&self, network: Network, address: &str) -> Result<AddressInfo> {
        let url = self.url(&self.config.graph_path, &endpoint(network, Endpoint::AddressInfo));
        self.post(&url, &serde_json::json!({ "address": address })).await
    }

    async fn transaction_map(&self, network: Network, address: &str, params: &QueryParams) -> Result<GraphPayload> {
        let url = self.url(&self.config.graph_path, &endpoint(network, Endpoint::Graph));
        let request = GraphRequest::build(network, address, params, self.config.default_graph_limit);
        match network.family() {
            NetworkFamily::Utxo => self.post::<_, TransactionMap>(&url, &request).await.map(GraphPayload::Utxo),
            NetworkFamily::Account => self.post::<_, AddressMap>(&url, &request).await.map(GraphPayload::Account),
        }
    }

    async fn transaction_detail(&self, network: Network, tx_id: &str) -> Result<TransactionDetail> {
        let url = self.url(&self.config.graph_path, &endpoint(network, Endpoint::Transaction));
        self.post(&url, &serde_json::json!({ "tx_id": tx_id })).await
    }

    async fn denylist_info(&self, address: &str) -> Result<DenylistResponse> {
        let url = self.url(&self.config.dash_path, "wallet/highRiskSearch1");
        let request = DenylistRequest {
            wallet_address: address,
            tran_dtm: Utc::now().format("%Y%m%d%H%M%S").to_string(),
            tran_no: &self.config.tran_no,
        };
        self.post(&url, &request).await
    }
}
