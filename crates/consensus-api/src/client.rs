//! HTTP client for the trading backend.
//!
//! One `reqwest::Client` with a fixed timeout serves all endpoints. The
//! backend is the only source of truth; this client does no caching and
//! no retrying; poll cadence is owned by the scheduler.

use crate::error::{ApiError, ApiResult};
use consensus_core::{CandleSeries, StatusSnapshot, Symbol, Trade};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body for `POST /api/start`. The backend falls back to its default
/// symbol when none is given.
#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<&'a str>,
}

/// Acknowledgment for start/stop/trigger commands.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandAck {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Acknowledgment for `POST /api/demo/toggle`, carrying the new
/// authoritative demo flag.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoToggleAck {
    pub success: bool,
    #[serde(default)]
    pub demo_mode: bool,
}

#[derive(Debug, Deserialize)]
struct SymbolsResponse {
    #[serde(default)]
    symbols: Vec<Symbol>,
}

#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    trades: Vec<Trade>,
}

/// Client for the backend REST API.
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Arguments
    /// * `base_url` - Backend root (e.g. "http://127.0.0.1:8000")
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Http(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /api/status`: authoritative status snapshot.
    pub async fn fetch_status(&self) -> ApiResult<StatusSnapshot> {
        debug!("fetching backend status");
        let response = self
            .client
            .get(self.endpoint("/api/status"))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `POST /api/start`: start the trading session.
    pub async fn start_trading(&self, symbol: Option<&Symbol>) -> ApiResult<CommandAck> {
        let body = StartRequest {
            symbol: symbol.map(Symbol::as_str),
        };
        let response = self
            .client
            .post(self.endpoint("/api/start"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `POST /api/stop`: stop the trading session.
    pub async fn stop_trading(&self) -> ApiResult<CommandAck> {
        let response = self
            .client
            .post(self.endpoint("/api/stop"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `POST /api/debate/trigger`: fire one debate cycle. The backend
    /// acknowledges without a synchronous state change; results arrive
    /// later over the push channel.
    pub async fn trigger_debate(&self) -> ApiResult<CommandAck> {
        let response = self
            .client
            .post(self.endpoint("/api/debate/trigger"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `POST /api/demo/toggle`: flip between demo and live mode.
    pub async fn toggle_demo(&self) -> ApiResult<DemoToggleAck> {
        let response = self
            .client
            .post(self.endpoint("/api/demo/toggle"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `GET /api/symbols`: tradable instruments.
    pub async fn fetch_symbols(&self) -> ApiResult<Vec<Symbol>> {
        let response = self
            .client
            .get(self.endpoint("/api/symbols"))
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        let parsed: SymbolsResponse = Self::parse_body(response).await?;
        Ok(parsed.symbols)
    }

    /// `GET /api/candles?symbol=S`: candle series plus ticker for one
    /// instrument.
    pub async fn fetch_candles(&self, symbol: &Symbol) -> ApiResult<CandleSeries> {
        debug!(symbol = %symbol, "fetching candles");
        let response = self
            .client
            .get(self.endpoint("/api/candles"))
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        Self::parse_body(response).await
    }

    /// `GET /api/trades?limit=N`: most recent trades.
    pub async fn fetch_trades(&self, limit: usize) -> ApiResult<Vec<Trade>> {
        let response = self
            .client
            .get(self.endpoint("/api/trades"))
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))?;
        let parsed: TradesResponse = Self::parse_body(response).await?;
        Ok(parsed.trades)
    }

    /// Check the status code and deserialize the body.
    async fn parse_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}
