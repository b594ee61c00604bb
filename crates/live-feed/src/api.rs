//! Alert Server REST Client
//!
//! History backfill and health probe; the live stream goes through `sse-client`.

use crate::config::FeedConfig;
use crate::error::FeedError;
use alerting::AlertRecord;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Body of the history endpoint
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    alerts: Vec<serde_json::Value>,
}

/// Body of the health endpoint
#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    ok: bool,
}

/// Client for the alert server's REST endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    history_url: String,
    health_url: String,
}

impl ApiClient {
    /// Create a client for the configured server
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let timeout = config.connect_timeout();
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| FeedError::Api(e.to_string()))?;

        Ok(Self {
            client,
            history_url: config.history_url(),
            health_url: config.health_url(),
        })
    }

    /// Fetch the server's recent alerts, oldest first
    ///
    /// Entries that fail validation are dropped.
    pub async fn fetch_history(&self) -> Result<Vec<AlertRecord>, FeedError> {
        let response = self
            .client
            .get(&self.history_url)
            .send()
            .await
            .map_err(|e| FeedError::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Api(format!(
                "{} returned status {}",
                self.history_url, status
            )));
        }

        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Api(e.to_string()))?;

        let mut records = Vec::with_capacity(body.alerts.len());
        for value in body.alerts {
            match AlertRecord::from_value(value) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Dropping malformed history entry: {}", e),
            }
        }

        debug!("Fetched {} history alerts", records.len());
        Ok(records)
    }

    /// Probe the health endpoint; `true` when the server reports ok
    pub async fn health(&self) -> Result<bool, FeedError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| FeedError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: HealthResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Api(e.to_string()))?;
        Ok(body.ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn spawn_server(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_history_drops_malformed_entries() {
        let app = Router::new().route(
            "/api/alerts",
            get(|| async {
                Json(json!({
                    "alerts": [
                        {"risk_level": "MEDIUM", "reasons": ["new-device"], "final_risk": 0.5},
                        "not an alert",
                        {"risk_level": "HIGH", "reasons": ["velocity"], "final_risk": 0.9}
                    ]
                }))
            }),
        );
        let base = spawn_server(app).await;
        let client = ApiClient::new(&FeedConfig::new(&base)).unwrap();

        let records = client.fetch_history().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].risk_level.as_deref(), Some("MEDIUM"));
        assert_eq!(records[1].risk_level.as_deref(), Some("HIGH"));
    }

    #[tokio::test]
    async fn test_history_error_status() {
        let base = spawn_server(Router::new()).await;
        let client = ApiClient::new(&FeedConfig::new(&base)).unwrap();
        assert!(matches!(client.fetch_history().await, Err(FeedError::Api(_))));
    }

    #[tokio::test]
    async fn test_health() {
        let app = Router::new().route("/api/health", get(|| async { Json(json!({"ok": true})) }));
        let base = spawn_server(app).await;
        let client = ApiClient::new(&FeedConfig::new(&base)).unwrap();
        assert!(client.health().await.unwrap());

        let base = spawn_server(Router::new()).await;
        let client = ApiClient::new(&FeedConfig::new(&base)).unwrap();
        assert!(!client.health().await.unwrap());
    }
}
