//! HTTP client for the external insights service.
//!
//! Each task is a `POST {endpoint}/{task}` with a JSON body. The service may
//! answer with plain text or a JSON object carrying the text under `output`,
//! `result`, or `text`.

use std::time::Duration;

use anyhow::Context as _;
use carbon_core::insights::{ExternalServiceError, InsightsService};
use reqwest::Client;
use serde_json::{Value, json};

use crate::InsightsConfig;

/// Async HTTP client implementing [`InsightsService`].
#[derive(Clone)]
pub struct HttpInsights {
  client: Client,
  config: InsightsConfig,
}

impl HttpInsights {
  pub fn new(config: InsightsConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, task: &str) -> String {
    format!("{}/{task}", self.config.endpoint.trim_end_matches('/'))
  }

  async fn ask(&self, task: &str, body: Value) -> Result<String, ExternalServiceError> {
    let mut req = self.client.post(self.url(task)).json(&body);
    if let Some(key) = &self.config.api_key {
      req = req.bearer_auth(key);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| ExternalServiceError::new(format!("POST /{task} failed: {e}")))?;
    let status = resp.status();
    let text = resp
      .text()
      .await
      .map_err(|e| ExternalServiceError::new(format!("reading /{task} response: {e}")))?;

    if !status.is_success() {
      tracing::warn!(task, %status, "insights service returned an error");
      return Err(ExternalServiceError::new(format!("POST /{task} → {status}: {text}")));
    }
    Ok(extract_text(text))
  }
}

/// Pull the answer out of a JSON envelope, or take the body as-is.
fn extract_text(body: String) -> String {
  let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&body) else {
    return body;
  };
  ["output", "result", "text"]
    .iter()
    .find_map(|k| map.get(*k).and_then(Value::as_str))
    .map(str::to_owned)
    .unwrap_or(body)
}

impl InsightsService for HttpInsights {
  async fn classify_activity(
    &self,
    description: &str,
  ) -> Result<String, ExternalServiceError> {
    self.ask("classify", json!({ "description": description })).await
  }

  async fn summarize_records(
    &self,
    records_text: &str,
  ) -> Result<String, ExternalServiceError> {
    self.ask("summary", json!({ "records": records_text })).await
  }

  async fn recommend_offsets(
    &self,
    total_kgco2e: f64,
    location: &str,
    industry: &str,
  ) -> Result<String, ExternalServiceError> {
    self
      .ask("offsets", json!({
        "total_kgCO2e": total_kgco2e,
        "location": location,
        "industry": industry,
      }))
      .await
  }

  async fn check_regulations(
    &self,
    location: &str,
    industry: &str,
    export_markets: &[String],
  ) -> Result<String, ExternalServiceError> {
    self
      .ask("regulations", json!({
        "location": location,
        "industry": industry,
        "export_markets": export_markets.join(", "),
      }))
      .await
  }

  async fn recommend_optimizations(
    &self,
    records_text: &str,
  ) -> Result<String, ExternalServiceError> {
    self.ask("optimizations", json!({ "records": records_text })).await
  }
}
