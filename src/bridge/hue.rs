// bridge/hue.rs
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{LightBridge, normalize};
use crate::{
    config::BridgeSettings,
    error::BridgeError,
    models::{Ack, LightId, LightStatusSnapshot, StateCommand},
    utils,
};

/// Bridge client speaking the Hue v1 REST API.
pub struct HueBridge {
    client: Client,
    lights_url: String,
}

impl HueBridge {
    pub fn new(settings: &BridgeSettings) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        let base = utils::http_base_url(&settings.host);

        Ok(Self {
            client,
            lights_url: format!("{base}/api/{}/lights", settings.username),
        })
    }

    fn state_url(&self, id: &LightId) -> String {
        format!("{}/{id}/state", self.lights_url)
    }
}

#[async_trait::async_trait]
impl LightBridge for HueBridge {
    async fn fetch_all(&self) -> Result<LightStatusSnapshot, BridgeError> {
        let response = self.client.get(&self.lights_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| BridgeError::MalformedResponse(e.to_string()))?;
        let snapshot = normalize(body)?;
        debug!(lights = snapshot.len(), "Fetched lights from bridge");
        Ok(snapshot)
    }

    async fn apply_state(&self, id: &LightId, cmd: &StateCommand) -> Result<Ack, BridgeError> {
        let body = cmd.clamped();
        debug!(light = %id, ?body, "Sending state to bridge");

        let response = self.client.put(self.state_url(id)).json(&body).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(BridgeError::NotFound(id.clone())),
            status if !status.is_success() => {
                return Err(BridgeError::Rejected {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Ack(Value::Null));
        }
        serde_json::from_slice(&bytes)
            .map(Ack)
            .map_err(|e| BridgeError::MalformedResponse(e.to_string()))
    }
}
