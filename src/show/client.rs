// show/client.rs
use reqwest::{Client, Response, StatusCode};
use std::{collections::BTreeMap, time::Duration};
use tracing::debug;

use crate::{
    control::LightControl,
    error::AppError,
    models::{Ack, LightId, LightStatus, LightStatusSnapshot, StateCommand},
    utils,
};

/// Drives a running gateway over its HTTP API, for shows run out of process.
pub struct GatewayClient {
    client: Client,
    lights_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            lights_url: format!("{}/api/v1/lights", utils::http_base_url(base_url)),
        })
    }

    async fn ack(&self, id: &LightId, response: Response) -> Result<Ack, AppError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(id.clone())),
            StatusCode::SERVICE_UNAVAILABLE => Err(AppError::NotReachable(id.clone())),
            status if !status.is_success() => Err(unexpected(status, response).await),
            _ => response.json::<Ack>().await.map_err(transport),
        }
    }
}

#[async_trait::async_trait]
impl LightControl for GatewayClient {
    async fn status(&self) -> Result<LightStatusSnapshot, AppError> {
        let response = self
            .client
            .get(format!("{}/status", self.lights_url))
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(unexpected(response.status(), response).await);
        }

        let statuses: BTreeMap<LightId, LightStatus> =
            response.json().await.map_err(transport)?;
        debug!(lights = statuses.len(), "Fetched light status from gateway");
        Ok(statuses.into())
    }

    async fn toggle(&self, id: &LightId) -> Result<Ack, AppError> {
        let response = self
            .client
            .put(format!("{}/{id}/toggle", self.lights_url))
            .send()
            .await
            .map_err(transport)?;
        self.ack(id, response).await
    }

    async fn set_brightness(&self, id: &LightId, value: i64) -> Result<Ack, AppError> {
        let response = self
            .client
            .put(format!("{}/{id}/brightness/{value}", self.lights_url))
            .send()
            .await
            .map_err(transport)?;
        self.ack(id, response).await
    }

    async fn apply(&self, id: &LightId, cmd: StateCommand) -> Result<Ack, AppError> {
        let response = self
            .client
            .put(format!("{}/{id}/state", self.lights_url))
            .json(&cmd)
            .send()
            .await
            .map_err(transport)?;
        self.ack(id, response).await
    }
}

fn transport(e: reqwest::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(e).context("gateway request failed"))
}

async fn unexpected(status: StatusCode, response: Response) -> AppError {
    let body = response.text().await.unwrap_or_default();
    AppError::Internal(anyhow::anyhow!("gateway returned {status}: {body}"))
}
