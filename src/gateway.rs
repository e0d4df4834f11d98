// gateway.rs
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info, warn};

use crate::{
    bridge::LightBridge,
    error::AppError,
    gate,
    metrics,
    models::{Ack, LightId, LightStatus, LightStatusSnapshot, StateCommand},
};

/// Stateless translation layer between the public light API and the
/// bridge. Every call re-reads whatever bridge state it needs.
#[derive(Clone)]
pub struct Gateway {
    bridge: Arc<dyn LightBridge>,
}

impl Gateway {
    pub fn new(bridge: Arc<dyn LightBridge>) -> Self {
        Self { bridge }
    }

    pub async fn status(&self) -> Result<BTreeMap<LightId, LightStatus>, AppError> {
        let snapshot = self.snapshot("status", None).await?;
        info!(lights = snapshot.len(), "Retrieved light status information");
        Ok(snapshot.summary())
    }

    pub async fn lights(&self) -> Result<LightStatusSnapshot, AppError> {
        self.snapshot("lights", None).await
    }

    /// Inverts the light's current power state. The read and the write are
    /// separate bridge calls; a change in between only flips the direction.
    pub async fn toggle(&self, id: &LightId) -> Result<Ack, AppError> {
        let snapshot = self.snapshot("toggle", Some(id)).await?;

        let Some(record) = snapshot.get(id) else {
            error!(operation = "toggle", light = %id, "Light not found in bridge response");
            return Err(AppError::NotFound(id.clone()));
        };
        if !gate::permits(&snapshot, id) {
            warn!(operation = "toggle", light = %id, "Light is not reachable");
            return Err(AppError::NotReachable(id.clone()));
        }

        let target = !record.on;
        let ack = self.send("toggle", id, StateCommand::power(target)).await?;
        info!(light = %id, on = target, "Toggled light");
        Ok(ack)
    }

    pub async fn set_power(&self, id: &LightId, on: bool) -> Result<Ack, AppError> {
        self.send("set_power", id, StateCommand::power(on)).await
    }

    pub async fn set_brightness(&self, id: &LightId, value: i64) -> Result<Ack, AppError> {
        self.send("set_brightness", id, StateCommand::brightness(value))
            .await
    }

    pub async fn set_color(&self, id: &LightId, hue: i64, sat: i64) -> Result<Ack, AppError> {
        self.send("set_color", id, StateCommand::color(hue, sat)).await
    }

    pub async fn set_temperature(&self, id: &LightId, ct: i64) -> Result<Ack, AppError> {
        self.send("set_temperature", id, StateCommand::temperature(ct))
            .await
    }

    pub async fn apply(&self, id: &LightId, cmd: StateCommand) -> Result<Ack, AppError> {
        if cmd.is_empty() {
            return Err(AppError::Validation(
                "state command sets no attributes".into(),
            ));
        }
        self.send("apply_state", id, cmd.clamped()).await
    }

    async fn snapshot(
        &self,
        operation: &'static str,
        light: Option<&LightId>,
    ) -> Result<LightStatusSnapshot, AppError> {
        match self.bridge.fetch_all().await {
            Ok(snapshot) => {
                metrics::record_bridge_call(operation, "ok");
                Ok(snapshot)
            }
            Err(e) => {
                metrics::record_bridge_call(operation, "error");
                error!(operation, light = light.map(LightId::as_str), error = %e, "Failed to retrieve lights");
                Err(e.into())
            }
        }
    }

    async fn send(
        &self,
        operation: &'static str,
        id: &LightId,
        cmd: StateCommand,
    ) -> Result<Ack, AppError> {
        match self.bridge.apply_state(id, &cmd).await {
            Ok(ack) => {
                metrics::record_bridge_call(operation, "ok");
                info!(operation, light = %id, ?cmd, "Applied light state");
                Ok(ack)
            }
            Err(e) => {
                metrics::record_bridge_call(operation, "error");
                error!(operation, light = %id, error = %e, "Bridge call failed");
                Err(e.into())
            }
        }
    }
}
