// control.rs
use crate::{
    error::AppError,
    gateway::Gateway,
    models::{Ack, LightId, LightStatusSnapshot, StateCommand},
};

/// The gateway operations a show drives. Implemented in-process by
/// [`Gateway`] and over HTTP by [`crate::show::GatewayClient`].
#[async_trait::async_trait]
pub trait LightControl: Send + Sync {
    async fn status(&self) -> Result<LightStatusSnapshot, AppError>;
    async fn toggle(&self, id: &LightId) -> Result<Ack, AppError>;
    async fn set_brightness(&self, id: &LightId, value: i64) -> Result<Ack, AppError>;
    async fn apply(&self, id: &LightId, cmd: StateCommand) -> Result<Ack, AppError>;
}

#[async_trait::async_trait]
impl LightControl for Gateway {
    async fn status(&self) -> Result<LightStatusSnapshot, AppError> {
        self.lights().await
    }

    async fn toggle(&self, id: &LightId) -> Result<Ack, AppError> {
        Gateway::toggle(self, id).await
    }

    async fn set_brightness(&self, id: &LightId, value: i64) -> Result<Ack, AppError> {
        Gateway::set_brightness(self, id, value).await
    }

    async fn apply(&self, id: &LightId, cmd: StateCommand) -> Result<Ack, AppError> {
        Gateway::apply(self, id, cmd).await
    }
}
