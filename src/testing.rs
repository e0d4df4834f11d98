//! In-memory bridge for unit tests. Records every state write with the
//! tokio clock reading at which it landed.

use serde_json::json;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::time::Instant;

use crate::{
    bridge::LightBridge,
    error::BridgeError,
    models::{Ack, LightId, LightRecord, LightStatusSnapshot, StateCommand},
};

#[derive(Debug, Clone)]
pub struct AppliedCall {
    pub light: LightId,
    pub command: StateCommand,
    pub at: Instant,
}

#[derive(Default)]
pub struct FakeBridge {
    lights: Mutex<BTreeMap<LightId, LightRecord>>,
    calls: Mutex<Vec<AppliedCall>>,
    fetches: AtomicUsize,
    failing: HashSet<LightId>,
    panicking: HashSet<LightId>,
    latency: HashMap<LightId, Duration>,
    offline: bool,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_light(self, id: u32, name: &str, reachable: bool, on: bool) -> Self {
        let record = LightRecord {
            name: name.to_string(),
            reachable,
            on,
            state: json!({ "on": on, "bri": 100, "reachable": reachable }),
        };
        self.lights
            .lock()
            .unwrap()
            .insert(LightId::from(id), record);
        self
    }

    /// Every state write to `id` is rejected by the bridge.
    pub fn failing(mut self, id: u32) -> Self {
        self.failing.insert(LightId::from(id));
        self
    }

    /// Every state write to `id` panics inside the bridge call.
    pub fn panicking(mut self, id: u32) -> Self {
        self.panicking.insert(LightId::from(id));
        self
    }

    /// State writes to `id` take `delay` of tokio time to complete.
    pub fn slow(mut self, id: u32, delay: Duration) -> Self {
        self.latency.insert(LightId::from(id), delay);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn calls(&self) -> Vec<AppliedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<(LightId, StateCommand)> {
        self.calls()
            .into_iter()
            .map(|call| (call.light, call.command))
            .collect()
    }

    pub fn commands_for(&self, id: u32) -> Vec<StateCommand> {
        let id = LightId::from(id);
        self.calls()
            .into_iter()
            .filter(|call| call.light == id)
            .map(|call| call.command)
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn outage() -> BridgeError {
        BridgeError::Rejected {
            status: 502,
            body: "bridge offline".into(),
        }
    }
}

#[async_trait::async_trait]
impl LightBridge for FakeBridge {
    async fn fetch_all(&self) -> Result<LightStatusSnapshot, BridgeError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(Self::outage());
        }
        let lights = self.lights.lock().unwrap();
        Ok(lights
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    async fn apply_state(&self, id: &LightId, cmd: &StateCommand) -> Result<Ack, BridgeError> {
        if self.offline {
            return Err(Self::outage());
        }
        if !self.lights.lock().unwrap().contains_key(id) {
            return Err(BridgeError::NotFound(id.clone()));
        }
        if let Some(delay) = self.latency.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(id) {
            panic!("bridge exploded while writing light {id}");
        }
        if self.failing.contains(id) {
            return Err(BridgeError::Rejected {
                status: 500,
                body: format!("light {id} rejected the write"),
            });
        }

        let cmd = cmd.clamped();
        self.calls.lock().unwrap().push(AppliedCall {
            light: id.clone(),
            command: cmd,
            at: Instant::now(),
        });
        if let Some(on) = cmd.on {
            if let Some(record) = self.lights.lock().unwrap().get_mut(id) {
                record.on = on;
                if let Some(state) = record.state.as_object_mut() {
                    state.insert("on".into(), json!(on));
                }
            }
        }

        Ok(Ack(json!([{ "success": serde_json::to_value(cmd).unwrap_or_default() }])))
    }
}
