// events/mod.rs
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::LightId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prime,
    Animate,
    Finalize,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Prime, Phase::Animate, Phase::Finalize];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Started,
    Applied,
    Skipped,
    Failed { error: String },
    Finished,
}

/// One structured record of something a show run did to a light.
#[derive(Debug, Clone, Serialize)]
pub struct ShowEvent {
    pub run_id: Uuid,
    pub at: DateTime<Utc>,
    pub phase: Phase,
    pub light: LightId,
    pub operation: &'static str,
    pub outcome: Outcome,
}

type Subscriber = Arc<dyn Fn(&ShowEvent) + Send + Sync>;

pub struct EventBus {
    subscribers: DashMap<Phase, Vec<Subscriber>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Callbacks run after the shard lock is released, so they may
    /// subscribe to the bus themselves.
    pub fn publish(&self, event: &ShowEvent) {
        let subscribers = match self.subscribers.get(&event.phase) {
            Some(subscribers) => subscribers.clone(),
            None => return,
        };
        for callback in subscribers {
            callback(event);
        }
    }

    pub fn subscribe<F: Fn(&ShowEvent) + Send + Sync + 'static>(&self, phase: Phase, callback: F) {
        self.add(phase, Arc::new(callback));
    }

    pub fn subscribe_all<F: Fn(&ShowEvent) + Send + Sync + 'static>(&self, callback: F) {
        let callback: Subscriber = Arc::new(callback);
        for phase in Phase::ALL {
            self.add(phase, Arc::clone(&callback));
        }
    }

    fn add(&self, phase: Phase, callback: Subscriber) {
        self.subscribers.entry(phase).or_default().push(callback);
    }
}
