// show/plan.rs
use std::time::Duration;

use super::variants;
use crate::{
    config::ShowLight,
    error::ShowError,
    models::{LightId, StateCommand},
};

/// One command followed by the pause before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub command: StateCommand,
    pub delay: Duration,
}

impl Step {
    pub fn new(command: StateCommand, delay: Duration) -> Self {
        Self { command, delay }
    }

    pub fn immediate(command: StateCommand) -> Self {
        Self::new(command, Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub light: LightId,
    pub steps: Vec<Step>,
}

/// Per-light animation segments for one show run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowPlan {
    segments: Vec<Segment>,
}

impl ShowPlan {
    pub fn new(segments: Vec<Segment>) -> Result<Self, ShowError> {
        if segments.is_empty() {
            return Err(ShowError::EmptyPlan);
        }
        Ok(Self { segments })
    }

    /// Gives each light its named variant, or the variant at its position
    /// in the list when none is named.
    pub fn assign(lights: &[ShowLight]) -> Result<Self, ShowError> {
        let segments = lights
            .iter()
            .enumerate()
            .map(|(index, light)| -> Result<Segment, ShowError> {
                let variant = match &light.variant {
                    Some(name) => variants::by_name(name)
                        .ok_or_else(|| ShowError::UnknownVariant(name.clone()))?,
                    None => variants::by_index(index),
                };
                Ok(Segment {
                    light: light.id.clone(),
                    steps: variant.steps(),
                })
            })
            .collect::<Result<Vec<_>, ShowError>>()?;

        Self::new(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct target lights in first-seen order.
    pub fn lights(&self) -> Vec<LightId> {
        let mut lights: Vec<LightId> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            if !lights.contains(&segment.light) {
                lights.push(segment.light.clone());
            }
        }
        lights
    }

    pub(crate) fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}
