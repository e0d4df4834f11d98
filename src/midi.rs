// midi.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    error::AppError,
    gateway::Gateway,
    models::{DEFAULT_SATURATION, LightId},
    show::variants::HUE_WHEEL,
};

const CYCLE_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiKind {
    NoteOn,
    ControlChange,
}

/// A MIDI message as forwarded by a controller bridge. `number` is the note
/// for `note_on` and the controller for `control_change`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MidiEvent {
    #[serde(rename = "type")]
    pub kind: MidiKind,
    #[validate(range(max = 127))]
    pub number: u8,
    #[validate(range(max = 127))]
    #[serde(default)]
    pub value: u8,
    #[serde(default)]
    pub light: Option<LightId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MidiAction {
    Power { on: bool },
    Brightness { value: i64 },
    Color { hue: i64 },
    Temperature { ct: i64 },
    CycleColors,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MidiReply {
    Applied { light: LightId, action: MidiAction },
    Ignored,
    Error { message: String, code: u16 },
}

pub fn translate(event: &MidiEvent) -> Option<MidiAction> {
    match (event.kind, event.number) {
        (MidiKind::NoteOn, 60) => Some(MidiAction::Power { on: true }),
        (MidiKind::NoteOn, 62) => Some(MidiAction::Power { on: false }),
        (MidiKind::NoteOn, 64) => Some(MidiAction::Brightness { value: 200 }),
        (MidiKind::NoteOn, 65) => Some(MidiAction::Brightness { value: 50 }),
        (MidiKind::NoteOn, 67) => Some(MidiAction::CycleColors),
        (MidiKind::ControlChange, 1) => Some(MidiAction::Brightness {
            value: scale(event.value, 254),
        }),
        (MidiKind::ControlChange, 2) => Some(MidiAction::Color {
            hue: scale(event.value, 65535),
        }),
        (MidiKind::ControlChange, 3) => Some(MidiAction::Temperature {
            ct: scale(event.value, 347) + 153,
        }),
        _ => None,
    }
}

/// Maps a 7-bit controller value onto `0..=span`.
fn scale(value: u8, span: i64) -> i64 {
    i64::from(value) * span / 127
}

pub async fn perform(gateway: &Gateway, light: &LightId, action: MidiAction) -> Result<(), AppError> {
    match action {
        MidiAction::Power { on } => gateway.set_power(light, on).await?,
        MidiAction::Brightness { value } => gateway.set_brightness(light, value).await?,
        MidiAction::Color { hue } => gateway.set_color(light, hue, DEFAULT_SATURATION).await?,
        MidiAction::Temperature { ct } => gateway.set_temperature(light, ct).await?,
        MidiAction::CycleColors => {
            tokio::spawn(cycle_colors(gateway.clone(), light.clone()));
            return Ok(());
        }
    };
    Ok(())
}

/// Walks the hue wheel once, a second per colour. Stops at the first error.
async fn cycle_colors(gateway: Gateway, light: LightId) {
    info!(light = %light, "Cycling colours");
    for hue in HUE_WHEEL {
        if let Err(e) = gateway.set_color(&light, hue, DEFAULT_SATURATION).await {
            warn!(light = %light, error = %e, "Colour cycle aborted");
            return;
        }
        tokio::time::sleep(CYCLE_STEP).await;
    }
}
