// show/variants.rs
use std::time::Duration;

use super::plan::Step;
use crate::models::{DEFAULT_SATURATION, StateCommand};

/// Hues visited by the colour cycles, one step per entry.
pub const HUE_WHEEL: [i64; 7] = [0, 10000, 20000, 30000, 40000, 50000, 60000];

const TEMPERATURES: [i64; 5] = [153, 200, 300, 400, 500];

/// A named, deterministic animation for a single light.
pub trait Variant: Sync {
    fn name(&self) -> &'static str;
    /// Position in the registry; index-based assignment cycles through slots.
    fn slot(&self) -> usize;
    fn steps(&self) -> Vec<Step>;
}

inventory::collect!(&'static dyn Variant);

/// Discrete hue changes at a fixed high brightness.
pub struct HueCycle;

impl Variant for HueCycle {
    fn name(&self) -> &'static str {
        "hue_cycle"
    }

    fn slot(&self) -> usize {
        0
    }

    fn steps(&self) -> Vec<Step> {
        HUE_WHEEL
            .iter()
            .flat_map(|&hue| {
                [
                    Step::immediate(StateCommand::color(hue, DEFAULT_SATURATION)),
                    Step::new(StateCommand::brightness(200), Duration::from_millis(300)),
                ]
            })
            .collect()
    }
}

/// Brightness swinging between 150 and full, three times over.
pub struct BrightnessWave;

impl Variant for BrightnessWave {
    fn name(&self) -> &'static str {
        "brightness_wave"
    }

    fn slot(&self) -> usize {
        1
    }

    fn steps(&self) -> Vec<Step> {
        let tick = Duration::from_millis(100);
        let rise = (150..255).step_by(10);
        let fall = (151..=255).rev().step_by(10);

        (0..3)
            .flat_map(|_| rise.clone().chain(fall.clone()))
            .map(|bri| Step::new(StateCommand::brightness(bri), tick))
            .collect()
    }
}

/// Slow walk through colour temperatures at a slightly lower brightness.
pub struct TemperatureDrift;

impl Variant for TemperatureDrift {
    fn name(&self) -> &'static str {
        "temperature_drift"
    }

    fn slot(&self) -> usize {
        2
    }

    fn steps(&self) -> Vec<Step> {
        TEMPERATURES
            .iter()
            .flat_map(|&ct| {
                [
                    Step::immediate(StateCommand::temperature(ct)),
                    Step::new(StateCommand::brightness(220), Duration::from_millis(400)),
                ]
            })
            .collect()
    }
}

inventory::submit! {
    &HueCycle as &'static dyn Variant
}

inventory::submit! {
    &BrightnessWave as &'static dyn Variant
}

inventory::submit! {
    &TemperatureDrift as &'static dyn Variant
}

/// All registered variants in slot order.
pub fn registry() -> Vec<&'static dyn Variant> {
    let mut variants: Vec<&'static dyn Variant> = inventory::iter::<&'static dyn Variant>
        .into_iter()
        .copied()
        .collect();
    variants.sort_by_key(|variant| variant.slot());
    variants
}

pub fn by_name(name: &str) -> Option<&'static dyn Variant> {
    registry().into_iter().find(|variant| variant.name() == name)
}

pub fn by_index(index: usize) -> &'static dyn Variant {
    let variants = registry();
    variants[index % variants.len()]
}
