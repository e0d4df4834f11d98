// models.rs
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Unexpected, Visitor},
};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use utoipa::ToSchema;

use crate::{config::MidiSettings, gateway::Gateway};

pub const BRIGHTNESS_RANGE: RangeInclusive<i64> = 0..=254;
pub const HUE_RANGE: RangeInclusive<i64> = 0..=65535;
pub const SATURATION_RANGE: RangeInclusive<i64> = 0..=254;
pub const TEMPERATURE_RANGE: RangeInclusive<i64> = 153..=500;

pub const DEFAULT_SATURATION: i64 = 254;

/// Bridge-side light key. Bridges report integer keys as strings, config
/// files may use either form; both end up as the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LightId(String);

impl LightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LightId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for LightId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for LightId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => Self(id),
            Raw::Number(id) => Self(id.to_string()),
        })
    }
}

/// Canonical per-light record produced by one bridge read.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LightRecord {
    pub name: String,
    pub reachable: bool,
    pub on: bool,
    /// Bridge state object, passed through untouched.
    #[schema(value_type = Object)]
    pub state: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LightStatus {
    pub name: String,
    pub reachable: bool,
    pub on: bool,
}

impl From<&LightRecord> for LightStatus {
    fn from(record: &LightRecord) -> Self {
        Self {
            name: record.name.clone(),
            reachable: record.reachable,
            on: record.on,
        }
    }
}

/// Point-in-time view of every light the bridge knows about. Only valid for
/// the operation that fetched it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LightStatusSnapshot(BTreeMap<LightId, LightRecord>);

impl LightStatusSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: LightId, record: LightRecord) {
        self.0.insert(id, record);
    }

    pub fn get(&self, id: &LightId) -> Option<&LightRecord> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LightId, &LightRecord)> {
        self.0.iter()
    }

    /// Drops the state blobs, keeping name, reachability and power.
    pub fn summary(&self) -> BTreeMap<LightId, LightStatus> {
        self.0
            .iter()
            .map(|(id, record)| (id.clone(), LightStatus::from(record)))
            .collect()
    }
}

impl FromIterator<(LightId, LightRecord)> for LightStatusSnapshot {
    fn from_iter<I: IntoIterator<Item = (LightId, LightRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rebuilds a snapshot from the stripped status view served by the gateway.
impl From<BTreeMap<LightId, LightStatus>> for LightStatusSnapshot {
    fn from(statuses: BTreeMap<LightId, LightStatus>) -> Self {
        statuses
            .into_iter()
            .map(|(id, status)| {
                let record = LightRecord {
                    name: status.name,
                    reachable: status.reachable,
                    on: status.on,
                    state: serde_json::Value::Null,
                };
                (id, record)
            })
            .collect()
    }
}

/// Partial state write. Field names follow the bridge wire format; inputs
/// are kept wide so out-of-range values can be saturated instead of
/// rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StateCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(
        rename = "bri",
        alias = "brightness",
        default,
        deserialize_with = "saturating_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub brightness: Option<i64>,
    #[serde(default, deserialize_with = "saturating_opt", skip_serializing_if = "Option::is_none")]
    pub hue: Option<i64>,
    #[serde(
        rename = "sat",
        alias = "saturation",
        default,
        deserialize_with = "saturating_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub saturation: Option<i64>,
    #[serde(
        rename = "ct",
        alias = "color_temperature",
        default,
        deserialize_with = "saturating_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub color_temperature: Option<i64>,
}

impl StateCommand {
    pub fn power(on: bool) -> Self {
        Self {
            on: Some(on),
            ..Self::default()
        }
    }

    pub fn brightness(value: i64) -> Self {
        Self {
            brightness: Some(value),
            ..Self::default()
        }
        .clamped()
    }

    pub fn color(hue: i64, saturation: i64) -> Self {
        Self {
            hue: Some(hue),
            saturation: Some(saturation),
            ..Self::default()
        }
        .clamped()
    }

    pub fn temperature(ct: i64) -> Self {
        Self {
            color_temperature: Some(ct),
            ..Self::default()
        }
        .clamped()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Saturates every numeric field into its bridge domain.
    pub fn clamped(self) -> Self {
        Self {
            on: self.on,
            brightness: saturate(self.brightness, &BRIGHTNESS_RANGE),
            hue: saturate(self.hue, &HUE_RANGE),
            saturation: saturate(self.saturation, &SATURATION_RANGE),
            color_temperature: saturate(self.color_temperature, &TEMPERATURE_RANGE),
        }
    }
}

fn saturate(value: Option<i64>, range: &RangeInclusive<i64>) -> Option<i64> {
    value.map(|v| v.clamp(*range.start(), *range.end()))
}

/// Reads an integer of any magnitude, pinning it to the `i64` bounds.
/// Fractions truncate toward zero. Returns `None` for non-numeric text.
pub fn parse_saturating(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    // `as` saturates on overflow and maps infinities to the bounds.
    text.parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
        .map(|value| value as i64)
}

/// Any JSON number, or numeric string, widened into `i64` without failing
/// on overflow.
struct Saturated(i64);

impl<'de> Deserialize<'de> for Saturated {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SaturatedVisitor;

        impl Visitor<'_> for SaturatedVisitor {
            type Value = Saturated;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Saturated, E> {
                Ok(Saturated(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Saturated, E> {
                Ok(Saturated(i64::try_from(v).unwrap_or(i64::MAX)))
            }

            fn visit_i128<E: de::Error>(self, v: i128) -> Result<Saturated, E> {
                Ok(Saturated(v.clamp(i64::MIN.into(), i64::MAX.into()) as i64))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Saturated, E> {
                Ok(Saturated(i64::try_from(v).unwrap_or(i64::MAX)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Saturated, E> {
                if v.is_nan() {
                    return Err(E::invalid_value(Unexpected::Float(v), &self));
                }
                Ok(Saturated(v as i64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Saturated, E> {
                parse_saturating(v)
                    .map(Saturated)
                    .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(SaturatedVisitor)
    }
}

fn saturating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Saturated::deserialize(deserializer).map(|s| s.0)
}

fn saturating_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Saturated>::deserialize(deserializer)?.map(|s| s.0))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ColorRequest {
    #[serde(deserialize_with = "saturating")]
    pub hue: i64,
    #[serde(default = "default_saturation", deserialize_with = "saturating")]
    pub sat: i64,
}

fn default_saturation() -> i64 {
    DEFAULT_SATURATION
}

/// Whatever the bridge echoed back for a state write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ack(pub serde_json::Value);

pub struct AppState {
    pub gateway: Gateway,
    pub midi: MidiSettings,
}

impl AppState {
    pub fn new(gateway: Gateway, midi: MidiSettings) -> Self {
        Self { gateway, midi }
    }
}
