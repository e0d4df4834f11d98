// bridge/mod.rs
mod hue;
pub use hue::HueBridge;

use serde_json::{Map, Value};

use crate::{
    error::BridgeError,
    models::{Ack, LightId, LightRecord, LightStatusSnapshot, StateCommand},
};

/// The lighting bridge as seen by the gateway. Implementations hold no
/// state between calls.
#[async_trait::async_trait]
pub trait LightBridge: Send + Sync {
    async fn fetch_all(&self) -> Result<LightStatusSnapshot, BridgeError>;

    /// Sends one state write. Reachability is not checked here, and success
    /// is decided by the HTTP status alone.
    async fn apply_state(&self, id: &LightId, cmd: &StateCommand) -> Result<Ack, BridgeError>;
}

/// The two container shapes a bridge answers the lights collection with.
enum LightsBody {
    Keyed(Map<String, Value>),
    Positional(Vec<Value>),
}

impl LightsBody {
    fn classify(body: Value) -> Result<Self, BridgeError> {
        match body {
            Value::Object(map) => Ok(Self::Keyed(map)),
            Value::Array(items) => Ok(Self::Positional(items)),
            other => Err(BridgeError::MalformedResponse(format!(
                "expected object or array of lights, got {}",
                kind_of(&other)
            ))),
        }
    }
}

/// Turns a lights collection body into a snapshot. Positional entries use
/// their own `id` field when present, otherwise their 1-based position.
pub fn normalize(body: Value) -> Result<LightStatusSnapshot, BridgeError> {
    match LightsBody::classify(body)? {
        LightsBody::Keyed(map) => map
            .into_iter()
            .map(|(key, raw)| -> Result<_, BridgeError> {
                Ok((LightId::new(key), parse_record(raw)?))
            })
            .collect(),
        LightsBody::Positional(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, raw)| -> Result<_, BridgeError> {
                let id = positional_id(&raw, index)?;
                Ok((id, parse_record(raw)?))
            })
            .collect(),
    }
}

fn positional_id(raw: &Value, index: usize) -> Result<LightId, BridgeError> {
    match raw.get("id") {
        None => Ok(LightId::new((index + 1).to_string())),
        Some(Value::String(id)) => Ok(LightId::new(id.clone())),
        Some(Value::Number(id)) => Ok(LightId::new(id.to_string())),
        Some(other) => Err(BridgeError::MalformedResponse(format!(
            "light at position {index} has a {} id",
            kind_of(other)
        ))),
    }
}

fn parse_record(raw: Value) -> Result<LightRecord, BridgeError> {
    let Value::Object(mut fields) = raw else {
        return Err(BridgeError::MalformedResponse(
            "light entry is not an object".into(),
        ));
    };

    let name = match fields.remove("name") {
        Some(Value::String(name)) => name,
        _ => {
            return Err(BridgeError::MalformedResponse(
                "light entry has no name".into(),
            ));
        }
    };

    let state = match fields.remove("state") {
        Some(state @ Value::Object(_)) => state,
        _ => {
            return Err(BridgeError::MalformedResponse(format!(
                "light {name} has no state object"
            )));
        }
    };

    let flag = |key: &str| state.get(key).and_then(Value::as_bool).unwrap_or(false);

    Ok(LightRecord {
        reachable: flag("reachable"),
        on: flag("on"),
        name,
        state,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lamp(name: &str, on: bool, reachable: bool) -> Value {
        json!({
            "name": name,
            "type": "Extended color light",
            "state": { "on": on, "bri": 100, "reachable": reachable }
        })
    }

    #[test]
    fn keyed_and_positional_bodies_normalize_identically() {
        let keyed = json!({
            "1": lamp("Color One", true, true),
            "2": lamp("Color Two", false, false),
        });
        let positional = json!([lamp("Color One", true, true), lamp("Color Two", false, false)]);

        let from_keyed = normalize(keyed).unwrap();
        let from_positional = normalize(positional).unwrap();

        assert_eq!(from_keyed, from_positional);
        assert_eq!(from_keyed.len(), 2);
        let second = from_keyed.get(&LightId::from(2)).unwrap();
        assert!(!second.reachable);
        assert!(!second.on);
        assert_eq!(second.state["bri"], 100);
    }

    #[test]
    fn positional_entries_prefer_their_own_id() {
        let mut entry = lamp("Color Three", true, true);
        entry["id"] = json!(5);
        let snapshot = normalize(json!([entry])).unwrap();
        assert!(snapshot.get(&LightId::from(5)).is_some());
        assert!(snapshot.get(&LightId::from(1)).is_none());
    }

    #[test]
    fn missing_flags_default_to_false() {
        let snapshot = normalize(json!({"3": {"name": "Hue white lamp 1", "state": {}}})).unwrap();
        let record = snapshot.get(&LightId::from(3)).unwrap();
        assert!(!record.reachable);
        assert!(!record.on);
    }

    #[test]
    fn rejects_unknown_shapes() {
        for body in [json!("lights"), json!(42), json!(null)] {
            assert!(matches!(
                normalize(body),
                Err(BridgeError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn rejects_entries_without_name_or_state() {
        let no_state = json!({"1": {"name": "x"}});
        assert!(matches!(
            normalize(no_state),
            Err(BridgeError::MalformedResponse(_))
        ));

        let error_list = json!([{"error": {"type": 1, "description": "unauthorized user"}}]);
        assert!(matches!(
            normalize(error_list),
            Err(BridgeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_collections_are_valid() {
        assert!(normalize(json!({})).unwrap().is_empty());
        assert!(normalize(json!([])).unwrap().is_empty());
    }
}
