// handlers.rs

use crate::{
    docs::ApiDoc,
    error::AppError,
    midi::{self, MidiEvent, MidiReply},
    models::{
        Ack, AppState, ColorRequest, LightId, LightRecord, LightStatus, LightStatusSnapshot,
        StateCommand, parse_saturating,
    },
};
use axum::{
    Json, Router,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::{get, put},
};
use futures_util::{SinkExt, StreamExt};
use std::{collections::BTreeMap, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use validator::Validate;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/lights", get(get_lights))
        .route("/api/v1/lights/status", get(get_status))
        .route("/api/v1/lights/{id}/toggle", put(toggle_light))
        .route("/api/v1/lights/{id}/brightness/{value}", put(set_brightness))
        .route("/api/v1/lights/{id}/color", put(set_color))
        .route("/api/v1/lights/{id}/temperature/{value}", put(set_temperature))
        .route("/api/v1/lights/{id}/state", put(set_state))
        .route("/api/v1/midi", get(handle_midi_ws_upgrade))
        .route("/api-doc/openapi.json", get(openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Name, reachability and power state of every light.
#[utoipa::path(
    get,
    path = "/api/v1/lights/status",
    responses(
        (status = 200, description = "Light status by id", body = std::collections::HashMap<String, LightStatus>),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<LightId, LightStatus>>, AppError> {
    Ok(Json(state.gateway.status().await?))
}

/// Full light records, including the bridge's state objects.
#[utoipa::path(
    get,
    path = "/api/v1/lights",
    responses(
        (status = 200, description = "Light records by id", body = std::collections::HashMap<String, LightRecord>),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn get_lights(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LightStatusSnapshot>, AppError> {
    Ok(Json(state.gateway.lights().await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/lights/{id}/toggle",
    params(("id" = String, Path, description = "Light id")),
    responses(
        (status = 200, description = "Bridge acknowledgement"),
        (status = 404, description = "Light not found"),
        (status = 503, description = "Light not reachable"),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn toggle_light(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, AppError> {
    Ok(Json(state.gateway.toggle(&LightId::new(id)).await?))
}

/// Out-of-range values are saturated to 0-254.
#[utoipa::path(
    put,
    path = "/api/v1/lights/{id}/brightness/{value}",
    params(
        ("id" = String, Path, description = "Light id"),
        ("value" = i64, Path, description = "Brightness")
    ),
    responses(
        (status = 200, description = "Bridge acknowledgement"),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn set_brightness(
    State(state): State<Arc<AppState>>,
    Path((id, value)): Path<(String, String)>,
) -> Result<Json<Ack>, AppError> {
    let value = path_number(&value)?;
    Ok(Json(state.gateway.set_brightness(&LightId::new(id), value).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/lights/{id}/color",
    params(("id" = String, Path, description = "Light id")),
    request_body = ColorRequest,
    responses(
        (status = 200, description = "Bridge acknowledgement"),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn set_color(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(color): Json<ColorRequest>,
) -> Result<Json<Ack>, AppError> {
    Ok(Json(state.gateway.set_color(&LightId::new(id), color.hue, color.sat).await?))
}

/// Colour temperature in mireds, saturated to 153-500.
#[utoipa::path(
    put,
    path = "/api/v1/lights/{id}/temperature/{value}",
    params(
        ("id" = String, Path, description = "Light id"),
        ("value" = i64, Path, description = "Colour temperature")
    ),
    responses(
        (status = 200, description = "Bridge acknowledgement"),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn set_temperature(
    State(state): State<Arc<AppState>>,
    Path((id, value)): Path<(String, String)>,
) -> Result<Json<Ack>, AppError> {
    let value = path_number(&value)?;
    Ok(Json(state.gateway.set_temperature(&LightId::new(id), value).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/lights/{id}/state",
    params(("id" = String, Path, description = "Light id")),
    request_body = StateCommand,
    responses(
        (status = 200, description = "Bridge acknowledgement"),
        (status = 400, description = "Empty command"),
        (status = 500, description = "Bridge unavailable")
    )
)]
pub async fn set_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(cmd): Json<StateCommand>,
) -> Result<Json<Ack>, AppError> {
    Ok(Json(state.gateway.apply(&LightId::new(id), cmd).await?))
}

/// Path segments of any magnitude are accepted; the gateway clamps them.
fn path_number(raw: &str) -> Result<i64, AppError> {
    parse_saturating(raw).ok_or_else(|| AppError::Validation(format!("not a number: {raw}")))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub async fn handle_midi_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("MIDI connection attempt");
    ws.on_upgrade(|socket| handle_midi(socket, state))
}

async fn handle_midi(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply = midi_reply(&state, text.as_str()).await;
        let body = match serde_json::to_string(&reply) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to encode MIDI reply: {}", e);
                break;
            }
        };
        if sender.send(Message::Text(body.into())).await.is_err() {
            break;
        }
    }

    info!("MIDI connection closed");
}

async fn midi_reply(state: &AppState, text: &str) -> MidiReply {
    let event = match serde_json::from_str::<MidiEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Invalid MIDI message: {}", e);
            return MidiReply::Error {
                message: e.to_string(),
                code: 400,
            };
        }
    };
    if let Err(e) = event.validate() {
        return MidiReply::Error {
            message: e.to_string(),
            code: 400,
        };
    }

    let Some(action) = midi::translate(&event) else {
        return MidiReply::Ignored;
    };
    let light = event.light.unwrap_or_else(|| state.midi.light.clone());

    match midi::perform(&state.gateway, &light, action).await {
        Ok(()) => MidiReply::Applied { light, action },
        Err(e) => MidiReply::Error {
            code: e.status_code().as_u16(),
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MidiSettings, gateway::Gateway, testing::FakeBridge};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(bridge: &Arc<FakeBridge>) -> Router {
        let state = AppState::new(Gateway::new(bridge.clone()), MidiSettings::default());
        router(Arc::new(state))
    }

    fn lights() -> Arc<FakeBridge> {
        Arc::new(
            FakeBridge::new()
                .with_light(1, "Color One", true, true)
                .with_light(2, "Color Two", false, false)
                .with_light(5, "Color Three", true, false),
        )
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn status_lists_name_reachability_and_power() {
        let (status, body) = call(app(&lights()), "GET", "/api/v1/lights/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["2"],
            json!({"name": "Color Two", "reachable": false, "on": false})
        );
        assert!(body["1"].get("state").is_none());
    }

    #[tokio::test]
    async fn lights_include_state_blob() {
        let (status, body) = call(app(&lights()), "GET", "/api/v1/lights", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["1"]["state"]["bri"], 100);
        assert_eq!(body["5"]["name"], "Color Three");
    }

    #[tokio::test]
    async fn toggle_maps_errors_to_status_codes() {
        let bridge = lights();
        let (status, _) = call(app(&bridge), "PUT", "/api/v1/lights/9/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(app(&bridge), "PUT", "/api/v1/lights/2/toggle", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["detail"].as_str().unwrap().contains("not reachable"));
        assert!(bridge.commands().is_empty());

        let (status, body) = call(app(&bridge), "PUT", "/api/v1/lights/5/toggle", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["success"]["on"], true);
    }

    #[tokio::test]
    async fn brightness_path_value_is_clamped() {
        let bridge = lights();
        let (status, _) = call(app(&bridge), "PUT", "/api/v1/lights/1/brightness/-10", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(app(&bridge), "PUT", "/api/v1/lights/1/brightness/999", None).await;
        assert_eq!(status, StatusCode::OK);

        let levels: Vec<_> = bridge.commands_for(1).iter().map(|c| c.brightness).collect();
        assert_eq!(levels, vec![Some(0), Some(254)]);
    }

    #[tokio::test]
    async fn values_beyond_integer_range_still_saturate() {
        let bridge = lights();
        for uri in [
            "/api/v1/lights/1/brightness/99999999999999999999",
            "/api/v1/lights/1/brightness/-99999999999999999999",
            "/api/v1/lights/1/temperature/99999999999999999999",
        ] {
            let (status, _) = call(app(&bridge), "PUT", uri, None).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
        let (status, _) = call(
            app(&bridge),
            "PUT",
            "/api/v1/lights/1/color",
            Some(json!({"hue": 1e12, "sat": -1e12})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            bridge.commands_for(1),
            vec![
                StateCommand::brightness(254),
                StateCommand::brightness(0),
                StateCommand::temperature(500),
                StateCommand::color(65535, 0),
            ]
        );

        let (status, body) =
            call(app(&bridge), "PUT", "/api/v1/lights/1/brightness/dim", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("not a number"));
        assert_eq!(bridge.commands_for(1).len(), 4);
    }

    #[tokio::test]
    async fn color_defaults_saturation_and_clamps_hue() {
        let bridge = lights();
        let (status, _) = call(
            app(&bridge),
            "PUT",
            "/api/v1/lights/1/color",
            Some(json!({"hue": 70000})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bridge.commands_for(1), vec![StateCommand::color(65535, 254)]);
    }

    #[tokio::test]
    async fn state_endpoint_forwards_partial_commands() {
        let bridge = lights();
        let (status, _) = call(
            app(&bridge),
            "PUT",
            "/api/v1/lights/5/state",
            Some(json!({"on": true, "ct": 900})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sent = bridge.commands_for(5);
        assert_eq!(sent[0].on, Some(true));
        assert_eq!(sent[0].color_temperature, Some(500));

        let (status, _) =
            call(app(&bridge), "PUT", "/api/v1/lights/5/state", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bridge_outage_is_a_server_error() {
        let bridge = Arc::new(FakeBridge::new().offline());
        let (status, body) = call(app(&bridge), "GET", "/api/v1/lights/status", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("upstream unavailable"));
    }

    #[tokio::test]
    async fn serves_openapi_document() {
        let (status, body) = call(app(&lights()), "GET", "/api-doc/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/lights/{id}/toggle"].is_object());
    }

    #[tokio::test]
    async fn midi_replies_cover_each_outcome() {
        let bridge = lights();
        let state = AppState::new(Gateway::new(bridge.clone()), MidiSettings::default());

        let reply = midi_reply(&state, r#"{"type": "note_on", "number": 60}"#).await;
        assert!(matches!(reply, MidiReply::Applied { ref light, .. } if *light == LightId::from(5)));
        assert_eq!(bridge.commands_for(5), vec![StateCommand::power(true)]);

        let reply = midi_reply(&state, r#"{"type": "note_on", "number": 61}"#).await;
        assert!(matches!(reply, MidiReply::Ignored));

        let reply = midi_reply(
            &state,
            r#"{"type": "control_change", "number": 1, "value": 300}"#,
        )
        .await;
        assert!(matches!(reply, MidiReply::Error { code: 400, .. }));

        let reply = midi_reply(
            &state,
            r#"{"type": "control_change", "number": 1, "value": 127, "light": 8}"#,
        )
        .await;
        assert!(matches!(reply, MidiReply::Error { code: 404, .. }));
    }
}
