use utoipa::OpenApi;
use crate::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_status,
        handlers::get_lights,
        handlers::toggle_light,
        handlers::set_brightness,
        handlers::set_color,
        handlers::set_temperature,
        handlers::set_state,
    ),
    components(
        schemas(
            models::LightStatus,
            models::LightRecord,
            models::StateCommand,
            models::ColorRequest,
        )
    )
)]
pub struct ApiDoc;
