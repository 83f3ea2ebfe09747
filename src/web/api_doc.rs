use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::robot::{QueuedResponse, ScanRequest};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::robot::scan,
        super::api::robot::capture,
        super::api::robot::photo,
        super::api::robot::heading,
        super::api::robot::antenna,
        super::api::robot::stop,
        super::api::status::controller,
        super::api::status::connectivity,
    ),
    components(
        schemas(
            ScanRequest,
            QueuedResponse,
            ErrorResponse,
            crate::scan::ScanPlan,
            crate::scan::ScanPosition,
            crate::scan::Direction,
            crate::capture::SampleRecord,
            crate::capture::AntennaReading,
            crate::controller::ControllerStatus,
            crate::controller::ControllerMode,
            crate::controller::CommandOutcome,
            crate::peripheral::ConnectivityStatus,
            crate::peripheral::LinkHealth,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Survey-O-Mat Operator API",
        description = "Queue scans and manual captures on the survey robot",
        version = "0.1.0"
    ),
    tags(
        (name = "robot", description = "Commands executed by the robot controller"),
        (name = "status", description = "Controller and peripheral status")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
