//! OpenAPI document for the REST pass-through surface.

use utoipa::OpenApi;

use crate::api::dto::{
    EntityRequest, MessageResponse, NumberSetValueRequest, SelectOptionRequest, TemplateRequest,
};
use crate::api::handlers::{entities, services, system, template};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI specification.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        system::health_handler,
        template::render_template,
        entities::get_entity_state,
        services::number_set_value,
        services::switch_turn_on,
        services::switch_turn_off,
        services::select_option,
        services::light_turn_on,
        services::light_turn_off,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        TemplateRequest,
        EntityRequest,
        NumberSetValueRequest,
        SelectOptionRequest,
        MessageResponse,
        system::HealthResponse,
    )),
    tags(
        (name = "System", description = "Gateway health"),
        (name = "Passthrough", description = "Template and entity state forwarding"),
        (name = "Services", description = "Service-call forwarding"),
    )
)]
pub struct ApiDoc;
