//! Template rendering DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

use super::common_dto::required;
use crate::error::GatewayError;

/// Request body for `POST /api/template`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TemplateRequest {
    /// Jinja2 template source, rendered upstream.
    #[serde(default)]
    pub template: Option<String>,
}

impl TemplateRequest {
    /// Returns the template, rejecting a missing or blank one.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidRequest`] when no template was provided.
    pub fn into_template(self) -> Result<String, GatewayError> {
        required(self.template, "template")
            .map_err(|_| GatewayError::InvalidRequest("No template provided".to_string()))
    }
}
