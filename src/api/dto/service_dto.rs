//! Service-call DTOs.
//!
//! Each request validates into a [`ServiceCall`]; missing fields become a
//! 400 before anything is sent upstream.

use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::common_dto::required;
use crate::error::GatewayError;
use crate::service::ServiceCall;

/// Request body for the switch and light endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EntityRequest {
    /// Target entity.
    #[serde(default)]
    pub entity_id: Option<String>,
}

impl EntityRequest {
    /// Validated entity id.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidRequest`] when `entity_id` is missing.
    pub fn entity_id(self) -> Result<String, GatewayError> {
        required(self.entity_id, "entity_id")
    }
}

/// Request body for `POST /api/services/number/set_value`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NumberSetValueRequest {
    /// Target entity.
    #[serde(default)]
    pub entity_id: Option<String>,
    /// New value; numbers and numeric strings are passed through unchanged.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: Option<Value>,
}

impl TryFrom<NumberSetValueRequest> for ServiceCall {
    type Error = GatewayError;

    fn try_from(req: NumberSetValueRequest) -> Result<Self, Self::Error> {
        let missing = || GatewayError::InvalidRequest("Missing entity_id or value".to_string());
        let entity_id = required(req.entity_id, "entity_id").map_err(|_| missing())?;
        let value = req.value.filter(|v| !v.is_null()).ok_or_else(missing)?;
        Ok(Self::NumberSetValue { entity_id, value })
    }
}

/// Request body for `POST /api/services/select/select_option`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectOptionRequest {
    /// Target entity.
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Option to select.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub option: Option<Value>,
}

impl TryFrom<SelectOptionRequest> for ServiceCall {
    type Error = GatewayError;

    fn try_from(req: SelectOptionRequest) -> Result<Self, Self::Error> {
        let missing = || GatewayError::InvalidRequest("Missing entity_id or option".to_string());
        let entity_id = required(req.entity_id, "entity_id").map_err(|_| missing())?;
        let option = req.option.filter(|v| !v.is_null()).ok_or_else(missing)?;
        Ok(Self::SelectOption { entity_id, option })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn number_request_requires_both_fields() {
        let req = NumberSetValueRequest {
            entity_id: Some("number.x".to_string()),
            value: None,
        };
        assert!(matches!(
            ServiceCall::try_from(req),
            Err(GatewayError::InvalidRequest(msg)) if msg == "Missing entity_id or value"
        ));
    }

    #[test]
    fn number_request_accepts_zero() {
        let req = NumberSetValueRequest {
            entity_id: Some("number.x".to_string()),
            value: Some(json!(0)),
        };
        let Ok(call) = ServiceCall::try_from(req) else {
            panic!("zero is a valid value");
        };
        assert_eq!(call.payload(), json!({"entity_id": "number.x", "value": 0}));
    }

    #[test]
    fn select_request_validates() {
        let req = SelectOptionRequest {
            entity_id: None,
            option: Some(json!("Auto")),
        };
        assert!(ServiceCall::try_from(req).is_err());
    }

    #[test]
    fn entity_request_deserializes_missing_field() {
        let Ok(req) = serde_json::from_value::<EntityRequest>(json!({})) else {
            panic!("empty body should deserialize");
        };
        assert!(req.entity_id().is_err());
    }
}
