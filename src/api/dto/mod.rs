//! Data Transfer Objects for REST request/response serialization.
//!
//! Request fields are optional at the serde level so that missing fields
//! surface as structured 400 errors instead of extractor rejections.

pub mod common_dto;
pub mod service_dto;
pub mod template_dto;

pub use common_dto::*;
pub use service_dto::*;
pub use template_dto::*;
