//! Service layer: the REST client for the upstream platform.
//!
//! Handlers translate client JSON into a [`ServiceCall`] or a direct
//! [`HaClient`] call; this layer owns authentication and error mapping.

pub mod ha_client;

pub use ha_client::{HaClient, ProbeStatus, RawResponse, ServiceCall};
