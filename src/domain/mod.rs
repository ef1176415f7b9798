//! Domain layer: frames, entity filtering, and per-session interest sets.
//!
//! Nothing in here performs I/O. The WebSocket layer parses traffic into
//! [`Frame`]s, classifies them, and asks [`InterestSet`] whether an entity
//! should reach the client.

pub mod entity_filter;
pub mod frame;
pub mod interest_set;

pub use entity_filter::{Decision, decide, is_valid_entity_id};
pub use frame::{ClientMessage, Frame, UpstreamMessage};
pub use interest_set::InterestSet;
