//! Forward/drop decision for upstream entities.
//!
//! [`decide`] is pure: it looks only at the entity identifier and the
//! client's interest set. An explicit interest set is an exact allow-list;
//! an empty one falls back to the built-in table of sensor attribute
//! suffixes the zone configurator renders.

use std::collections::HashSet;

/// Outcome of filtering a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Relay the entity to the client.
    Forward,
    /// Discard the entity.
    Drop,
}

impl Decision {
    /// Returns `true` for [`Decision::Forward`].
    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// Attribute-name suffixes forwarded when the client has no explicit
/// selection. Matching is case-sensitive.
pub const DEFAULT_SUFFIXES: &[&str] = &[
    // Zone coordinates
    "zone_1_begin_x",
    "zone_1_begin_y",
    "zone_1_end_x",
    "zone_1_end_y",
    "zone_2_begin_x",
    "zone_2_begin_y",
    "zone_2_end_x",
    "zone_2_end_y",
    "zone_3_begin_x",
    "zone_3_begin_y",
    "zone_3_end_x",
    "zone_3_end_y",
    "zone_4_begin_x",
    "zone_4_begin_y",
    "zone_4_end_x",
    "zone_4_end_y",
    // Target tracking
    "target_1_active",
    "target_2_active",
    "target_3_active",
    "target_1_x",
    "target_1_y",
    "target_1_speed",
    "target_1_resolution",
    "target_2_x",
    "target_2_y",
    "target_2_speed",
    "target_2_resolution",
    "target_3_x",
    "target_3_y",
    "target_3_speed",
    "target_3_resolution",
    "target_1_angle",
    "target_2_angle",
    "target_3_angle",
    "target_1_distance",
    "target_2_distance",
    "target_3_distance",
    // Zone occupancy off delay
    "zone_1_occupancy_off_delay",
    "zone_2_occupancy_off_delay",
    "zone_3_occupancy_off_delay",
    "zone_4_occupancy_off_delay",
    // Configured values
    "max_distance",
    "installation_angle",
    // Occupancy masks (exclusion zones)
    "occupancy_mask_1_begin_x",
    "occupancy_mask_1_begin_y",
    "occupancy_mask_1_end_x",
    "occupancy_mask_1_end_y",
    "occupancy_mask_2_begin_x",
    "occupancy_mask_2_begin_y",
    "occupancy_mask_2_end_x",
    "occupancy_mask_2_end_y",
    // Settings
    "bluetooth_switch",
    "inverse_mounting",
    "aggressive_target_clearing",
    "off_delay",
    "zone_1_off_delay",
    "zone_2_off_delay",
    "zone_3_off_delay",
    "zone_4_off_delay",
    "aggressive_timeout",
    "illuminance_offset_ui",
    "illuminance_offset",
    "esp32_led",
    "status_led",
];

/// Returns `true` if `entity_id` ends with one of [`DEFAULT_SUFFIXES`].
#[must_use]
pub fn is_default_entity(entity_id: &str) -> bool {
    !entity_id.is_empty()
        && DEFAULT_SUFFIXES
            .iter()
            .any(|suffix| entity_id.ends_with(suffix))
}

/// Returns `true` for a well-formed `domain.object_id`: lowercase ASCII
/// letters, digits and `_`, with a non-empty domain and object id.
///
/// Ids are interpolated into upstream URL paths, so anything else
/// (`/`, `%`, `..`) is refused before a request is built.
#[must_use]
pub fn is_valid_entity_id(entity_id: &str) -> bool {
    let Some((domain, object_id)) = entity_id.split_once('.') else {
        return false;
    };
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_';
    !domain.is_empty()
        && !object_id.is_empty()
        && domain.chars().all(allowed)
        && object_id.chars().all(allowed)
}

/// Decides whether an entity passes the client's interest set.
///
/// - empty `entity_id` is always dropped (the caller logs it as malformed);
/// - a non-empty `interest` forwards exact members only;
/// - an empty `interest` forwards the default suffix table.
#[must_use]
pub fn decide(entity_id: &str, interest: &HashSet<String>) -> Decision {
    let forward = if entity_id.is_empty() {
        false
    } else if interest.is_empty() {
        is_default_entity(entity_id)
    } else {
        interest.contains(entity_id)
    };

    if forward {
        Decision::Forward
    } else {
        Decision::Drop
    }
}
