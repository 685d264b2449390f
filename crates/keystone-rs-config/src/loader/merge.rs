//! Deep merge helpers for layered configuration.

use crate::value::{ConfigMap, ConfigValue};

/// Merge overlay values into the base, recursively merging maps.
///
/// Scalars and lists from the overlay replace the base value.
pub fn deep_merge(base: &mut ConfigValue, overlay: &ConfigValue) {
    match (base, overlay) {
        (ConfigValue::Map(base_map), ConfigValue::Map(overlay_map)) => {
            deep_merge_maps(base_map, overlay_map);
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Merge an overlay map into a base map key by key.
pub fn deep_merge_maps(base: &mut ConfigMap, overlay: &ConfigMap) {
    for (key, value) in overlay {
        match base.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge a sequence of maps in order, later maps taking precedence.
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a ConfigMap>) -> ConfigMap {
    let mut merged = ConfigMap::new();
    for layer in layers {
        deep_merge_maps(&mut merged, layer);
    }
    merged
}
