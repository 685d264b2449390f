use super::ConfigHandler;
use crate::artifact::{AssetKind, AssetRegistration, ArtifactBody, Registration, ViewRegistration};
use crate::loader::{
    ALL_LAYER, DEFAULT_LAYER, deep_merge_maps, get_config_value, merge_config_value, parse_yamls,
    replace_constants_map,
};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use indexmap::IndexMap;
use log::{debug, info};

/// View name used for the module-wide registration.
pub const DEFAULT_VIEW: &str = "DEFAULT";

const ASSET_KEYS: &[(&str, AssetKind)] = &[
    ("stylesheets", AssetKind::Stylesheet),
    ("javascripts", AssetKind::Javascript),
];

/// Compiles `modules/*/config/view.yml` into per-view response setup.
#[derive(Debug, Default, Clone)]
pub struct ViewConfigHandler;

impl ViewConfigHandler {
    /// Fold `default` into `all`; asset lists are concatenated, the rest deep merged.
    pub fn merge_config(mut config: ConfigMap) -> ConfigMap {
        let mut default = config
            .shift_remove(DEFAULT_LAYER)
            .and_then(|value| value.as_map().cloned())
            .unwrap_or_default();
        let mut all = config
            .get(ALL_LAYER)
            .and_then(ConfigValue::as_map)
            .cloned()
            .unwrap_or_default();
        for (key, _) in ASSET_KEYS {
            let mut assets = list(default.shift_remove(*key));
            assets.extend(list(all.shift_remove(*key)));
            all.insert((*key).to_string(), ConfigValue::List(assets));
        }
        deep_merge_maps(&mut default, &all);
        config.insert(ALL_LAYER.to_string(), ConfigValue::Map(default));
        config
    }

    /// Assets for `view`: application-wide entries first, then the view's own.
    ///
    /// `-name` removes a previously added asset and `-*` removes all of them.
    pub fn assets(config: &ConfigMap, view: &str) -> Vec<AssetRegistration> {
        let mut assets = Vec::new();
        for (key, kind) in ASSET_KEYS {
            let entries = merge_config_value(config, key, view);
            let mut resolved: IndexMap<String, AssetRegistration> = IndexMap::new();
            for entry in entries.as_list().unwrap_or_default() {
                let (name, mut options) = match entry {
                    ConfigValue::Map(map) => match map.first() {
                        Some((name, options)) => {
                            (name.clone(), options.as_map().cloned().unwrap_or_default())
                        }
                        None => continue,
                    },
                    other => (other.to_plain_string(), ConfigMap::new()),
                };
                if name == "-*" {
                    resolved.clear();
                } else if let Some(removed) = name.strip_prefix('-') {
                    resolved.shift_remove(removed);
                } else {
                    let position = options
                        .shift_remove("position")
                        .map(|value| value.to_plain_string())
                        .unwrap_or_default();
                    resolved.insert(
                        name.clone(),
                        AssetRegistration {
                            kind: *kind,
                            name,
                            position,
                            options,
                        },
                    );
                }
            }
            assets.extend(resolved.into_values());
        }
        assets
    }

    fn view(config: &ConfigMap, view: &str) -> ViewRegistration {
        let category = if view == DEFAULT_VIEW { "" } else { view };
        let map_value = |key: &str| match merge_config_value(config, key, category) {
            ConfigValue::Map(map) => map,
            _ => ConfigMap::new(),
        };
        let has_layout = get_config_value(config, "has_layout", category, None)
            .is_none_or(|value| value.is_truthy());
        let layout = get_config_value(config, "layout", category, None)
            .map(|value| value.to_plain_string());
        ViewRegistration {
            view: view.to_string(),
            has_layout,
            layout,
            assets: Self::assets(config, category),
            metas: map_value("metas"),
            http_metas: map_value("http_metas"),
        }
    }
}

impl ConfigHandler for ViewConfigHandler {
    fn name(&self) -> &str {
        "ViewConfigHandler"
    }

    fn category(&self) -> &str {
        "view"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let merged = Self::merge_config(parse_yamls(files.iter())?);
        let config = replace_constants_map(&merged, settings);
        let mut registrations: Vec<Registration> = config
            .keys()
            .filter(|view| view.as_str() != ALL_LAYER)
            .map(|view| {
                debug!("compiling view (view={view})");
                Registration::View(Self::view(&config, view))
            })
            .collect();
        registrations.push(Registration::View(Self::view(&config, DEFAULT_VIEW)));
        info!("compiled view config (views={})", registrations.len());
        Ok(ArtifactBody::Registrations { registrations })
    }
}

fn list(value: Option<ConfigValue>) -> Vec<ConfigValue> {
    match value {
        Some(ConfigValue::List(items)) => items,
        _ => Vec::new(),
    }
}
