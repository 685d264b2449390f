use super::{ConfigHandler, first_file};
use crate::artifact::{ArtifactBody, FilterRegistration, Registration};
use crate::loader::schema::{optional_map, readable_file, require_class};
use crate::loader::{deep_merge, parse_yaml, replace_constants_map, replace_path};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use log::{debug, info, warn};

/// Filter type that marks a filter as security-only.
const SECURITY_TYPE: &str = "security";
/// Filter types the chain must contain.
const REQUIRED_TYPES: &[&str] = &["rendering", "execution"];

/// Compiles `config/filters.yml` into the filter chain.
///
/// Unlike other categories, each later file defines the chain order; values
/// are deep merged with the previous file and filters may not disappear.
#[derive(Debug, Default, Clone)]
pub struct FilterConfigHandler;

impl FilterConfigHandler {
    /// Merge filter files in order, enforcing that filters are never removed.
    pub fn merge_files(files: &ConfigFileSet) -> Result<ConfigMap, ConfigError> {
        let mut paths = files.iter();
        let Some(first) = paths.next() else {
            return Ok(ConfigMap::new());
        };
        let mut config = parse_yaml(first)?;
        let mut previous_file = first;
        for file in paths {
            let previous = config;
            config = ConfigMap::new();
            for (name, value) in parse_yaml(file)? {
                let value = match value {
                    ConfigValue::Null => ConfigValue::Map(ConfigMap::new()),
                    other => other,
                };
                let merged = match previous.get(&name) {
                    Some(existing) => {
                        let mut merged = existing.clone();
                        deep_merge(&mut merged, &value);
                        merged
                    }
                    None => value,
                };
                config.insert(name, merged);
            }
            if let Some(removed) = previous.keys().find(|name| !config.contains_key(*name)) {
                return Err(ConfigError::parse(
                    file,
                    format!(
                        "does not define the filter \"{removed}\" defined in \"{}\"; to disable a filter, add an \"enabled\" key with a false value",
                        previous_file.display()
                    ),
                ));
            }
            previous_file = file;
        }
        Ok(config)
    }
}

impl ConfigHandler for FilterConfigHandler {
    fn name(&self) -> &str {
        "FilterConfigHandler"
    }

    fn category(&self) -> &str {
        "filters"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let file = first_file(files);
        let config = replace_constants_map(&Self::merge_files(files)?, settings);

        let mut registrations = Vec::new();
        let mut seen_types: Vec<String> = Vec::new();
        for (name, entry) in &config {
            let mut entry = entry.as_map().cloned().unwrap_or_default();
            if entry.get("enabled").is_some_and(|enabled| !enabled.is_truthy()) {
                warn!("skipping disabled filter (name={name})");
                continue;
            }
            if let Some(ConfigValue::String(path)) = entry.get("file") {
                let resolved = replace_path(path, settings);
                entry.insert("file".to_string(), ConfigValue::String(resolved));
            }
            let class = require_class(&entry, &file, name)?;
            let include = readable_file(&entry, &file, &class)?;
            let mut params = optional_map(entry.get("param"), &file, &format!("{name}.param"))?;
            let condition = params.shift_remove("condition");
            let filter_type = params
                .shift_remove("type")
                .filter(|value| !value.is_null())
                .map(|value| value.to_plain_string());
            if condition.is_some_and(|condition| !condition.is_truthy()) {
                debug!("skipping filter with false condition (name={name})");
                continue;
            }
            if let Some(filter_type) = &filter_type {
                seen_types.push(filter_type.clone());
            }
            debug!("registering filter (name={name}, class={class}, type={filter_type:?})");
            registrations.push(Registration::Filter(FilterRegistration {
                name: name.clone(),
                class,
                file: include,
                params,
                secure: filter_type.as_deref() == Some(SECURITY_TYPE),
                filter_type,
            }));
        }

        for required in REQUIRED_TYPES {
            if !seen_types.iter().any(|seen| seen == required) {
                return Err(ConfigError::parse(
                    &file,
                    format!("must register a filter of type \"{required}\""),
                ));
            }
        }
        info!("compiled filter chain (filters={})", registrations.len());
        Ok(ArtifactBody::Registrations { registrations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const CORE: &str = "rendering:\n  class: RenderingFilter\n  param:\n    type: rendering\nsecurity:\n  class: SecurityFilter\n  param:\n    type: security\ncache:\n  class: CacheFilter\n  param:\n    condition: '%SF_CACHE%'\nexecution:\n  class: ExecutionFilter\n  param:\n    type: execution\n";

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write");
        path
    }

    fn filters(body: ArtifactBody) -> Vec<FilterRegistration> {
        let ArtifactBody::Registrations { registrations } = body else {
            panic!("expected registrations");
        };
        registrations
            .into_iter()
            .map(|registration| match registration {
                Registration::Filter(filter) => filter,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn later_file_defines_order_and_merges_values() {
        let temp = TempDir::new().expect("tmp");
        let core = write(temp.path(), "core.yml", CORE);
        let app = write(
            temp.path(),
            "app.yml",
            "rendering: ~\nsecurity: ~\nremember:\n  class: RememberFilter\ncache: ~\nexecution:\n  param:\n    timer: true\n",
        );
        let mut settings = Settings::new(temp.path(), "prod");
        settings.set("sf_cache", false);

        let body = FilterConfigHandler
            .execute(&ConfigFileSet::new(vec![core, app]), &settings)
            .expect("compile");
        let filters = filters(body);
        assert_eq!(
            filters.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["rendering", "security", "remember", "execution"]
        );
        assert!(filters[1].secure);
        assert!(!filters[0].secure);
        let execution = &filters[3];
        assert_eq!(execution.class, "ExecutionFilter");
        assert_eq!(execution.params["timer"], ConfigValue::Bool(true));
        assert!(!execution.params.contains_key("type"));
    }

    #[test]
    fn removed_filter_is_parse_error() {
        let temp = TempDir::new().expect("tmp");
        let core = write(temp.path(), "core.yml", CORE);
        let app = write(temp.path(), "app.yml", "rendering: ~\nexecution: ~\nsecurity: ~\n");
        let err = FilterConfigHandler::merge_files(&ConfigFileSet::new(vec![core, app]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let message = err.to_string();
        assert!(message.contains("\"cache\""));
        assert!(message.contains("core.yml"));
        assert!(message.contains("app.yml"));
    }

    #[test]
    fn requires_rendering_and_execution_filters() {
        let temp = TempDir::new().expect("tmp");
        let path = write(
            temp.path(),
            "filters.yml",
            "rendering:\n  class: RenderingFilter\n  param:\n    type: rendering\nexecution:\n  class: ExecutionFilter\n  enabled: false\n  param:\n    type: execution\n",
        );
        let err = FilterConfigHandler
            .execute(&ConfigFileSet::new(vec![path]), &Settings::new(temp.path(), "prod"))
            .unwrap_err();
        assert!(err.to_string().contains("type \"execution\""));
    }
}
