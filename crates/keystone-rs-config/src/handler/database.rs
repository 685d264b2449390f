use super::{ConfigHandler, first_file};
use crate::artifact::{ArtifactBody, DatabaseRegistration, Registration};
use crate::loader::schema::{expect_map, optional_map, readable_file, require_class};
use crate::loader::{flatten_with_environment, parse_yamls, replace_constants_map, replace_path};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::ConfigValue;
use crate::ConfigError;
use log::{debug, info};

/// Compiles `config/databases.yml` into database connection registrations.
#[derive(Debug, Default, Clone)]
pub struct DatabaseConfigHandler;

impl ConfigHandler for DatabaseConfigHandler {
    fn name(&self) -> &str {
        "DatabaseConfigHandler"
    }

    fn category(&self) -> &str {
        "databases"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let file = first_file(files);
        let merged = flatten_with_environment(&parse_yamls(files.iter())?, settings.environment());
        let config = replace_constants_map(&merged, settings);

        let mut registrations = Vec::new();
        for (name, entry) in &config {
            let mut entry = expect_map(entry, &file, name)?.clone();
            if let Some(ConfigValue::String(path)) = entry.get("file") {
                let resolved = replace_path(path, settings);
                entry.insert("file".to_string(), ConfigValue::String(resolved));
            }
            let class = require_class(&entry, &file, name)?;
            let include = readable_file(&entry, &file, &class)?;
            let mut params = optional_map(entry.get("param"), &file, &format!("{name}.param"))?;
            params.insert("name".to_string(), ConfigValue::from(name.as_str()));
            debug!("registering database (name={name}, class={class})");
            registrations.push(Registration::Database(DatabaseRegistration {
                name: name.clone(),
                class,
                file: include,
                params,
            }));
        }
        info!(
            "compiled database config (connections={}, env={})",
            registrations.len(),
            settings.environment()
        );
        Ok(ArtifactBody::Registrations { registrations })
    }
}
