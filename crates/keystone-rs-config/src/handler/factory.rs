//! Factory wiring compiler.
//!
//! Roles are data: each [`RoleSpec`] names a factory role and the extra
//! rules applied to its parameters. The default table covers the core roles
//! and can be replaced or extended.

use super::{ConfigHandler, first_file};
use crate::artifact::{ArtifactBody, ComponentSpec, FactoryRegistration, Registration};
use crate::loader::schema::{optional_map, readable_file, require_class};
use crate::loader::{flatten_with_environment, parse_yamls, replace_constants_map, replace_path};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use log::{debug, info, warn};
use std::path::Path;

/// Extra processing applied to one factory role.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleRule {
    /// Copy a setting into the role parameters.
    InjectSetting { param: String, setting: String },
    /// Move `param.cache` (`class`, `param`) into a separate component.
    ExtractCache,
    /// Move `session_name` and `database` out of the parameters and read the
    /// session lifetime from `<timeout_role>.param.timeout`.
    ExtractSession { timeout_role: String },
    /// Move enabled child components out of `param.<key>`.
    ExtractComponents { key: String, label: String },
    /// Attach another role's class and parameters.
    Companion { role: String },
    /// The role loads a compiled config path at runtime.
    ConfigFile { path: String },
}

/// A factory role and its rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSpec {
    pub name: String,
    pub rules: Vec<RoleRule>,
}

impl RoleSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: RoleRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// The core roles, in compilation order.
pub fn default_roles() -> Vec<RoleSpec> {
    vec![
        RoleSpec::new("view_cache_manager"),
        RoleSpec::new("logger").with_rule(RoleRule::ExtractComponents {
            key: "loggers".to_string(),
            label: "logger".to_string(),
        }),
        RoleSpec::new("i18n").with_rule(RoleRule::ExtractCache),
        RoleSpec::new("controller"),
        RoleSpec::new("request").with_rule(RoleRule::InjectSetting {
            param: "no_script_name".to_string(),
            setting: "sf_no_script_name".to_string(),
        }),
        RoleSpec::new("response"),
        RoleSpec::new("routing").with_rule(RoleRule::ExtractCache),
        RoleSpec::new("storage").with_rule(RoleRule::ExtractSession {
            timeout_role: "user".to_string(),
        }),
        RoleSpec::new("user"),
        RoleSpec::new("view_cache").with_rule(RoleRule::Companion {
            role: "view_cache_manager".to_string(),
        }),
        RoleSpec::new("mailer"),
        RoleSpec::new("service_container").with_rule(RoleRule::ConfigFile {
            path: "config/services.yml".to_string(),
        }),
    ]
}

/// Compiles `config/factories.yml` into factory registrations.
#[derive(Debug, Clone)]
pub struct FactoryConfigHandler {
    roles: Vec<RoleSpec>,
}

impl Default for FactoryConfigHandler {
    fn default() -> Self {
        Self {
            roles: default_roles(),
        }
    }
}

impl FactoryConfigHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the role table.
    pub fn with_roles(mut self, roles: Vec<RoleSpec>) -> Self {
        self.roles = roles;
        self
    }

    /// Append a role to the table.
    pub fn with_role(mut self, role: RoleSpec) -> Self {
        self.roles.push(role);
        self
    }

    pub fn roles(&self) -> &[RoleSpec] {
        &self.roles
    }
}

impl ConfigHandler for FactoryConfigHandler {
    fn name(&self) -> &str {
        "FactoryConfigHandler"
    }

    fn category(&self) -> &str {
        "factories"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let file = first_file(files);
        let merged = flatten_with_environment(&parse_yamls(files.iter())?, settings.environment());
        let mut config = replace_constants_map(&merged, settings);
        for entry in config.values_mut() {
            if let Some(map) = entry.as_map_mut() {
                if let Some(ConfigValue::String(path)) = map.get("file") {
                    let resolved = replace_path(path, settings);
                    map.insert("file".to_string(), ConfigValue::String(resolved));
                }
            }
        }

        let mut registrations = Vec::with_capacity(self.roles.len());
        for role in &self.roles {
            let registration = compile_role(role, &config, &file, settings)?;
            debug!(
                "registering factory (role={}, class={})",
                registration.role, registration.class
            );
            registrations.push(Registration::Factory(registration));
        }
        info!(
            "compiled factory config (roles={}, env={})",
            registrations.len(),
            settings.environment()
        );
        Ok(ArtifactBody::Registrations { registrations })
    }
}

fn role_entry(config: &ConfigMap, role: &str) -> ConfigMap {
    config
        .get(role)
        .and_then(ConfigValue::as_map)
        .cloned()
        .unwrap_or_default()
}

fn compile_role(
    role: &RoleSpec,
    config: &ConfigMap,
    file: &Path,
    settings: &Settings,
) -> Result<FactoryRegistration, ConfigError> {
    let entry = role_entry(config, &role.name);
    let class = require_class(&entry, file, &role.name)?;
    let mut registration = FactoryRegistration::new(&role.name, &class);
    registration.file = readable_file(&entry, file, &class)?;
    let mut params = param_map(&entry, file, &class)?;

    for rule in &role.rules {
        match rule {
            RoleRule::InjectSetting { param, setting } => {
                let value = settings.get(setting).cloned().unwrap_or_default();
                params.insert(param.clone(), value);
            }
            RoleRule::ExtractCache => {
                if let Some(cache) = params.shift_remove("cache") {
                    registration.cache = Some(component(&role.name, "cache", &cache, file)?);
                }
            }
            RoleRule::ExtractSession { timeout_role } => {
                registration.session_name = params
                    .shift_remove("session_name")
                    .map(|value| value.to_plain_string());
                registration.database = params
                    .shift_remove("database")
                    .map(|value| value.to_plain_string());
                registration.gc_maxlifetime = config
                    .get(timeout_role)
                    .and_then(|entry| entry.pointer(&["param", "timeout"]))
                    .and_then(ConfigValue::as_i64);
            }
            RoleRule::ExtractComponents { key, label } => {
                if let Some(children) = params.shift_remove(key) {
                    registration.components = components(label, &children, file)?;
                }
            }
            RoleRule::Companion { role: companion } => {
                let entry = role_entry(config, companion);
                let companion_class = require_class(&entry, file, companion)?;
                registration.companion = Some(ComponentSpec {
                    name: companion.clone(),
                    class: companion_class.clone(),
                    params: param_map(&entry, file, &companion_class)?,
                });
            }
            RoleRule::ConfigFile { path } => {
                registration.config_path = Some(path.clone());
            }
        }
    }
    registration.params = params;
    Ok(registration)
}

fn param_map(entry: &ConfigMap, file: &Path, class: &str) -> Result<ConfigMap, ConfigError> {
    match entry.get("param") {
        None | Some(ConfigValue::Null) => Ok(ConfigMap::new()),
        Some(ConfigValue::Map(map)) => Ok(map.clone()),
        Some(_) => Err(ConfigError::parse(
            file,
            format!("specifies a \"param\" key for the \"{class}\" factory which must be a mapping"),
        )),
    }
}

fn component(
    role: &str,
    name: &str,
    value: &ConfigValue,
    file: &Path,
) -> Result<ComponentSpec, ConfigError> {
    let entry = value.as_map().cloned().unwrap_or_default();
    let class = require_class(&entry, file, &format!("{role}.{name}"))?;
    let params = optional_map(entry.get("param"), file, &format!("{role}.{name}.param"))?;
    Ok(ComponentSpec {
        name: name.to_string(),
        class,
        params,
    })
}

fn components(
    label: &str,
    children: &ConfigValue,
    file: &Path,
) -> Result<Vec<ComponentSpec>, ConfigError> {
    let Some(children) = children.as_map() else {
        return Ok(Vec::new());
    };
    let mut specs = Vec::new();
    for (name, child) in children {
        let mut entry = child.as_map().cloned().unwrap_or_default();
        if entry.get("enabled").is_some_and(|enabled| !enabled.is_truthy()) {
            warn!("skipping disabled {label} (name={name})");
            continue;
        }
        let Some(class) = entry.get("class").and_then(ConfigValue::as_str).map(str::to_string)
        else {
            return Err(ConfigError::parse(
                file,
                format!("specifies {label} \"{name}\" with missing class key"),
            ));
        };
        let mut params = optional_map(entry.shift_remove("param").as_ref(), file, name)?;
        let condition = params.shift_remove("condition");
        if condition.is_some_and(|condition| !condition.is_truthy()) {
            debug!("skipping {label} with false condition (name={name})");
            continue;
        }
        specs.push(ComponentSpec {
            name: name.clone(),
            class,
            params,
        });
    }
    Ok(specs)
}
