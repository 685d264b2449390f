use super::ConfigHandler;
use crate::artifact::{ArtifactBody, CachePolicy, Registration};
use crate::loader::schema::to_list;
use crate::loader::{ALL_LAYER, flatten_configuration, get_config_value, parse_yamls};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use log::{debug, info};

/// Action name of the fallback policy emitted last.
pub const DEFAULT_ACTION: &str = "DEFAULT";

/// Compiles `modules/*/config/cache.yml` into per-action cache policies.
#[derive(Debug, Default, Clone)]
pub struct CacheConfigHandler;

impl ConfigHandler for CacheConfigHandler {
    fn name(&self) -> &str {
        "CacheConfigHandler"
    }

    fn category(&self) -> &str {
        "cache"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        _settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let config = flatten_configuration(parse_yamls(files.iter())?);
        let mut registrations: Vec<Registration> = config
            .keys()
            .filter(|action| action.as_str() != ALL_LAYER)
            .map(|action| Registration::Cache(policy(&config, action)))
            .collect();
        registrations.push(Registration::Cache(policy(&config, DEFAULT_ACTION)));
        info!("compiled cache config (policies={})", registrations.len());
        Ok(ArtifactBody::Registrations { registrations })
    }
}

fn policy(config: &ConfigMap, action: &str) -> CachePolicy {
    let value = |key: &str, default: Option<ConfigValue>| get_config_value(config, key, action, default);
    let flag = |key: &str| value(key, None).is_some_and(|value| value.is_truthy());

    let enabled = flag("enabled");
    let lifetime = if enabled {
        value("lifetime", None).and_then(|v| v.as_i64()).unwrap_or(0)
    } else {
        0
    };
    let client_lifetime = if enabled {
        value("client_lifetime", None)
            .and_then(|v| v.as_i64())
            .unwrap_or(lifetime)
    } else {
        0
    };
    let vary = to_list(value("vary", None).as_ref())
        .iter()
        .map(ConfigValue::to_plain_string)
        .collect();
    debug!("resolved cache policy (action={action}, enabled={enabled}, lifetime={lifetime})");
    CachePolicy {
        action: action.to_string(),
        with_layout: flag("with_layout"),
        lifetime,
        client_lifetime,
        contextual: flag("contextual"),
        vary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn compile(yaml: &str) -> Vec<CachePolicy> {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("cache.yml");
        fs::write(&path, yaml).expect("write");
        let body = CacheConfigHandler
            .execute(
                &ConfigFileSet::new(vec![path]),
                &Settings::new(temp.path(), "prod"),
            )
            .expect("compile");
        let ArtifactBody::Registrations { registrations } = body else {
            panic!("expected registrations");
        };
        registrations
            .into_iter()
            .map(|registration| match registration {
                Registration::Cache(policy) => policy,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn actions_fall_back_to_all_then_default() {
        let policies = compile(
            "default:\n  enabled: false\n  with_layout: false\n  lifetime: 86400\nall:\n  contextual: true\nindex:\n  enabled: true\n  vary: cookie\nlist:\n  enabled: on\n  client_lifetime: 60\n",
        );
        assert_eq!(
            policies.iter().map(|p| p.action.as_str()).collect::<Vec<_>>(),
            vec!["index", "list", "DEFAULT"]
        );
        assert_eq!(
            policies[0],
            CachePolicy {
                action: "index".to_string(),
                with_layout: false,
                lifetime: 86400,
                client_lifetime: 86400,
                contextual: true,
                vary: vec!["cookie".to_string()],
            }
        );
        assert_eq!(policies[1].client_lifetime, 60);
        assert_eq!(policies[2].lifetime, 0);
        assert_eq!(policies[2].client_lifetime, 0);
    }

    #[test]
    fn empty_config_still_emits_default() {
        let policies = compile("");
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].action, DEFAULT_ACTION);
        assert!(policies[0].vary.is_empty());
    }
}
