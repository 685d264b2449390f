use crate::builder::ContainerBuilder;
use crate::dumper::{ContainerDumper, DumpOptions, camelize};
use crate::error::ContainerError;
use crate::loader::ServicesLoader;
use keystone_rs_config::{
    ArtifactBody, ConfigError, ConfigFileSet, ConfigHandler, Settings, flatten_with_environment,
    parse_yamls, replace_constants_map,
};
use log::info;
use std::path::Path;

/// Compiles `config/services.yml` into a container class.
///
/// Sources are merged per environment and settings constants are replaced
/// before the services are loaded and dumped.
#[derive(Debug, Clone, Default)]
pub struct ServiceContainerConfigHandler {
    base_class: Option<String>,
}

impl ServiceContainerConfigHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_class(mut self, base_class: &str) -> Self {
        self.base_class = Some(base_class.to_string());
        self
    }

    /// `FrontendDevServiceContainer` for app `frontend` in env `dev`,
    /// `ProjectServiceContainer` without an application.
    pub fn class_name(settings: &Settings) -> String {
        match settings.app() {
            Some(app) => format!(
                "{}{}ServiceContainer",
                camelize(app),
                camelize(settings.environment())
            ),
            None => DumpOptions::default().class,
        }
    }

    /// Merged builder for the given sources.
    pub fn load(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ContainerBuilder, ContainerError> {
        let merged = flatten_with_environment(&parse_yamls(files.iter())?, settings.environment());
        let config = replace_constants_map(&merged, settings);
        let mut builder = ContainerBuilder::new();
        let file = files.first().unwrap_or(Path::new("services.yml"));
        ServicesLoader::new(&mut builder).load_map(&config, file)?;
        Ok(builder)
    }
}

impl ConfigHandler for ServiceContainerConfigHandler {
    fn name(&self) -> &str {
        "ServiceContainerConfigHandler"
    }

    fn category(&self) -> &str {
        "services"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let file = files.first().unwrap_or(Path::new("services.yml")).to_path_buf();
        let builder = self.load(files, settings).map_err(|err| match err {
            ContainerError::Config(err) => err,
            other => ConfigError::parse(&file, other.to_string()),
        })?;

        let mut options = DumpOptions::default().with_class(&Self::class_name(settings));
        if let Some(base_class) = &self.base_class {
            options = options.with_base_class(base_class);
        }
        let code = ContainerDumper::new(&builder)
            .dump(&options)
            .map_err(|err| ConfigError::parse(&file, err.to_string()))?;

        info!(
            "compiled service container (class={}, services={}, env={})",
            options.class,
            builder.definitions().len(),
            settings.environment()
        );
        Ok(ArtifactBody::Source {
            language: "php".to_string(),
            class: options.class,
            code,
        })
    }
}
