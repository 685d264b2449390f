//! Project layout and handler wiring.

use keystone_rs_autoload::{ArtifactSource, AutoloadResolver, ClassLoader};
use keystone_rs_config::{
    AutoloadConfigHandler, CacheConfigHandler, ConfigCache, ConfigError, ConfigHandler,
    ConfigLocator, ConfigMap, ConfigRootKind, ConfigValue, DatabaseConfigHandler,
    FactoryConfigHandler, FilterConfigHandler, RegistrationContext, Settings, ViewConfigHandler,
};
use keystone_rs_container::{ContainerBuilder, ContainerError, ServiceContainerConfigHandler};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config path of the service definitions.
pub const SERVICES_CONFIG: &str = "config/services.yml";

/// A project root plus the application and environment being served.
///
/// Configuration roots are searched in precedence order: framework defaults,
/// plugins, the project, then `apps/<app>`.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    environment: String,
    app: Option<String>,
    framework_dir: Option<PathBuf>,
    plugins: Vec<PathBuf>,
    cache_dir: Option<PathBuf>,
    settings: ConfigMap,
    force_reload: bool,
    container_base_class: Option<String>,
}

impl Project {
    pub fn new(root: impl AsRef<Path>, environment: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            environment: environment.to_string(),
            app: None,
            framework_dir: None,
            plugins: Vec::new(),
            cache_dir: None,
            settings: ConfigMap::new(),
            force_reload: false,
            container_base_class: None,
        }
    }

    pub fn with_app(mut self, app: &str) -> Self {
        self.app = Some(app.to_string());
        self
    }

    /// Directory holding the framework's default `config/` files.
    pub fn with_framework_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.framework_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_plugin(mut self, dir: impl AsRef<Path>) -> Self {
        self.plugins.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Extra setting available to `%NAME%` constants.
    pub fn with_setting(mut self, name: &str, value: impl Into<ConfigValue>) -> Self {
        self.settings.insert(name.to_string(), value.into());
        self
    }

    pub fn with_force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }

    pub fn with_container_base_class(mut self, base_class: &str) -> Self {
        self.container_base_class = Some(base_class.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn app(&self) -> Option<&str> {
        self.app.as_deref()
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new(&self.root, &self.environment);
        if let Some(app) = &self.app {
            settings = settings.with_app(app);
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings = settings.with_cache_dir(cache_dir);
        }
        settings.add(&self.settings);
        settings
    }

    pub fn locator(&self) -> ConfigLocator {
        let mut locator = ConfigLocator::new();
        if let Some(dir) = &self.framework_dir {
            locator = locator.with_root(ConfigRootKind::Framework, dir);
        }
        for plugin in &self.plugins {
            locator = locator.with_root(ConfigRootKind::Plugin, plugin);
        }
        locator = locator.with_root(ConfigRootKind::Project, &self.root);
        if let Some(app) = &self.app {
            locator = locator.with_root(ConfigRootKind::Application, self.root.join("apps").join(app));
        }
        locator
    }

    /// Every config path pattern and the handler compiling it.
    pub fn handlers(&self) -> Vec<(&'static str, Arc<dyn ConfigHandler>)> {
        let mut services = ServiceContainerConfigHandler::new();
        if let Some(base_class) = &self.container_base_class {
            services = services.with_base_class(base_class);
        }
        let autoload = AutoloadConfigHandler::new().with_plugin_roots(self.plugins.clone());
        let handlers: [(&'static str, Arc<dyn ConfigHandler>); 7] = [
            ("config/autoload.yml", Arc::new(autoload)),
            ("modules/*/config/cache.yml", Arc::new(CacheConfigHandler)),
            ("config/databases.yml", Arc::new(DatabaseConfigHandler)),
            ("config/factories.yml", Arc::new(FactoryConfigHandler::new())),
            ("config/filters.yml", Arc::new(FilterConfigHandler)),
            ("modules/*/config/view.yml", Arc::new(ViewConfigHandler)),
            (SERVICES_CONFIG, Arc::new(services)),
        ];
        handlers.into()
    }

    /// Config cache with every handler registered.
    pub fn config_cache(&self) -> Result<ConfigCache, ConfigError> {
        let mut cache = ConfigCache::new(self.settings(), self.locator())
            .with_force_reload(self.force_reload);
        for (pattern, handler) in self.handlers() {
            cache.register_handler(pattern, handler)?;
        }
        Ok(cache)
    }

    /// Compile `config_path` and replay its registrations against `ctx`.
    ///
    /// Returns `false` when the config is optional and absent.
    pub fn replay(
        &self,
        config_path: &str,
        optional: bool,
        ctx: &mut dyn RegistrationContext,
    ) -> Result<bool, ConfigError> {
        let Some(artifact) = self.config_cache()?.import(config_path, optional)? else {
            return Ok(false);
        };
        artifact.replay(ctx)?;
        Ok(true)
    }

    /// Service definitions merged from every `config/services.yml`.
    pub fn container_builder(&self) -> Result<ContainerBuilder, ContainerError> {
        let files = self.locator().files_for(SERVICES_CONFIG);
        if files.is_empty() {
            return Err(ConfigError::NotFound {
                path: PathBuf::from(SERVICES_CONFIG),
            }
            .into());
        }
        debug!("loading service definitions (files={})", files.len());
        ServiceContainerConfigHandler::new().load(&files, &self.settings())
    }

    /// Autoload resolver reading each application's compiled table.
    pub fn autoload_resolver(&self, loader: Box<dyn ClassLoader>) -> AutoloadResolver {
        let project = self.clone();
        let source = ArtifactSource::per_application(move |app| {
            let mut project = project.clone();
            project.app = app.map(str::to_string);
            project.config_cache()
        });
        AutoloadResolver::new(Box::new(source), loader, self.settings().cache_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roots_follow_precedence_order() {
        let project = Project::new("/srv/site", "dev")
            .with_app("frontend")
            .with_framework_dir("/usr/share/keystone")
            .with_plugin("/srv/site/plugins/blog");
        let roots: Vec<_> = project
            .locator()
            .roots()
            .iter()
            .map(|root| (root.kind, root.path.clone()))
            .collect();
        assert_eq!(
            roots,
            vec![
                (ConfigRootKind::Framework, PathBuf::from("/usr/share/keystone")),
                (ConfigRootKind::Plugin, PathBuf::from("/srv/site/plugins/blog")),
                (ConfigRootKind::Project, PathBuf::from("/srv/site")),
                (ConfigRootKind::Application, PathBuf::from("/srv/site/apps/frontend")),
            ]
        );
    }

    #[test]
    fn settings_carry_application_and_extras() {
        let settings = Project::new("/srv/site", "test")
            .with_app("backend")
            .with_cache_dir("/tmp/cache")
            .with_setting("SF_WEB_DEBUG", true)
            .settings();
        assert_eq!(settings.app(), Some("backend"));
        assert_eq!(settings.environment(), "test");
        assert_eq!(settings.cache_dir(), PathBuf::from("/tmp/cache"));
        assert_eq!(settings.get("sf_web_debug"), Some(&ConfigValue::Bool(true)));
    }

    #[test]
    fn every_category_has_a_handler() {
        let project = Project::new("/srv/site", "dev");
        let cache = project.config_cache().expect("cache");
        assert_eq!(
            cache.handler_patterns(),
            vec![
                "config/autoload.yml",
                "modules/*/config/cache.yml",
                "config/databases.yml",
                "config/factories.yml",
                "config/filters.yml",
                "modules/*/config/view.yml",
                "config/services.yml",
            ]
        );
    }
}
