//! Compiled artifact cache.
//!
//! Handlers are registered against config path patterns. `check_config`
//! locates the sources for a config path, recompiles when any source is newer
//! than the cached artifact and publishes the result with an atomic rename.

use crate::artifact::Artifact;
use crate::handler::ConfigHandler;
use crate::locator::{ConfigFileSet, ConfigLocator};
use crate::settings::Settings;
use crate::ConfigError;
use globset::{Glob, GlobBuilder, GlobMatcher};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// A handler bound to the config paths it compiles.
struct HandlerBinding {
    pattern: String,
    matcher: GlobMatcher,
    /// Matches absolute paths ending with the pattern.
    suffix_matcher: GlobMatcher,
    handler: Arc<dyn ConfigHandler>,
}

/// Staleness-checked cache of compiled configuration artifacts.
pub struct ConfigCache {
    settings: Settings,
    locator: ConfigLocator,
    handlers: Vec<HandlerBinding>,
    force_reload: bool,
}

impl ConfigCache {
    pub fn new(settings: Settings, locator: ConfigLocator) -> Self {
        Self {
            settings,
            locator,
            handlers: Vec::new(),
            force_reload: false,
        }
    }

    /// Recompile on every check regardless of mtimes.
    pub fn with_force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }

    pub fn set_force_reload(&mut self, force_reload: bool) {
        self.force_reload = force_reload;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn locator(&self) -> &ConfigLocator {
        &self.locator
    }

    /// Bind a handler to a config path pattern such as `modules/*/config/cache.yml`.
    pub fn register_handler(
        &mut self,
        pattern: &str,
        handler: Arc<dyn ConfigHandler>,
    ) -> Result<(), ConfigError> {
        let compile = |pattern: &str| -> Result<GlobMatcher, ConfigError> {
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map(|glob: Glob| glob.compile_matcher())
                .map_err(|err| ConfigError::Invalid {
                    path: pattern.to_string(),
                    message: err.to_string(),
                })
        };
        debug!(
            "registering config handler (pattern={pattern}, handler={})",
            handler.name()
        );
        self.handlers.push(HandlerBinding {
            pattern: pattern.to_string(),
            matcher: compile(pattern)?,
            suffix_matcher: compile(&format!("**/{pattern}"))?,
            handler,
        });
        Ok(())
    }

    /// Registered handler patterns in registration order.
    pub fn handler_patterns(&self) -> Vec<&str> {
        self.handlers.iter().map(|binding| binding.pattern.as_str()).collect()
    }

    /// Directory holding compiled artifacts for the current app and env.
    pub fn cache_dir(&self) -> PathBuf {
        self.settings
            .cache_dir()
            .join(self.settings.app().unwrap_or("project"))
            .join(self.settings.environment())
            .join("config")
    }

    /// Artifact location for a config path.
    pub fn artifact_path(&self, config_path: &str) -> PathBuf {
        let name: String = config_path
            .trim_start_matches('/')
            .chars()
            .map(|ch| match ch {
                '/' | '\\' | '.' => '_',
                other => other,
            })
            .collect();
        self.cache_dir().join(format!("config_{name}.yml"))
    }

    /// Source files for a config path; absolute paths name a single file.
    pub fn config_files(&self, config_path: &str) -> ConfigFileSet {
        let path = Path::new(config_path);
        if path.is_absolute() {
            let files = if path.is_file() {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            };
            return ConfigFileSet::new(files);
        }
        self.locator.files_for(config_path)
    }

    /// Ensure the artifact for `config_path` is fresh and return its location.
    ///
    /// Returns `None` when the config does not exist and `optional` is set.
    pub fn check_config(
        &self,
        config_path: &str,
        optional: bool,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let files = self.config_files(config_path);
        if files.is_empty() {
            if optional {
                debug!("optional config missing (path={config_path})");
                return Ok(None);
            }
            return Err(ConfigError::NotFound {
                path: PathBuf::from(config_path),
            });
        }

        let artifact_path = self.artifact_path(config_path);
        if self.force_reload || self.is_stale(&files, &artifact_path)? {
            self.compile(config_path, &files, &artifact_path)?;
        } else {
            debug!(
                "config artifact is fresh (path={config_path}, artifact={})",
                artifact_path.display()
            );
        }
        Ok(Some(artifact_path))
    }

    /// Check and load the artifact for `config_path`.
    pub fn import(&self, config_path: &str, optional: bool) -> Result<Option<Artifact>, ConfigError> {
        match self.check_config(config_path, optional)? {
            Some(path) => Artifact::read(path).map(Some),
            None => Ok(None),
        }
    }

    /// Remove every compiled artifact for the current app and env.
    pub fn clear(&self) -> Result<usize, ConfigError> {
        let dir = self.cache_dir();
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(
            "cleared config cache (dir={}, removed={removed})",
            dir.display()
        );
        Ok(removed)
    }

    fn handler_for(&self, config_path: &str) -> Option<&HandlerBinding> {
        let path = Path::new(config_path);
        self.handlers.iter().find(|binding| {
            if path.is_absolute() {
                binding.suffix_matcher.is_match(path)
            } else {
                binding.matcher.is_match(path)
            }
        })
    }

    fn is_stale(&self, files: &ConfigFileSet, artifact_path: &Path) -> Result<bool, ConfigError> {
        let Ok(artifact_mtime) = fs::metadata(artifact_path).and_then(|meta| meta.modified())
        else {
            return Ok(true);
        };
        let mut newest = SystemTime::UNIX_EPOCH;
        for file in files.iter() {
            let modified = fs::metadata(file)?.modified()?;
            if modified > newest {
                newest = modified;
            }
        }
        Ok(newest > artifact_mtime)
    }

    fn compile(
        &self,
        config_path: &str,
        files: &ConfigFileSet,
        artifact_path: &Path,
    ) -> Result<(), ConfigError> {
        let Some(binding) = self.handler_for(config_path) else {
            return Err(ConfigError::parse(
                config_path,
                "does not have a registered handler",
            ));
        };
        info!(
            "compiling config (path={config_path}, handler={}, sources={})",
            binding.handler.name(),
            files.len()
        );
        let body = binding.handler.execute(files, &self.settings)?;
        let artifact = Artifact::new(
            config_path,
            binding.handler.name(),
            files.files().to_vec(),
            body,
        );
        write_atomic(artifact_path, &artifact.to_yaml_string()?)
    }
}

/// Write through a temp file in the target directory, then rename into place.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let dir = path.parent().ok_or_else(|| ConfigError::Artifact {
        path: path.to_path_buf(),
        message: "artifact path has no parent directory".to_string(),
    })?;
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|err| ConfigError::Io(err.error))?;
    debug!("published artifact (path={})", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::DatabaseConfigHandler;
    use crate::locator::ConfigRootKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cache(root: &Path) -> ConfigCache {
        let settings = Settings::new(root, "prod").with_app("frontend");
        let locator = ConfigLocator::new().with_root(ConfigRootKind::Project, root);
        let mut cache = ConfigCache::new(settings, locator);
        cache
            .register_handler("config/databases.yml", Arc::new(DatabaseConfigHandler))
            .expect("register");
        cache
    }

    fn write_databases(root: &Path, class: &str) -> PathBuf {
        let path = root.join("config/databases.yml");
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, format!("all:\n  main:\n    class: {class}\n")).expect("write");
        path
    }

    fn first_class(artifact: &Artifact) -> String {
        match &artifact.registrations()[0] {
            crate::Registration::Database(db) => db.class.clone(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_config_respects_optional_flag() {
        let temp = TempDir::new().expect("tmp");
        let cache = cache(temp.path());
        assert_eq!(cache.check_config("config/databases.yml", true).expect("check"), None);
        let err = cache.check_config("config/databases.yml", false).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn artifact_is_reused_until_a_source_changes() {
        let temp = TempDir::new().expect("tmp");
        let source = write_databases(temp.path(), "FirstDatabase");
        let cache = cache(temp.path());

        let artifact = cache.import("config/databases.yml", false).expect("import").expect("artifact");
        assert_eq!(first_class(&artifact), "FirstDatabase");
        let path = cache.artifact_path("config/databases.yml");
        assert!(path.ends_with("frontend/prod/config/config_config_databases_yml.yml"));

        // Rewrite the source but keep it older than the artifact.
        write_databases(temp.path(), "SecondDatabase");
        let old = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&source)
            .expect("open")
            .set_modified(old)
            .expect("mtime");
        let artifact = cache.import("config/databases.yml", false).expect("import").expect("artifact");
        assert_eq!(first_class(&artifact), "FirstDatabase");

        let newer = SystemTime::now() + Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&source)
            .expect("open")
            .set_modified(newer)
            .expect("mtime");
        let artifact = cache.import("config/databases.yml", false).expect("import").expect("artifact");
        assert_eq!(first_class(&artifact), "SecondDatabase");
    }

    #[test]
    fn force_reload_always_recompiles() {
        let temp = TempDir::new().expect("tmp");
        let source = write_databases(temp.path(), "FirstDatabase");
        let cache = cache(temp.path()).with_force_reload(true);
        cache.check_config("config/databases.yml", false).expect("check");

        write_databases(temp.path(), "SecondDatabase");
        let old = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&source)
            .expect("open")
            .set_modified(old)
            .expect("mtime");
        let artifact = cache.import("config/databases.yml", false).expect("import").expect("artifact");
        assert_eq!(first_class(&artifact), "SecondDatabase");
    }

    #[test]
    fn unregistered_path_is_an_error() {
        let temp = TempDir::new().expect("tmp");
        let path = temp.path().join("config/unknown.yml");
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, "all: {}\n").expect("write");
        let err = cache(temp.path()).check_config("config/unknown.yml", false).unwrap_err();
        assert!(err.to_string().contains("registered handler"));
    }

    #[test]
    fn clear_removes_artifacts() {
        let temp = TempDir::new().expect("tmp");
        write_databases(temp.path(), "FirstDatabase");
        let cache = cache(temp.path());
        let path = cache
            .check_config("config/databases.yml", false)
            .expect("check")
            .expect("path");
        assert!(path.is_file());
        assert_eq!(cache.clear().expect("clear"), 1);
        assert!(!path.exists());
    }
}
