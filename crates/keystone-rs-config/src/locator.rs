//! Configuration roots and per-category file sets.

use log::debug;
use std::path::{Path, PathBuf};

/// Kind of directory a configuration root belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRootKind {
    /// Framework defaults shipped with the core.
    Framework,
    Plugin,
    Project,
    Application,
}

/// A directory searched for configuration files.
#[derive(Debug, Clone)]
pub struct ConfigRoot {
    pub kind: ConfigRootKind,
    pub path: PathBuf,
}

/// Ordered source files for one configuration path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFileSet {
    files: Vec<PathBuf>,
}

impl ConfigFileSet {
    /// Wrap files already in merge order.
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Order files with plugin files first, keeping relative order otherwise.
    ///
    /// A file belongs to a plugin when the directory two levels above it
    /// (`<plugin>/config/<file>`) is one of `plugin_roots`.
    pub fn with_plugins_first(files: Vec<PathBuf>, plugin_roots: &[PathBuf]) -> Self {
        let (plugins, others): (Vec<_>, Vec<_>) = files.into_iter().partition(|file| {
            file.parent()
                .and_then(Path::parent)
                .is_some_and(|dir| plugin_roots.iter().any(|root| root == dir))
        });
        Self {
            files: plugins.into_iter().chain(others).collect(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn first(&self) -> Option<&Path> {
        self.files.first().map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }
}

impl From<Vec<PathBuf>> for ConfigFileSet {
    fn from(files: Vec<PathBuf>) -> Self {
        Self::new(files)
    }
}

/// Ordered configuration roots used to resolve config paths to files.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocator {
    roots: Vec<ConfigRoot>,
}

impl ConfigLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, kind: ConfigRootKind, path: impl AsRef<Path>) -> Self {
        self.roots.push(ConfigRoot {
            kind,
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    pub fn roots(&self) -> &[ConfigRoot] {
        &self.roots
    }

    pub fn plugin_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .filter(|root| root.kind == ConfigRootKind::Plugin)
            .map(|root| root.path.clone())
            .collect()
    }

    /// Existing files for `config_path`, in root order.
    ///
    /// Each root contributes its global file (`config/<name>`) and, for
    /// module paths such as `modules/blog/config/cache.yml`, the module file.
    pub fn files_for(&self, config_path: &str) -> ConfigFileSet {
        let global = global_config_path(config_path);
        let mut files: Vec<PathBuf> = Vec::new();
        for root in &self.roots {
            let mut candidates = vec![root.path.join(&global)];
            if global != config_path {
                candidates.push(root.path.join(config_path));
            }
            for candidate in candidates {
                if candidate.is_file() && !files.contains(&candidate) {
                    debug!(
                        "found config file (path={}, root={:?})",
                        candidate.display(),
                        root.kind
                    );
                    files.push(candidate);
                }
            }
        }
        ConfigFileSet::new(files)
    }
}

/// `modules/blog/config/cache.yml` -> `config/cache.yml`.
fn global_config_path(config_path: &str) -> String {
    let path = Path::new(config_path);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|dir| dir.to_string_lossy().into_owned());
    match dir {
        Some(dir) => format!("{dir}/{name}"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(path, "all:\n").expect("write");
    }

    #[test]
    fn moves_plugin_files_first() {
        let files = vec![
            PathBuf::from("/core/config/autoload.yml"),
            PathBuf::from("/app/config/autoload.yml"),
            PathBuf::from("/plugins/a/config/autoload.yml"),
            PathBuf::from("/plugins/b/config/autoload.yml"),
        ];
        let plugins = vec![PathBuf::from("/plugins/b"), PathBuf::from("/plugins/a")];
        let set = ConfigFileSet::with_plugins_first(files, &plugins);
        assert_eq!(
            set.files(),
            &[
                PathBuf::from("/plugins/a/config/autoload.yml"),
                PathBuf::from("/plugins/b/config/autoload.yml"),
                PathBuf::from("/core/config/autoload.yml"),
                PathBuf::from("/app/config/autoload.yml"),
            ]
        );
    }

    #[test]
    fn locator_lists_existing_files_in_root_order() {
        let temp = TempDir::new().expect("tmp");
        let core = temp.path().join("core");
        let app = temp.path().join("apps/frontend");
        touch(&core.join("config/cache.yml"));
        touch(&app.join("modules/blog/config/cache.yml"));

        let locator = ConfigLocator::new()
            .with_root(ConfigRootKind::Framework, &core)
            .with_root(ConfigRootKind::Application, &app);
        let set = locator.files_for("modules/blog/config/cache.yml");
        assert_eq!(
            set.files(),
            &[
                core.join("config/cache.yml"),
                app.join("modules/blog/config/cache.yml"),
            ]
        );
        assert!(locator.files_for("config/filters.yml").is_empty());
    }

    #[test]
    fn global_path_strips_module_prefix() {
        assert_eq!(global_config_path("modules/x/config/view.yml"), "config/view.yml");
        assert_eq!(global_config_path("config/app.yml"), "config/app.yml");
    }
}
