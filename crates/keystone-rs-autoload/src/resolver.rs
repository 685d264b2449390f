//! Class name to file resolution.

use crate::error::LoadFailure;
use crate::source::{AutoloadSource, AutoloadTable};
use crate::AutoloadError;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the stamp file listing the applications whose tables were built.
pub const STAMP_FILE: &str = "autoload.tmp";

/// Access to the host runtime that actually loads class files.
pub trait ClassLoader: Send + Debug {
    /// Whether a class, interface or trait is already defined.
    fn is_loaded(&self, class: &str) -> bool;

    fn load(&mut self, class: &str, file: &Path) -> Result<(), LoadFailure>;
}

/// Request-scoped information used to resolve a class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    /// Active application; switching it swaps the class table.
    pub app: Option<&'a str>,
    /// Current module, whose `lib/` classes are keyed `<module>/<class>`.
    pub module: Option<&'a str>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(app: Option<&'a str>) -> Self {
        Self { app, module: None }
    }

    pub fn with_module(mut self, module: &'a str) -> Self {
        self.module = Some(module);
        self
    }
}

/// Resolves class names through the compiled autoload table.
///
/// The table is loaded at most once per resolver unless a reload is forced.
/// Tables of applications seen before are kept, so switching back and forth
/// does not recompile. Paths set with [`AutoloadResolver::set_class_path`]
/// always win over the table.
#[derive(Debug)]
pub struct AutoloadResolver {
    source: Box<dyn AutoloadSource>,
    loader: Box<dyn ClassLoader>,
    stamp: PathBuf,
    classes: AutoloadTable,
    overrides: AutoloadTable,
    tables: HashMap<Option<String>, AutoloadTable>,
    app: Option<String>,
    loaded: bool,
}

impl AutoloadResolver {
    /// `cache_dir` holds the stamp file.
    pub fn new(
        source: Box<dyn AutoloadSource>,
        loader: Box<dyn ClassLoader>,
        cache_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            source,
            loader,
            stamp: cache_dir.as_ref().join(STAMP_FILE),
            classes: IndexMap::new(),
            overrides: IndexMap::new(),
            tables: HashMap::new(),
            app: None,
            loaded: false,
        }
    }

    pub fn loader(&self) -> &dyn ClassLoader {
        &*self.loader
    }

    /// Override the file of a class; survives reloads.
    pub fn set_class_path(&mut self, class: &str, path: &str) {
        let class = class.to_lowercase();
        self.overrides.insert(class.clone(), path.to_string());
        self.classes.insert(class, path.to_string());
    }

    pub fn class_path(&self, class: &str) -> Option<&str> {
        self.classes.get(&class.to_lowercase()).map(String::as_str)
    }

    /// Load the table of the current application.
    ///
    /// Returns `false` without doing anything when a table is already loaded
    /// and `force` is not set.
    pub fn reload(&mut self, force: bool) -> Result<bool, AutoloadError> {
        if self.loaded && !force {
            return Ok(false);
        }
        let app = self.app.clone();
        self.load_table(app.as_deref(), force)?;
        Ok(true)
    }

    /// Make sure the table of `ctx.app` is active, then [`resolve`](Self::resolve).
    pub fn autoload(&mut self, class: &str, ctx: &ResolveContext<'_>) -> Result<(), AutoloadError> {
        let app = ctx.app.map(str::to_string);
        if !self.loaded || self.app != app {
            self.switch_application(app)?;
        }
        self.resolve(class, ctx)
    }

    /// Load `class` from the active table, building it first if nothing is loaded yet.
    pub fn resolve(&mut self, class: &str, ctx: &ResolveContext<'_>) -> Result<(), AutoloadError> {
        if !self.loaded {
            self.switch_application(ctx.app.map(str::to_string))?;
        }
        let class = class.to_lowercase();
        if self.loader.is_loaded(&class) {
            return Ok(());
        }
        if let Some(file) = self.classes.get(&class).cloned() {
            return self.load(&class, file);
        }
        if let Some(module) = ctx.module {
            if let Some(file) = self.classes.get(&format!("{module}/{class}")).cloned() {
                return self.load(&class, file);
            }
        }
        debug!("class not found in autoload table (class={class})");
        Err(AutoloadError::ClassNotFound { class })
    }

    fn load(&mut self, class: &str, file: String) -> Result<(), AutoloadError> {
        let file = PathBuf::from(file);
        debug!("loading class (class={class}, file={})", file.display());
        self.loader
            .load(class, &file)
            .map_err(|source| AutoloadError::Load {
                class: class.to_string(),
                file,
                source,
            })
    }

    fn switch_application(&mut self, app: Option<String>) -> Result<(), AutoloadError> {
        if let Some(table) = self.tables.get(&app) {
            debug!("reusing autoload table (app={})", app.as_deref().unwrap_or("-"));
            let mut table = table.clone();
            table.extend(self.overrides.clone());
            self.classes = table;
            self.app = app;
            return Ok(());
        }
        let force = self.record_application(app.as_deref())?;
        self.app = app.clone();
        self.load_table(app.as_deref(), force)
    }

    fn load_table(&mut self, app: Option<&str>, force: bool) -> Result<(), AutoloadError> {
        let mut table = self.source.load_table(app, force)?;
        for (class, path) in &self.overrides {
            table.insert(class.clone(), path.clone());
        }
        info!(
            "loaded autoload table (app={}, classes={}, forced={force})",
            app.unwrap_or("-"),
            table.len()
        );
        self.tables.insert(app.map(str::to_string), table.clone());
        self.classes = table;
        self.loaded = true;
        Ok(())
    }

    /// Add `app` to the stamp file; `true` when it was not listed yet.
    fn record_application(&self, app: Option<&str>) -> Result<bool, AutoloadError> {
        let app = app.unwrap_or_default().to_string();
        let mut stamps: Vec<String> = match fs::read_to_string(&self.stamp) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "ignoring unreadable autoload stamp (path={}, error={err})",
                    self.stamp.display()
                );
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        if stamps.contains(&app) {
            return Ok(false);
        }
        stamps.push(app);
        if let Some(dir) = self.stamp.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string(&stamps).map_err(std::io::Error::other)?;
        fs::write(&self.stamp, contents)?;
        Ok(true)
    }
}
