//! Autoload table compiler.
//!
//! Entries either map classes to files explicitly (`files`) or scan the
//! directories matched by a `path` glob for class declarations.

use super::{ConfigHandler, first_file};
use crate::artifact::{ArtifactBody, AutoloadSection};
use crate::loader::{parse_yamls, replace_constants_map, replace_path};
use crate::locator::ConfigFileSet;
use crate::settings::Settings;
use crate::value::{ConfigMap, ConfigValue};
use crate::ConfigError;
use globset::GlobBuilder;
use indexmap::IndexMap;
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_EXTENSION: &str = ".php";

/// Compiles `config/autoload.yml` into class -> file mappings.
#[derive(Debug, Default, Clone)]
pub struct AutoloadConfigHandler {
    plugin_roots: Vec<PathBuf>,
}

impl AutoloadConfigHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin roots whose config files merge before the others.
    pub fn with_plugin_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.plugin_roots = roots;
        self
    }

    /// Merged `autoload` entries with constants and paths resolved.
    pub fn configuration(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ConfigMap, ConfigError> {
        let ordered = ConfigFileSet::with_plugins_first(files.files().to_vec(), &self.plugin_roots);
        let config = replace_constants_map(&parse_yamls(ordered.iter())?, settings);
        let Some(ConfigValue::Map(entries)) = config.get("autoload") else {
            return Err(ConfigError::parse(
                first_file(files),
                "is missing the required \"autoload\" category",
            ));
        };
        let mut entries = entries.clone();
        for entry in entries.values_mut() {
            if let Some(map) = entry.as_map_mut() {
                if let Some(ConfigValue::String(path)) = map.get("path") {
                    let resolved = replace_path(path, settings);
                    map.insert("path".to_string(), ConfigValue::String(resolved));
                }
            }
        }
        Ok(entries)
    }
}

impl ConfigHandler for AutoloadConfigHandler {
    fn name(&self) -> &str {
        "AutoloadConfigHandler"
    }

    fn category(&self) -> &str {
        "autoload"
    }

    fn execute(
        &self,
        files: &ConfigFileSet,
        settings: &Settings,
    ) -> Result<ArtifactBody, ConfigError> {
        let file = first_file(files);
        let entries = self.configuration(files, settings)?;
        let scanner = ClassScanner::new()?;
        let mut sections = Vec::with_capacity(entries.len());
        for (name, entry) in &entries {
            let Some(entry) = entry.as_map() else {
                warn!("skipping autoload entry that is not a mapping (name={name})");
                continue;
            };
            let classes = if let Some(files) = entry.get("files") {
                file_mapping(files)
            } else {
                directory_mapping(name, entry, &scanner, &file)?
            };
            debug!("autoload entry resolved (name={name}, classes={})", classes.len());
            sections.push(AutoloadSection {
                name: name.clone(),
                classes,
            });
        }
        info!(
            "compiled autoload config (entries={}, classes={})",
            sections.len(),
            sections.iter().map(|s| s.classes.len()).sum::<usize>()
        );
        Ok(ArtifactBody::Autoload { sections })
    }
}

fn file_mapping(files: &ConfigValue) -> IndexMap<String, String> {
    files
        .as_map()
        .map(|files| {
            files
                .iter()
                .map(|(class, file)| (class.to_lowercase(), file.to_plain_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn directory_mapping(
    name: &str,
    entry: &ConfigMap,
    scanner: &ClassScanner,
    file: &Path,
) -> Result<IndexMap<String, String>, ConfigError> {
    let Some(path) = entry.get("path").and_then(ConfigValue::as_str) else {
        return Err(ConfigError::parse(
            file,
            format!("specifies autoload entry \"{name}\" without \"files\" or \"path\""),
        ));
    };
    let ext = entry
        .get("ext")
        .and_then(ConfigValue::as_str)
        .unwrap_or(DEFAULT_EXTENSION);
    let recursive = entry.get("recursive").is_some_and(ConfigValue::is_truthy);
    let exclude: Vec<String> = entry
        .get("exclude")
        .and_then(ConfigValue::as_list)
        .map(|items| items.iter().map(ConfigValue::to_plain_string).collect())
        .unwrap_or_default();
    let prefix = entry
        .get("prefix")
        .and_then(ConfigValue::as_i64)
        .filter(|prefix| *prefix > 0)
        .map(|prefix| prefix as usize);

    let prefix_pattern = match prefix {
        Some(_) => Some(prefix_regex(path).map_err(|err| {
            ConfigError::parse(file, format!("specifies an invalid autoload path \"{path}\": {err}"))
        })?),
        None => None,
    };

    let mut mapping = IndexMap::new();
    for dir in expand_glob(path, file)? {
        let walker = WalkDir::new(&dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && exclude
                        .iter()
                        .any(|excluded| entry.file_name().to_string_lossy() == excluded.as_str()))
            });
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    warn!("skipping unreadable autoload path (err={err})");
                    continue;
                }
            };
            if !item.file_type().is_file()
                || !item.file_name().to_string_lossy().ends_with(ext)
            {
                continue;
            }
            let file_path = item.path().to_string_lossy().into_owned();
            let local_prefix = match (&prefix_pattern, prefix) {
                (Some(pattern), Some(index)) => pattern
                    .captures(&file_path)
                    .and_then(|captures| captures.get(index))
                    .map(|capture| format!("{}/", capture.as_str()))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            for class in scanner.scan(item.path()) {
                mapping.insert(format!("{local_prefix}{class}"), file_path.clone());
            }
        }
    }
    Ok(mapping)
}

/// Regex matching the literal parts of `path`, capturing each `*`.
fn prefix_regex(path: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(path).replace(r"\*", "(.+?)");
    Regex::new(&format!("^{escaped}"))
}

/// Directories matched by a path that may contain glob characters.
fn expand_glob(path: &str, file: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let pattern = Path::new(path);
    let mut base = PathBuf::new();
    let mut depth = 0usize;
    let mut globbed = false;
    for component in pattern.components() {
        let text = component.as_os_str().to_string_lossy();
        if globbed || text.contains(['*', '?', '[', '{']) {
            globbed = true;
            depth += 1;
        } else if !matches!(component, Component::CurDir) {
            base.push(component.as_os_str());
        }
    }
    if !globbed {
        return Ok(if base.is_dir() { vec![base] } else { Vec::new() });
    }

    let matcher = GlobBuilder::new(path)
        .literal_separator(true)
        .build()
        .map_err(|err| ConfigError::parse(file, format!("specifies an invalid autoload path \"{path}\": {err}")))?
        .compile_matcher();
    let mut dirs: Vec<PathBuf> = WalkDir::new(&base)
        .follow_links(true)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && matcher.is_match(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    dirs.dedup();
    Ok(dirs)
}

/// Finds class, interface and trait declarations in source files.
struct ClassScanner {
    namespace: Regex,
    declaration: Regex,
}

impl ClassScanner {
    fn new() -> Result<Self, ConfigError> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|err| ConfigError::Invalid {
                path: "autoload".to_string(),
                message: err.to_string(),
            })
        };
        Ok(Self {
            namespace: build(r"(?mi)^namespace\s+[^;{]+[;{]")?,
            declaration: build(
                r"(?mi)^(?:abstract\s+|final\s+)?(?:class|interface|trait)\s+(\w+)",
            )?,
        })
    }

    /// Lowercased class names declared in `path`; namespaced files yield none.
    fn scan(&self, path: &Path) -> Vec<String> {
        let Ok(contents) = fs::read_to_string(path) else {
            warn!("skipping unreadable autoload file (path={})", path.display());
            return Vec::new();
        };
        if self.namespace.is_match(&contents) {
            debug!("skipping namespaced file (path={})", path.display());
            return Vec::new();
        }
        self.declaration
            .captures_iter(&contents)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str().to_lowercase())
            .collect()
    }
}
