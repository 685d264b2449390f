//! Compiled configuration artifacts.
//!
//! An artifact is the cached output of one handler run. It is stored as YAML
//! behind a comment stamp and carries either an autoload table, an ordered list
//! of registrations to replay against the caller, or generated source code.

use crate::ConfigError;
use crate::value::ConfigMap;
use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata describing how an artifact was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Config path the artifact was compiled for (e.g. `config/filters.yml`).
    pub category: String,
    /// Name of the handler that produced it.
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    /// Source files in merge order.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

/// A compiled artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub header: ArtifactHeader,
    pub body: ArtifactBody,
}

/// Artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactBody {
    /// Class to file mappings grouped by autoload entry name.
    Autoload { sections: Vec<AutoloadSection> },
    /// Registration calls replayed in order.
    Registrations { registrations: Vec<Registration> },
    /// Generated source code (e.g. a dumped service container).
    Source {
        language: String,
        class: String,
        code: String,
    },
}

/// One named autoload entry and the classes it discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoloadSection {
    pub name: String,
    pub classes: IndexMap<String, String>,
}

/// A single registration call encoded in an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Registration {
    Cache(CachePolicy),
    Database(DatabaseRegistration),
    Factory(FactoryRegistration),
    Filter(FilterRegistration),
    View(ViewRegistration),
}

/// Cache policy for one action of a module (`DEFAULT` for the fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub action: String,
    pub with_layout: bool,
    pub lifetime: i64,
    pub client_lifetime: i64,
    pub contextual: bool,
    #[serde(default)]
    pub vary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRegistration {
    pub name: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub params: ConfigMap,
}

/// A class with its parameters, used for nested factory components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub params: ConfigMap,
}

/// Wiring for one factory role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryRegistration {
    pub role: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub params: ConfigMap,
    /// Cache component built before the role (`i18n`, `routing`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_maxlifetime: Option<i64>,
    /// Enabled child components attached to the role (e.g. loggers).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentSpec>,
    /// Another role constructed alongside this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<ComponentSpec>,
    /// Config path compiled on demand for this role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

impl FactoryRegistration {
    pub fn new(role: &str, class: &str) -> Self {
        Self {
            role: role.to_string(),
            class: class.to_string(),
            file: None,
            params: ConfigMap::new(),
            cache: None,
            session_name: None,
            database: None,
            gc_maxlifetime: None,
            components: Vec::new(),
            companion: None,
            config_path: None,
        }
    }
}

/// One filter of the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRegistration {
    pub name: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub params: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    /// Only runs for secure actions.
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stylesheet,
    Javascript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRegistration {
    pub kind: AssetKind,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub options: ConfigMap,
}

/// Response setup for one view (`DEFAULT` for the module-wide fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRegistration {
    pub view: String,
    #[serde(default = "default_has_layout")]
    pub has_layout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetRegistration>,
    #[serde(default)]
    pub metas: ConfigMap,
    #[serde(default)]
    pub http_metas: ConfigMap,
}

fn default_has_layout() -> bool {
    true
}

/// Receiver for the registrations encoded in an artifact.
pub trait RegistrationContext {
    fn register(&mut self, registration: &Registration) -> Result<(), ConfigError>;
}

impl Artifact {
    /// Build an artifact stamped with the current time.
    pub fn new(category: &str, generator: &str, sources: Vec<PathBuf>, body: ArtifactBody) -> Self {
        Self {
            header: ArtifactHeader {
                category: category.to_string(),
                generator: generator.to_string(),
                generated_at: Utc::now(),
                sources,
            },
            body,
        }
    }

    /// Serialize with the human-readable comment stamp in front.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        let date = self
            .header
            .generated_at
            .with_timezone(&Local)
            .format("%Y/%m/%d %H:%M:%S");
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!(
            "# auto-generated by {}\n# date: {date}\n{yaml}",
            self.header.generator
        ))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load an artifact from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("loading artifact (path={})", path.display());
        let contents = fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.to_path_buf(),
        })?;
        serde_yaml::from_str(&contents).map_err(|err| ConfigError::Artifact {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Perform every registration in order against `ctx`.
    pub fn replay(&self, ctx: &mut dyn RegistrationContext) -> Result<(), ConfigError> {
        let ArtifactBody::Registrations { registrations } = &self.body else {
            return Err(ConfigError::Invalid {
                path: self.header.category.clone(),
                message: "artifact does not contain registrations".to_string(),
            });
        };
        for registration in registrations {
            ctx.register(registration)?;
        }
        Ok(())
    }

    /// Flattened class table; later sections win on duplicate classes.
    pub fn autoload_table(&self) -> Option<IndexMap<String, String>> {
        let ArtifactBody::Autoload { sections } = &self.body else {
            return None;
        };
        let mut table = IndexMap::new();
        for section in sections {
            for (class, file) in &section.classes {
                table.insert(class.clone(), file.clone());
            }
        }
        Some(table)
    }

    /// Generated source code, for `Source` artifacts.
    pub fn source(&self) -> Option<&str> {
        match &self.body {
            ArtifactBody::Source { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn registrations(&self) -> &[Registration] {
        match &self.body {
            ArtifactBody::Registrations { registrations } => registrations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Recorder(Vec<String>);

    impl RegistrationContext for Recorder {
        fn register(&mut self, registration: &Registration) -> Result<(), ConfigError> {
            if let Registration::Database(db) = registration {
                self.0.push(db.name.clone());
            }
            Ok(())
        }
    }

    fn database(name: &str) -> Registration {
        Registration::Database(DatabaseRegistration {
            name: name.to_string(),
            class: "PdoDatabase".to_string(),
            file: None,
            params: ConfigMap::new(),
        })
    }

    #[test]
    fn yaml_carries_comment_stamp_and_round_trips() {
        let artifact = Artifact::new(
            "config/databases.yml",
            "DatabaseConfigHandler",
            vec![PathBuf::from("/srv/app/config/databases.yml")],
            ArtifactBody::Registrations {
                registrations: vec![database("main")],
            },
        );
        let yaml = artifact.to_yaml_string().expect("yaml");
        let mut lines = yaml.lines();
        assert_eq!(lines.next(), Some("# auto-generated by DatabaseConfigHandler"));
        assert!(lines.next().expect("date").starts_with("# date: "));

        let parsed = Artifact::from_yaml_str(&yaml).expect("parse");
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn replay_preserves_order() {
        let artifact = Artifact::new(
            "config/databases.yml",
            "DatabaseConfigHandler",
            Vec::new(),
            ArtifactBody::Registrations {
                registrations: vec![database("b"), database("a")],
            },
        );
        let mut recorder = Recorder(Vec::new());
        artifact.replay(&mut recorder).expect("replay");
        assert_eq!(recorder.0, vec!["b", "a"]);
    }

    #[test]
    fn autoload_table_merges_sections() {
        let mut first = IndexMap::new();
        first.insert("foo".to_string(), "/a/foo.php".to_string());
        let mut second = IndexMap::new();
        second.insert("foo".to_string(), "/b/foo.php".to_string());
        second.insert("bar".to_string(), "/b/bar.php".to_string());
        let artifact = Artifact::new(
            "config/autoload.yml",
            "AutoloadConfigHandler",
            Vec::new(),
            ArtifactBody::Autoload {
                sections: vec![
                    AutoloadSection {
                        name: "first".to_string(),
                        classes: first,
                    },
                    AutoloadSection {
                        name: "second".to_string(),
                        classes: second,
                    },
                ],
            },
        );
        let table = artifact.autoload_table().expect("table");
        assert_eq!(table["foo"], "/b/foo.php");
        assert_eq!(table.len(), 2);
        assert!(artifact.replay(&mut Recorder(Vec::new())).is_err());
    }
}
