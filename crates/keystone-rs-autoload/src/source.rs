//! Where autoload tables come from.

use crate::AutoloadError;
use indexmap::IndexMap;
use keystone_rs_config::{ConfigCache, ConfigError};
use log::debug;
use std::fmt;
use std::fs;

/// Lowercase class name (optionally `module/` prefixed) to file path.
pub type AutoloadTable = IndexMap<String, String>;

/// Config path of the compiled autoload table.
pub const AUTOLOAD_CONFIG: &str = "config/autoload.yml";

/// Supplies the class table of an application.
pub trait AutoloadSource: Send + Sync + fmt::Debug {
    /// Table for `app`; `force` discards any compiled copy first.
    fn load_table(&self, app: Option<&str>, force: bool) -> Result<AutoloadTable, AutoloadError>;
}

type CacheFactory = Box<dyn Fn(Option<&str>) -> Result<ConfigCache, ConfigError> + Send + Sync>;

enum CacheProvider {
    Single(ConfigCache),
    PerApplication(CacheFactory),
}

/// Tables read from the compiled `config/autoload.yml` artifact.
pub struct ArtifactSource {
    provider: CacheProvider,
}

impl ArtifactSource {
    /// Use one config cache regardless of the application.
    pub fn new(cache: ConfigCache) -> Self {
        Self {
            provider: CacheProvider::Single(cache),
        }
    }

    /// Build the config cache of each application on demand.
    pub fn per_application(
        cache_for: impl Fn(Option<&str>) -> Result<ConfigCache, ConfigError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            provider: CacheProvider::PerApplication(Box::new(cache_for)),
        }
    }
}

impl fmt::Debug for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provider = match self.provider {
            CacheProvider::Single(_) => "single",
            CacheProvider::PerApplication(_) => "per_application",
        };
        f.debug_struct("ArtifactSource")
            .field("provider", &provider)
            .finish()
    }
}

impl AutoloadSource for ArtifactSource {
    fn load_table(&self, app: Option<&str>, force: bool) -> Result<AutoloadTable, AutoloadError> {
        let built;
        let cache = match &self.provider {
            CacheProvider::Single(cache) => cache,
            CacheProvider::PerApplication(cache_for) => {
                built = cache_for(app)?;
                &built
            }
        };
        if force {
            let artifact = cache.artifact_path(AUTOLOAD_CONFIG);
            if artifact.is_file() {
                debug!("discarding compiled autoload table (path={})", artifact.display());
                fs::remove_file(&artifact)?;
            }
        }
        let artifact = cache
            .import(AUTOLOAD_CONFIG, false)?
            .ok_or_else(|| ConfigError::NotFound {
                path: AUTOLOAD_CONFIG.into(),
            })?;
        artifact.autoload_table().ok_or_else(|| {
            ConfigError::Invalid {
                path: AUTOLOAD_CONFIG.to_string(),
                message: "artifact does not contain an autoload table".to_string(),
            }
            .into()
        })
    }
}

/// A fixed table, the same for every application.
#[derive(Debug, Clone, Default)]
pub struct TableSource {
    table: AutoloadTable,
}

impl TableSource {
    pub fn new(table: AutoloadTable) -> Self {
        Self { table }
    }
}

impl FromIterator<(String, String)> for TableSource {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl AutoloadSource for TableSource {
    fn load_table(&self, _app: Option<&str>, _force: bool) -> Result<AutoloadTable, AutoloadError> {
        Ok(self.table.clone())
    }
}
