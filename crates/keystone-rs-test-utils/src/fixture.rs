//! On-disk project layouts for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FACTORIES_YML: &str = r#"all:
  view_cache_manager:
    class: ViewCacheManager
  logger:
    class: AggregateLogger
    param:
      level: debug
      loggers:
        file:
          class: FileLogger
          param:
            file: '%SF_ROOT_DIR%/log/app.log'
  i18n:
    class: I18N
  controller:
    class: FrontWebController
  request:
    class: WebRequest
  response:
    class: WebResponse
  routing:
    class: PatternRouting
  storage:
    class: SessionStorage
    param:
      session_name: keystone
  user:
    class: BasicSecurityUser
    param:
      timeout: 1800
  view_cache:
    class: FileCache
  mailer:
    class: Mailer
  service_container:
    class: ServiceContainer
"#;

pub const FILTERS_YML: &str = r#"rendering:
  class: RenderingFilter
  param:
    type: rendering
security:
  class: BasicSecurityFilter
  param:
    type: security
cache:
  class: CacheFilter
execution:
  class: ExecutionFilter
  param:
    type: execution
"#;

pub const SERVICES_YML: &str = r#"parameters:
  mailer.class: Mailer
services:
  mailer.transport:
    class: SmtpTransport
    arguments: ['%mailer.host%']
  mailer:
    class: '%mailer.class%'
    arguments: ['@mailer.transport']
    calls:
      - [setCharset, ['utf-8']]
  default_mailer: '@mailer'
"#;

pub const DATABASES_YML: &str = r#"all:
  main:
    class: PdoDatabase
    param:
      dsn: 'sqlite:%SF_ROOT_DIR%/data/app.db'
"#;

/// A temporary project root with helpers to lay out config files.
#[derive(Debug)]
pub struct ProjectFixture {
    temp: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("tmp"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write `contents` to a path relative to the root, creating directories.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, contents).expect("write");
        path
    }

    /// Project level factories, filters, databases and services.
    pub fn with_project_config(self) -> Self {
        self.write("config/factories.yml", FACTORIES_YML);
        self.write("config/filters.yml", FILTERS_YML);
        self.write("config/databases.yml", DATABASES_YML);
        self.write("config/services.yml", SERVICES_YML);
        self
    }

    /// An application directory with an autoload entry for its `lib/`.
    pub fn with_application(self, app: &str) -> Self {
        self.write(
            &format!("apps/{app}/lib/{app}Helper.php"),
            &format!("<?php\nclass {app}Helper\n{{\n}}\n"),
        );
        self.write(
            &format!("apps/{app}/config/autoload.yml"),
            &format!(
                "autoload:\n  {app}_lib:\n    path: '%SF_ROOT_DIR%/apps/{app}/lib'\n    recursive: true\n"
            ),
        );
        self
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
