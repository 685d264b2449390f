//! Config cache integration tests across several configuration roots.

use keystone_rs_config::{
    AutoloadConfigHandler, ConfigCache, ConfigLocator, ConfigRootKind, FilterConfigHandler,
    Registration, Settings, ViewConfigHandler,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("dir");
    fs::write(path, contents).expect("write");
}

fn project(temp: &TempDir) -> ConfigCache {
    let root = temp.path();
    let settings = Settings::new(root, "dev").with_app("frontend");
    let locator = ConfigLocator::new()
        .with_root(ConfigRootKind::Framework, root.join("core"))
        .with_root(ConfigRootKind::Plugin, root.join("plugins/sfBlogPlugin"))
        .with_root(ConfigRootKind::Project, root)
        .with_root(ConfigRootKind::Application, root.join("apps/frontend"));
    let plugins = locator.plugin_roots();
    let mut cache = ConfigCache::new(settings, locator);
    cache
        .register_handler(
            "config/autoload.yml",
            Arc::new(AutoloadConfigHandler::new().with_plugin_roots(plugins)),
        )
        .expect("autoload");
    cache
        .register_handler("config/filters.yml", Arc::new(FilterConfigHandler))
        .expect("filters");
    cache
        .register_handler("modules/*/config/view.yml", Arc::new(ViewConfigHandler))
        .expect("view");
    cache
}

/// Plugin mappings merge first so project entries override them.
#[test]
fn autoload_prefers_project_entries_over_plugins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write(
        &root.join("core/config/autoload.yml"),
        "autoload:\n  core:\n    files:\n      Toolkit: /core/Toolkit.php\n",
    );
    write(
        &root.join("config/autoload.yml"),
        "autoload:\n  shared:\n    files:\n      Post: /project/Post.php\n",
    );
    write(
        &root.join("plugins/sfBlogPlugin/config/autoload.yml"),
        "autoload:\n  shared:\n    files:\n      Post: /plugin/Post.php\n      Comment: /plugin/Comment.php\n",
    );

    let cache = project(&temp);
    let artifact = cache
        .import("config/autoload.yml", false)
        .expect("import")
        .expect("artifact");
    let table = artifact.autoload_table().expect("table");
    assert_eq!(table["post"], "/project/Post.php");
    assert_eq!(table["comment"], "/plugin/Comment.php");
    assert_eq!(table["toolkit"], "/core/Toolkit.php");
    assert_eq!(
        artifact.header.sources.first().map(|p| p.ends_with("plugins/sfBlogPlugin/config/autoload.yml")),
        Some(true)
    );
}

#[test]
fn filter_chain_merges_framework_and_application_files() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write(
        &root.join("core/config/filters.yml"),
        "rendering:\n  class: RenderingFilter\n  param:\n    type: rendering\nsecurity:\n  class: SecurityFilter\n  param:\n    type: security\nexecution:\n  class: ExecutionFilter\n  param:\n    type: execution\n",
    );
    write(
        &root.join("apps/frontend/config/filters.yml"),
        "rendering: ~\nsecurity:\n  enabled: false\nexecution: ~\n",
    );

    let cache = project(&temp);
    let artifact = cache
        .import("config/filters.yml", false)
        .expect("import")
        .expect("artifact");
    let names: Vec<_> = artifact
        .registrations()
        .iter()
        .map(|registration| match registration {
            Registration::Filter(filter) => filter.name.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(names, vec!["rendering", "execution"]);

    let yaml = fs::read_to_string(
        cache
            .check_config("config/filters.yml", false)
            .expect("check")
            .expect("path"),
    )
    .expect("read");
    assert!(yaml.starts_with("# auto-generated by FilterConfigHandler\n# date: "));
}

#[test]
fn module_view_config_uses_module_and_global_files() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write(
        &root.join("apps/frontend/config/view.yml"),
        "default:\n  stylesheets: [main]\n",
    );
    write(
        &root.join("apps/frontend/modules/blog/config/view.yml"),
        "indexSuccess:\n  stylesheets: [blog, -main]\n",
    );

    let cache = project(&temp);
    let artifact = cache
        .import("modules/blog/config/view.yml", false)
        .expect("import")
        .expect("artifact");
    let Registration::View(index) = &artifact.registrations()[0] else {
        panic!("expected view");
    };
    assert_eq!(index.view, "indexSuccess");
    assert_eq!(
        index.assets.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        vec!["blog"]
    );
    assert!(cache.check_config("modules/news/config/cache.yml", true).expect("check").is_none());
}
