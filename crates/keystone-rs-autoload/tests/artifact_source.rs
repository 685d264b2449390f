//! Resolution backed by the compiled `config/autoload.yml` artifact.

use keystone_rs_autoload::{
    ArtifactSource, AutoloadResolver, ClassLoader, LoadFailure, ResolveContext,
};
use keystone_rs_config::{
    AutoloadConfigHandler, ConfigCache, ConfigLocator, ConfigRootKind, Settings,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Default, Clone)]
struct Recorder(Arc<Mutex<Vec<PathBuf>>>);

impl ClassLoader for Recorder {
    fn is_loaded(&self, _class: &str) -> bool {
        false
    }

    fn load(&mut self, _class: &str, file: &Path) -> Result<(), LoadFailure> {
        self.0.lock().expect("lock").push(file.to_path_buf());
        Ok(())
    }
}

fn write_autoload(root: &Path, post: &str) {
    let path = root.join("config/autoload.yml");
    fs::create_dir_all(path.parent().expect("parent")).expect("dir");
    fs::write(
        path,
        format!("autoload:\n  project:\n    files:\n      Post: {post}\n"),
    )
    .expect("write");
}

fn config_cache(root: &Path) -> ConfigCache {
    let settings = Settings::new(root, "dev").with_app("frontend");
    let locator = ConfigLocator::new().with_root(ConfigRootKind::Project, root);
    let mut cache = ConfigCache::new(settings, locator);
    cache
        .register_handler("config/autoload.yml", Arc::new(AutoloadConfigHandler::new()))
        .expect("register");
    cache
}

#[test]
fn forced_reload_recompiles_the_table() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_autoload(root, "/first/Post.php");

    let recorder = Recorder::default();
    let mut resolver = AutoloadResolver::new(
        Box::new(ArtifactSource::new(config_cache(root))),
        Box::new(recorder.clone()),
        root.join("cache"),
    );
    let ctx = ResolveContext::new(Some("frontend"));
    resolver.autoload("Post", &ctx).expect("first");
    assert!(root.join("cache/autoload.tmp").is_file());

    write_autoload(root, "/second/Post.php");
    assert!(!resolver.reload(false).expect("reload"));
    assert_eq!(resolver.class_path("post"), Some("/first/Post.php"));

    assert!(resolver.reload(true).expect("forced"));
    resolver.autoload("Post", &ctx).expect("second");
    assert_eq!(
        recorder.0.lock().expect("lock").clone(),
        vec![PathBuf::from("/first/Post.php"), PathBuf::from("/second/Post.php")]
    );
}

#[test]
fn missing_autoload_config_is_a_config_error() {
    let temp = TempDir::new().expect("tmp");
    let mut resolver = AutoloadResolver::new(
        Box::new(ArtifactSource::new(config_cache(temp.path()))),
        Box::new(Recorder::default()),
        temp.path().join("cache"),
    );
    let err = resolver
        .autoload("Post", &ResolveContext::default())
        .unwrap_err();
    assert!(matches!(err, keystone_rs_autoload::AutoloadError::Config(_)));
}
