use keystone_rs_autoload::{ClassLoader, LoadFailure};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    defined: HashSet<String>,
    failing: HashSet<PathBuf>,
    loads: Vec<(String, PathBuf)>,
}

/// Class loader that records loads instead of executing files.
///
/// Clones share state, so a test can keep one handle while the resolver
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct FakeClassLoader {
    state: Arc<Mutex<State>>,
}

impl FakeClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes the host already knows.
    pub fn with_defined(self, classes: &[&str]) -> Self {
        self.state
            .lock()
            .defined
            .extend(classes.iter().map(|class| class.to_lowercase()));
        self
    }

    /// Make loading `file` fail.
    pub fn failing_on(self, file: impl AsRef<Path>) -> Self {
        self.state.lock().failing.insert(file.as_ref().to_path_buf());
        self
    }

    /// Loads performed so far, as `(class, file)`.
    pub fn loads(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().loads.clone()
    }
}

impl ClassLoader for FakeClassLoader {
    fn is_loaded(&self, class: &str) -> bool {
        self.state.lock().defined.contains(class)
    }

    fn load(&mut self, class: &str, file: &Path) -> Result<(), LoadFailure> {
        let mut state = self.state.lock();
        if state.failing.contains(file) {
            return Err(format!("cannot load {}", file.display()).into());
        }
        state.loads.push((class.to_string(), file.to_path_buf()));
        state.defined.insert(class.to_string());
        Ok(())
    }
}
