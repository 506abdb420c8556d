use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Source text of every problem file read so far, kept so that errors can quote it later.
#[derive(Clone, Debug, Default)]
pub struct FileCache {
    files: BTreeMap<PathBuf, String>,
}

// Paths that do not exist on disk (in-memory sources) are keyed as given.
fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, path: impl AsRef<Path>) -> io::Result<&str> {
        let key = cache_key(path.as_ref());
        if !self.files.contains_key(&key) {
            let content = fs::read_to_string(&key)?;
            self.files.insert(key.clone(), content);
        }
        Ok(&self.files[&key])
    }

    pub fn read_cached(&self, path: impl AsRef<Path>) -> io::Result<&str> {
        let path = path.as_ref();
        self.files
            .get(&cache_key(path))
            .map(String::as_str)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} was never loaded", path.display()),
                )
            })
    }

    /// Registers source text that does not live on disk under `path`.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(cache_key(path.as_ref()), content.into());
    }
}
