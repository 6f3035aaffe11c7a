//! Access to preset, shader and include text.
//!
//! Reading files is left to the caller; the compiler only asks for text by path.

use rustc_hash::FxHashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait SourceLoader: Sync {
    fn load(&self, path: &Path) -> io::Result<String>;
}

impl<T: SourceLoader + ?Sized> SourceLoader for &T {
    fn load(&self, path: &Path) -> io::Result<String> {
        (**self).load(path)
    }
}

/// Reads from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl SourceLoader for FileLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves text registered up front, keyed by normalized path.
///
/// Useful for presets embedded in a binary.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: FxHashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) -> &mut Self {
        self.files.insert(normalize(path.as_ref()), text.into());
        self
    }

    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not registered", path.display()),
            )
        })
    }
}

/// Lexically folds `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !matches!(
                    normalized.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c.slang")), PathBuf::from("a/c.slang"));
        assert_eq!(normalize(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("shaders/./a.slang", "text");
        assert_eq!(loader.load(Path::new("shaders/a.slang")).unwrap(), "text");
        assert_eq!(
            loader.load(Path::new("b.slang")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
