//! Slash-separated paths for resource directories

use std::fmt;
use std::path::{Path, PathBuf};

/// A filesystem path kept with `/` separators.
///
/// Resource directories are built by joining type and id segments, and the
/// same string is reported in diffs on every platform. Conversion to a
/// native path happens only when touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().to_string_lossy().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// Append one or more `/`-separated segments.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let base = self.0.trim_end_matches('/');
        Self(format!("{base}/{}", segment.trim_start_matches('/')))
    }

    /// Everything before the last segment; `None` for a single segment.
    pub fn parent(&self) -> Option<Self> {
        match self.0.trim_end_matches('/').rsplit_once('/') {
            Some(("", _)) => Some(Self("/".to_string())),
            Some((head, _)) => Some(Self(head.to_string())),
            None => None,
        }
    }

    /// The last segment, e.g. the resource id of a resource directory.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.0.trim_end_matches('/');
        let name = trimmed.rsplit_once('/').map_or(trimmed, |(_, name)| name);
        (!name.is_empty()).then_some(name)
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}
