//! File reads and locked, atomic writes

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, NormalizedPath, Result};

/// Replace `path` with `content` in one step.
///
/// The bytes go to a locked sibling temp file that is synced and then
/// renamed over the target, so readers see either the old file or the new
/// one. A target that already holds `content` is left untouched.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    if fs::read(&target).is_ok_and(|existing| existing == content) {
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp = temp_sibling(&target);
    let result = write_locked(&temp, &target, content)
        .and_then(|()| fs::rename(&temp, &target).map_err(|e| Error::io(&target, e)));
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn write_locked(temp: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp)
        .map_err(|e| Error::io(temp, e))?;
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    file.write_all(content).map_err(|e| Error::io(temp, e))?;
    file.sync_all().map_err(|e| Error::io(temp, e))
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(&native, e))
}

pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &NormalizedPath) -> Result<T> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|e| Error::json(path.to_native(), e))
}

/// Serialize `value` with two-space indentation and write it atomically.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &NormalizedPath, value: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| Error::json(path.to_native(), e))?;
    write_text(path, &content)
}
