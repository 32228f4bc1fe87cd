//! Per-resource directory layout under a property root
//!
//! ```text
//! <root>/<type>/<id>/data.json
//! <root>/<type>/<id>/settings.json
//! <root>/<type>/<id>/settings.<dotted.path>.js
//! <root>/<type>/_<sanitized name>  ->  <id>
//! ```

use std::fs;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::artifact::{artifact_file_name, property_path_of, unwrap_function_body};
use crate::{Error, NormalizedPath, Result, io};

/// Canonical record file in every resource directory.
pub const DATA_FILE: &str = "data.json";
/// Extracted, pretty-printed settings document.
pub const SETTINGS_FILE: &str = "settings.json";

/// One resource as found on disk.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    /// Resource type directory name (e.g. `data_elements`)
    pub kind: String,
    pub id: String,
    /// The id-named resource directory
    pub dir: NormalizedPath,
    /// Parsed `data.json`, with edited settings artifacts folded back into
    /// `attributes.settings`
    pub record: Value,
}

/// Reads and writes resource directories below a property root.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: NormalizedPath,
}

impl LocalStore {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn type_dir(&self, kind: &str) -> NormalizedPath {
        self.root.join(kind)
    }

    pub fn resource_dir(&self, kind: &str, id: &str) -> NormalizedPath {
        self.type_dir(kind).join(id)
    }

    /// Create the resource directory, its alias and `data.json`.
    ///
    /// Returns the id-named directory.
    pub fn write_record<T: Serialize>(
        &self,
        kind: &str,
        id: &str,
        alias: Option<&str>,
        record: &T,
    ) -> Result<NormalizedPath> {
        let dir = self.resource_dir(kind, id);
        let native = dir.to_native();
        fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))?;

        if let Some(alias) = alias {
            self.link_alias(kind, alias, id)?;
        }

        io::write_json_pretty(&dir.join(DATA_FILE), record)?;
        Ok(dir)
    }

    /// Write the parsed settings document as `settings.json`.
    pub fn write_settings(&self, dir: &NormalizedPath, settings: &Value) -> Result<()> {
        io::write_json_pretty(&dir.join(SETTINGS_FILE), settings)
    }

    /// Write one extracted artifact as `settings.<property_path>.js`.
    pub fn write_artifact(
        &self,
        dir: &NormalizedPath,
        property_path: &str,
        content: &str,
    ) -> Result<()> {
        io::write_text(&dir.join(&artifact_file_name(property_path)), content)
    }

    /// Remove `settings.json`, if present.
    pub fn remove_settings(&self, dir: &NormalizedPath) -> Result<()> {
        remove_if_present(&dir.join(SETTINGS_FILE))
    }

    /// Delete every `settings.<path>.js` in `dir` whose path is not in `keep`.
    ///
    /// Returns the removed property paths.
    pub fn prune_artifacts(&self, dir: &NormalizedPath, keep: &[String]) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for (property_path, file) in list_artifacts(dir)? {
            if keep.contains(&property_path) {
                continue;
            }
            remove_if_present(&file)?;
            removed.push(property_path);
        }
        Ok(removed)
    }

    /// Point `<type>/<alias>` at the `<id>` directory.
    ///
    /// An existing alias path is left untouched, including one that now
    /// belongs to a different id or whose target has gone away.
    pub fn link_alias(&self, kind: &str, alias: &str, id: &str) -> Result<()> {
        let link = self.type_dir(kind).join(alias).to_native();
        if fs::symlink_metadata(&link).is_ok() {
            return Ok(());
        }

        match create_dir_link(id, &link) {
            Ok(()) => {
                tracing::debug!(alias, id, "Linked alias");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(Error::io(&link, e)),
        }
    }

    /// Read the resource `<kind>/<id>`.
    pub fn read_entry(&self, kind: &str, id: &str) -> Result<LocalEntry> {
        read_resource_dir(kind, self.resource_dir(kind, id))
    }

    /// Walk every id-named directory of the given resource types.
    ///
    /// Alias links and directories without `data.json` are skipped. Entries
    /// come back sorted by type order, then directory name.
    pub fn entries(&self, kinds: &[&str]) -> Result<Vec<LocalEntry>> {
        let mut entries = Vec::new();

        for kind in kinds {
            let type_dir = self.type_dir(kind);
            if !type_dir.is_dir() {
                continue;
            }

            let native = type_dir.to_native();
            let mut names = Vec::new();
            for item in fs::read_dir(&native).map_err(|e| Error::io(&native, e))? {
                let item = item.map_err(|e| Error::io(&native, e))?;
                let file_type = item.file_type().map_err(|e| Error::io(item.path(), e))?;
                if file_type.is_symlink() || !file_type.is_dir() {
                    continue;
                }
                names.push(item.file_name().to_string_lossy().into_owned());
            }
            names.sort();

            for name in names {
                let dir = type_dir.join(&name);
                if !dir.join(DATA_FILE).is_file() {
                    tracing::debug!(path = %dir, "Skipping directory without data.json");
                    continue;
                }
                entries.push(read_resource_dir(kind, dir)?);
            }
        }

        Ok(entries)
    }
}

fn read_resource_dir(kind: &str, dir: NormalizedPath) -> Result<LocalEntry> {
    let data_path = dir.join(DATA_FILE);
    if !data_path.is_file() {
        return Err(Error::MissingRecord {
            path: dir.to_native(),
        });
    }

    let mut record: Value = io::read_json(&data_path)?;
    fold_settings_artifacts(&dir, &mut record)?;

    let id = record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| dir.file_name().map(str::to_string))
        .unwrap_or_default();

    Ok(LocalEntry {
        kind: kind.to_string(),
        id,
        dir,
        record,
    })
}

/// Fold `settings.json` and `settings.<path>.js` edits back into
/// `attributes.settings`.
///
/// Artifacts take precedence over the same path in `settings.json`.
fn fold_settings_artifacts(dir: &NormalizedPath, record: &mut Value) -> Result<()> {
    let settings_path = dir.join(SETTINGS_FILE);
    let has_settings_file = settings_path.is_file();
    let artifacts = list_artifacts(dir)?;

    if !has_settings_file && artifacts.is_empty() {
        return Ok(());
    }

    let Some(attributes) = record.get_mut("attributes").and_then(Value::as_object_mut) else {
        return Ok(());
    };

    let mut settings: Value = if has_settings_file {
        io::read_json(&settings_path)?
    } else {
        match attributes.get("settings").and_then(Value::as_str) {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(parsed) => parsed,
                Err(_) => return Ok(()),
            },
            None => Value::Object(Map::new()),
        }
    };

    for (property_path, file) in artifacts {
        let text = io::read_text(&file)?;
        let body = unwrap_function_body(&text).unwrap_or(&text);
        set_path(&mut settings, &property_path, body);
    }

    let serialized =
        serde_json::to_string(&settings).map_err(|e| Error::json(settings_path.to_native(), e))?;
    attributes.insert("settings".to_string(), Value::String(serialized));
    Ok(())
}

fn remove_if_present(path: &NormalizedPath) -> Result<()> {
    let native = path.to_native();
    match fs::remove_file(&native) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(&native, e)),
    }
}

fn list_artifacts(dir: &NormalizedPath) -> Result<Vec<(String, NormalizedPath)>> {
    let native = dir.to_native();
    if !native.is_dir() {
        return Ok(Vec::new());
    }
    let mut artifacts = Vec::new();
    for item in fs::read_dir(&native).map_err(|e| Error::io(&native, e))? {
        let item = item.map_err(|e| Error::io(&native, e))?;
        let name = item.file_name().to_string_lossy().into_owned();
        if let Some(path) = property_path_of(&name) {
            artifacts.push((path.to_string(), dir.join(&name)));
        }
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Set `text` at a dotted path, creating intermediate objects.
///
/// Non-string values already at the path keep their JSON type when the text
/// still parses as JSON.
fn set_path(settings: &mut Value, property_path: &str, text: &str) {
    let mut segments: Vec<&str> = property_path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut cursor = settings;
    for segment in segments {
        let Some(object) = cursor.as_object_mut() else {
            return;
        };
        cursor = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let Some(object) = cursor.as_object_mut() else {
        return;
    };
    let value = match object.get(last) {
        Some(existing) if !existing.is_string() => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        _ => Value::String(text.to_string()),
    };
    object.insert(last.to_string(), value);
}

#[cfg(unix)]
fn create_dir_link(target: &str, link: &std::path::Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_dir_link(target: &str, link: &std::path::Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
