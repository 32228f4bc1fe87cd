//! Command context: settings, credentials and the engine built from them

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reactor_client::{ClientConfig, ReactorClient};
use reactor_core::{EngineOptions, ReactorSettings, SyncEngine};
use reactor_fs::{LocalStore, NormalizedPath};

use crate::error::{CliError, Result};

/// Validated settings plus the location of the property checkout
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: ReactorSettings,
    /// `<cwd>/<propertyId>`
    pub property_root: PathBuf,
}

impl Context {
    /// Load and validate the settings file; relative paths resolve against `cwd`.
    pub fn load(cwd: &Path, settings_path: &Path) -> Result<Self> {
        let path = resolve(cwd, settings_path);
        let settings = ReactorSettings::load(&path)?;
        let property_root = cwd.join(&settings.property_id);
        tracing::debug!(settings = %path.display(), root = %property_root.display(), "Loaded settings");
        Ok(Self {
            settings,
            property_root,
        })
    }

    /// Bearer token from the command line or environment, else the settings file.
    pub fn access_token<'a>(&'a self, cli_token: Option<&'a str>) -> Result<&'a str> {
        cli_token
            .or(self.settings.access_token.as_deref())
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                CliError::user(
                    "no access token: pass --access-token, set REACTOR_ACCESS_TOKEN, or add accessToken to the settings file",
                )
            })
    }

    /// Build the engine for this property, creating its directory if needed.
    pub fn engine(&self, cli_token: Option<&str>, batch_size: usize) -> Result<SyncEngine> {
        let token = self.access_token(cli_token)?;
        let client = ReactorClient::new(ClientConfig::from_settings(&self.settings, token)?)?;

        fs::create_dir_all(&self.property_root)?;
        let store = LocalStore::new(NormalizedPath::new(&self.property_root));
        let options = EngineOptions::default().with_batch_size(batch_size);

        Ok(SyncEngine::new(
            Arc::new(client),
            store,
            self.settings.property_id.clone(),
            options,
        ))
    }
}

pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
