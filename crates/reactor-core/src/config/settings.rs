//! The settings file (`.reactor-settings.json`)
//!
//! Consumed, never written, by the engine. Validation happens before any
//! remote call so configuration mistakes fail fast.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Default settings location, relative to the working directory
pub const DEFAULT_SETTINGS_PATH: &str = "./.reactor-settings.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactor_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Remaining integration keys (org id, scopes, payload, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorSettings {
    #[serde(default)]
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<Integration>,
    /// Pre-issued bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl ReactorSettings {
    /// Read and validate a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::SettingsNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let settings: ReactorSettings = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("settings file {} is not valid: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the fields the engine and client depend on.
    pub fn validate(&self) -> Result<()> {
        if self.property_id.trim().is_empty() {
            return Err(Error::config("settings file does not have a \"propertyId\" property."));
        }

        let environment = self.environment.as_ref().ok_or_else(|| {
            Error::config("settings file does not have an \"environment\" property.")
        })?;
        if is_blank(&environment.reactor_url) {
            return Err(Error::config(
                "settings file does not have an \"environment.reactorUrl\" property.",
            ));
        }
        if is_blank(&environment.jwt) && is_blank(&environment.oauth) {
            return Err(Error::config(
                "settings file does not have an \"environment.(jwt|oauth)\" property.",
            ));
        }

        let integration = self.integration.as_ref().ok_or_else(|| {
            Error::config("settings file does not have an \"integration\" property.")
        })?;
        if is_blank(&integration.client_id) {
            return Err(Error::config(
                "settings file does not have an \"integration.clientId\" property.",
            ));
        }
        if is_blank(&integration.client_secret) {
            return Err(Error::config(
                "settings file does not have an \"integration.clientSecret\" property.",
            ));
        }

        Ok(())
    }

    pub fn reactor_url(&self) -> Option<&str> {
        self.environment.as_ref()?.reactor_url.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.integration.as_ref()?.client_id.as_deref()
    }

    /// Organization id, when the integration declares one.
    pub fn org_id(&self) -> Option<&str> {
        self.integration.as_ref()?.extra.get("orgId")?.as_str()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
