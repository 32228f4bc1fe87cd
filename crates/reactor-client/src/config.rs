//! Client configuration

use std::time::Duration;

use reactor_core::{Error, ReactorSettings};

/// Production endpoint of the Reactor API
pub const DEFAULT_REACTOR_URL: &str = "https://reactor.adobe.io";

/// Connection settings for [`crate::ReactorClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Bearer token sent with every request
    pub access_token: String,
    /// Integration client id, sent as `x-api-key`
    pub api_key: String,
    /// Organization id, sent as `x-gw-ims-org-id` when present
    pub org_id: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_key: String::new(),
            org_id: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Derive a configuration from validated settings and a bearer token.
    pub fn from_settings(
        settings: &ReactorSettings,
        access_token: impl Into<String>,
    ) -> reactor_core::Result<Self> {
        let api_key = settings
            .client_id()
            .ok_or_else(|| Error::config(
                "settings file does not have an \"integration.clientId\" property.",
            ))?;
        let mut config = Self::new(
            settings.reactor_url().unwrap_or(DEFAULT_REACTOR_URL),
            access_token,
        );
        config.api_key = api_key.to_string();
        config.org_id = settings.org_id().map(str::to_string);
        Ok(config)
    }
}
