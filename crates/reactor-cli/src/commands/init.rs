//! Init command implementation
//!
//! Writes a settings file and creates the property directory.

use std::fs;
use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use reactor_core::config::{Environment, Integration, ReactorSettings};

use crate::context::resolve;
use crate::error::{CliError, Result};

/// Values for a new settings file
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub property_id: String,
    pub reactor_url: String,
    pub jwt: Option<String>,
    pub oauth: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub org_id: Option<String>,
    pub force: bool,
}

/// Run the init command
pub fn run_init(cwd: &Path, settings_path: &Path, options: InitOptions) -> Result<()> {
    let path = resolve(cwd, settings_path);
    if path.exists() && !options.force {
        return Err(CliError::user(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    let mut integration = Integration {
        client_id: Some(options.client_id),
        client_secret: Some(options.client_secret),
        ..Default::default()
    };
    if let Some(org_id) = options.org_id {
        integration
            .extra
            .insert("orgId".to_string(), Value::String(org_id));
    }
    let settings = ReactorSettings {
        property_id: options.property_id,
        environment: Some(Environment {
            reactor_url: Some(options.reactor_url),
            jwt: options.jwt,
            oauth: options.oauth,
        }),
        integration: Some(integration),
        access_token: None,
    };
    settings.validate()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(&settings)?;
    content.push('\n');
    fs::write(&path, content)?;

    let root = cwd.join(&settings.property_id);
    fs::create_dir_all(&root)?;

    println!(
        "{} Wrote {} for property {}",
        "OK".green().bold(),
        path.display().to_string().cyan(),
        settings.property_id.yellow()
    );
    println!("Run {} to check it out.", "reactor-sync pull".cyan());
    Ok(())
}
