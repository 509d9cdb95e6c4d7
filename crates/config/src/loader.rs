use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    tracing::{debug, info},
};

use crate::schema::BazaarConfig;

const CONFIG_FILE: &str = "bazaar.toml";

/// Default config location: `<platform config dir>/bazaar/bazaar.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "bazaar").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<BazaarConfig> {
    let config = match explicit {
        Some(path) => load_from(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_from(&path)?,
            None => {
                debug!("no config file found, using defaults");
                BazaarConfig::default()
            },
        },
    };
    validate(&config)?;
    Ok(config)
}

fn load_from(path: &Path) -> Result<BazaarConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config(&raw).with_context(|| format!("invalid config {}", path.display()))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse_config(raw: &str) -> Result<BazaarConfig> {
    Ok(toml::from_str(raw)?)
}

pub fn validate(config: &BazaarConfig) -> Result<()> {
    if config.catalog.page_size == 0 {
        bail!("catalog.page_size must be greater than zero");
    }
    if config.install.timeout_ms == 0 {
        bail!("install.timeout_ms must be greater than zero");
    }
    if config.api.request_timeout_secs == 0 {
        bail!("api.request_timeout_secs must be greater than zero");
    }
    for (key, url) in [
        ("api.catalog_url", &config.api.catalog_url),
        ("api.organizations_url", &config.api.organizations_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("{key} must be an http(s) URL, got {url:?}");
        }
    }
    Ok(())
}
