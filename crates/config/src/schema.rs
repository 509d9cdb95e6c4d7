//! Configuration schema. Every section falls back to its defaults, so an empty
//! file (or no file at all) yields a working client.

use std::time::Duration;

use {
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_CATALOG_URL: &str = "https://api.zuri.chat/marketplace";
pub const DEFAULT_ORGANIZATIONS_URL: &str = "https://api.zuri.chat";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BazaarConfig {
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub install: InstallConfig,
    pub session: SessionConfig,
}

/// Remote service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the marketplace catalog (`/plugins`, `/plugins/popular`, ...).
    pub catalog_url: String,
    /// Base URL of the organizations service (`/organizations/{id}/plugins`).
    pub organizations_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.into(),
            organizations_url: DEFAULT_ORGANIZATIONS_URL.into(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Plugins per page in every view.
    pub page_size: usize,
    /// A plugin is popular when its install count is strictly above this.
    pub popular_threshold: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 6,
            popular_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub timeout_ms: u64,
    /// How long the success message stays up before navigating.
    pub redirect_delay_ms: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            redirect_delay_ms: 5_000,
        }
    }
}

impl InstallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

/// Session inputs normally provided by the host. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub auth_token: Option<SecretString>,
}
