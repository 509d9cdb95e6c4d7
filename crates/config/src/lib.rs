//! Configuration for the bazaar client: endpoints, paging, install timing and
//! optional session inputs, read from `bazaar.toml`.

pub mod loader;
pub mod schema;

pub use {
    loader::{default_config_path, load_config, parse_config},
    schema::{ApiConfig, BazaarConfig, CatalogConfig, InstallConfig, SessionConfig},
};
