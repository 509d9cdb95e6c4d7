//! Single-plugin detail loading.

use tracing::{debug, warn};

use crate::{
    api::MarketplaceApi,
    error::Result,
    types::{Plugin, PluginId},
};

/// Message shown when a detail record cannot be loaded, whatever the cause.
pub const DETAIL_ERROR_MESSAGE: &str = "Error Retrieving Plugin Data";

/// Fetch the full record for `id`.
pub async fn load_detail(api: &dyn MarketplaceApi, id: &PluginId) -> Result<Plugin> {
    let result = api.get_plugin(id).await;
    match &result {
        Ok(plugin) => debug!(plugin_id = %id, name = %plugin.name, "plugin detail loaded"),
        Err(e) => warn!(plugin_id = %id, error = %e, "failed to load plugin detail"),
    }

    #[cfg(feature = "metrics")]
    bazaar_metrics::counter!(
        bazaar_metrics::DETAIL_LOAD_TOTAL,
        "result" => if result.is_ok() { "ok" } else { "error" }
    )
    .increment(1);

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            error::MarketplaceError,
            testing::{FakeApi, plugin},
        },
    };

    #[tokio::test]
    async fn test_load_detail_returns_record() {
        let api = FakeApi::with_details(&[plugin("a", 3)]);
        let loaded = load_detail(&api, &PluginId::new("a")).await.unwrap();
        assert_eq!(loaded, plugin("a", 3));
    }

    #[tokio::test]
    async fn test_load_detail_propagates_rejection() {
        let api = FakeApi::default();
        let err = load_detail(&api, &PluginId::new("missing")).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::ServerRejection {
            status: Some(404),
            ..
        }));
    }
}
