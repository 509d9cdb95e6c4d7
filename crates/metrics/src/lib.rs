//! Metric names shared by the bazaar crates.
//!
//! Crates depend on this one behind their own `metrics` feature and record
//! through the re-exported `metrics` macros, so a build without the feature
//! carries no instrumentation at all.

pub use metrics::{counter, histogram};

/// Catalog sub-fetch results, labelled by `view` and `result`.
pub const CATALOG_FETCH_TOTAL: &str = "bazaar_catalog_fetch_total";
/// Detail loads, labelled by `result`.
pub const DETAIL_LOAD_TOTAL: &str = "bazaar_detail_load_total";
/// Install attempts that reached the endpoint, labelled by `result`.
pub const INSTALL_TOTAL: &str = "bazaar_install_total";
/// Install round-trip time in seconds.
pub const INSTALL_DURATION_SECONDS: &str = "bazaar_install_duration_seconds";
/// Responses dropped because their selection was superseded.
pub const STALE_RESPONSE_TOTAL: &str = "bazaar_stale_response_total";

/// Register descriptions with whatever recorder is installed.
pub fn describe() {
    metrics::describe_counter!(CATALOG_FETCH_TOTAL, "Catalog sub-fetches by view and result");
    metrics::describe_counter!(DETAIL_LOAD_TOTAL, "Plugin detail loads by result");
    metrics::describe_counter!(INSTALL_TOTAL, "Plugin install attempts by result");
    metrics::describe_histogram!(
        INSTALL_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Plugin install request duration"
    );
    metrics::describe_counter!(
        STALE_RESPONSE_TOTAL,
        "Responses discarded because the selection changed"
    );
    tracing::debug!("metric descriptions registered");
}

/// Install a Prometheus recorder and return the handle used to render it.
#[cfg(feature = "prometheus")]
pub fn install_prometheus() -> anyhow::Result<metrics_exporter_prometheus::PrometheusHandle> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    describe();
    tracing::info!("prometheus metrics recorder installed");
    Ok(handle)
}
