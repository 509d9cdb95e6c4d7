//! Catalog fetcher: refreshes the all / popular / installed listings.

use std::{fmt, sync::Arc};

use {
    tokio::sync::RwLock,
    tracing::{debug, info, warn},
};

use crate::{
    api::MarketplaceApi,
    error::{MarketplaceError, Result},
    session::Session,
    types::{CatalogSnapshot, CatalogView, Plugin},
};

/// Keep only plugins installed more than `threshold` times.
pub fn filter_popular(plugins: Vec<Plugin>, threshold: u64) -> Vec<Plugin> {
    plugins
        .into_iter()
        .filter(|plugin| plugin.install_count > threshold)
        .collect()
}

/// What a refresh did to one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Replaced with this many plugins.
    Replaced(usize),
    /// Emptied because the session has no workspace or credential.
    Cleared,
    /// Left as it was.
    Kept(KeepReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepReason {
    /// The service answered with `data: null`.
    NoData,
    /// The service answered, but not with usable data.
    Rejected(String),
    /// No response at all.
    Unreachable(String),
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replaced(count) => write!(f, "{count} plugins"),
            Self::Cleared => write!(f, "cleared (no workspace session)"),
            Self::Kept(KeepReason::NoData) => write!(f, "unchanged (no data)"),
            Self::Kept(KeepReason::Rejected(e)) => write!(f, "unchanged ({e})"),
            Self::Kept(KeepReason::Unreachable(e)) => write!(f, "unchanged ({e})"),
        }
    }
}

/// Per-listing result of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    pub all: FieldUpdate,
    pub popular: FieldUpdate,
    pub installed: FieldUpdate,
}

impl CatalogReport {
    pub fn get(&self, view: CatalogView) -> &FieldUpdate {
        match view {
            CatalogView::All => &self.all,
            CatalogView::Popular => &self.popular,
            CatalogView::Installed => &self.installed,
        }
    }

    /// Every listing was refreshed (or legitimately cleared).
    pub fn is_complete(&self) -> bool {
        CatalogView::ALL
            .iter()
            .all(|view| matches!(self.get(*view), FieldUpdate::Replaced(_) | FieldUpdate::Cleared))
    }

    /// No attempted request got a response.
    fn nothing_reached(&self) -> bool {
        let attempted: Vec<_> = CatalogView::ALL
            .iter()
            .map(|view| self.get(*view))
            .filter(|update| !matches!(update, FieldUpdate::Cleared))
            .collect();
        !attempted.is_empty()
            && attempted
                .iter()
                .all(|update| matches!(update, FieldUpdate::Kept(KeepReason::Unreachable(_))))
    }
}

/// Fetches the three listings and applies each one to a snapshot as soon as
/// it arrives.
pub struct CatalogFetcher {
    api: Arc<dyn MarketplaceApi>,
    popular_threshold: u64,
}

impl CatalogFetcher {
    pub fn new(api: Arc<dyn MarketplaceApi>, popular_threshold: u64) -> Self {
        Self {
            api,
            popular_threshold,
        }
    }

    /// Refetch every listing into `snapshot`.
    ///
    /// A failing listing keeps its previous contents and does not stop the
    /// others. Fails with [`MarketplaceError::NetworkFailure`] only when no
    /// request got a response, in which case the snapshot is untouched.
    pub async fn refresh(
        &self,
        session: &Session,
        snapshot: &RwLock<CatalogSnapshot>,
    ) -> Result<CatalogReport> {
        let all = async {
            let result = self.api.list_plugins().await.map(Some);
            apply(snapshot, CatalogView::All, result).await
        };
        let popular = async {
            let result = self
                .api
                .list_popular()
                .await
                .map(|plugins| Some(filter_popular(plugins, self.popular_threshold)));
            apply(snapshot, CatalogView::Popular, result).await
        };
        let installed = async {
            match (session.workspace_id(), session.token()) {
                (Some(workspace_id), Some(token)) => {
                    let result = self.api.list_installed(workspace_id, token).await;
                    apply(snapshot, CatalogView::Installed, result).await
                },
                // Cleared only once the refresh is known to have succeeded.
                _ => FieldUpdate::Cleared,
            }
        };

        let (all, popular, installed) = tokio::join!(all, popular, installed);
        let report = CatalogReport {
            all,
            popular,
            installed,
        };

        if report.nothing_reached() {
            warn!("catalog refresh failed: marketplace unreachable");
            return Err(MarketplaceError::NetworkFailure(
                "no catalog endpoint could be reached".into(),
            ));
        }

        if report.installed == FieldUpdate::Cleared {
            debug!("no workspace session, clearing installed plugins");
            snapshot
                .write()
                .await
                .replace(CatalogView::Installed, Vec::new());
        }

        info!(
            all = %report.all,
            popular = %report.popular,
            installed = %report.installed,
            "catalog refreshed"
        );
        Ok(report)
    }
}

async fn apply(
    snapshot: &RwLock<CatalogSnapshot>,
    view: CatalogView,
    result: Result<Option<Vec<Plugin>>>,
) -> FieldUpdate {
    let update = match result {
        Ok(Some(plugins)) => {
            let count = plugins.len();
            snapshot.write().await.replace(view, plugins);
            debug!(%view, count, "catalog listing replaced");
            FieldUpdate::Replaced(count)
        },
        Ok(None) => {
            debug!(%view, "catalog listing returned no data, keeping previous");
            FieldUpdate::Kept(KeepReason::NoData)
        },
        Err(e) if e.is_network() => {
            warn!(%view, error = %e, "catalog listing unreachable, keeping previous");
            FieldUpdate::Kept(KeepReason::Unreachable(e.to_string()))
        },
        Err(e) => {
            warn!(%view, error = %e, "catalog listing failed, keeping previous");
            FieldUpdate::Kept(KeepReason::Rejected(e.to_string()))
        },
    };

    #[cfg(feature = "metrics")]
    {
        let outcome = match &update {
            FieldUpdate::Replaced(_) => "replaced",
            FieldUpdate::Cleared => "cleared",
            FieldUpdate::Kept(KeepReason::NoData) => "no_data",
            FieldUpdate::Kept(KeepReason::Rejected(_)) => "rejected",
            FieldUpdate::Kept(KeepReason::Unreachable(_)) => "unreachable",
        };
        bazaar_metrics::counter!(
            bazaar_metrics::CATALOG_FETCH_TOTAL,
            "view" => view.to_string(),
            "result" => outcome
        )
        .increment(1);
    }

    update
}
