//! The marketplace context shared by a host: catalog snapshot, per-view
//! paging, session and the install workflow.

use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use {
    bazaar_config::BazaarConfig,
    tokio::sync::{Mutex, RwLock},
    tracing::info,
};

use crate::{
    api::{HttpMarketplaceApi, MarketplaceApi},
    catalog::{CatalogFetcher, CatalogReport},
    error::{MarketplaceError, Result},
    pagination::Paginator,
    redirect::Navigator,
    session::{IdentityProvider, Session, resolve_user},
    types::{CatalogSnapshot, CatalogView, Plugin, PluginId},
    workflow::{InstallOutcome, InstallWorkflow, ModalView, WorkflowSettings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketplaceSettings {
    pub page_size: NonZeroUsize,
    pub popular_threshold: u64,
    pub workflow: WorkflowSettings,
}

impl Default for MarketplaceSettings {
    fn default() -> Self {
        Self {
            page_size: NonZeroUsize::new(6).unwrap_or(NonZeroUsize::MIN),
            popular_threshold: 10,
            workflow: WorkflowSettings::default(),
        }
    }
}

impl MarketplaceSettings {
    pub fn from_config(config: &BazaarConfig) -> Result<Self> {
        let page_size = NonZeroUsize::new(config.catalog.page_size).ok_or_else(|| {
            MarketplaceError::InvalidConfig("catalog.page_size must be greater than 0".into())
        })?;
        Ok(Self {
            page_size,
            popular_threshold: config.catalog.popular_threshold,
            workflow: WorkflowSettings::from_config(&config.install),
        })
    }
}

/// A plugin as shown in a catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub plugin: Plugin,
    /// Installed in the session's workspace.
    pub installed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub view: CatalogView,
    pub entries: Vec<CatalogEntry>,
    pub page_index: usize,
    pub page_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Shared marketplace state. Cheap to put behind an `Arc`; every method
/// takes `&self`.
pub struct Marketplace {
    session: Arc<RwLock<Session>>,
    snapshot: RwLock<CatalogSnapshot>,
    pages: Mutex<HashMap<CatalogView, Paginator>>,
    page_size: NonZeroUsize,
    fetcher: CatalogFetcher,
    workflow: InstallWorkflow,
}

impl Marketplace {
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        navigator: Arc<dyn Navigator>,
        session: Session,
        settings: MarketplaceSettings,
    ) -> Self {
        let session = Arc::new(RwLock::new(session));
        Self {
            fetcher: CatalogFetcher::new(Arc::clone(&api), settings.popular_threshold),
            workflow: InstallWorkflow::new(
                api,
                navigator,
                Arc::clone(&session),
                settings.workflow,
            ),
            session,
            snapshot: RwLock::new(CatalogSnapshot::default()),
            pages: Mutex::new(HashMap::new()),
            page_size: settings.page_size,
        }
    }

    /// Build an HTTP-backed marketplace from configuration.
    pub fn from_config(config: &BazaarConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let settings = MarketplaceSettings::from_config(config)?;
        let api = Arc::new(HttpMarketplaceApi::new(&config.api)?);
        Ok(Self::new(
            api,
            navigator,
            Session::from_config(&config.session),
            settings,
        ))
    }

    // Catalog

    pub async fn refresh_catalog(&self) -> Result<CatalogReport> {
        let session = self.session.read().await.clone();
        let report = self.fetcher.refresh(&session, &self.snapshot).await?;

        let snapshot = self.snapshot.read().await;
        let mut pages = self.pages.lock().await;
        for view in CatalogView::ALL {
            self.paginator(&mut pages, view)
                .sync(snapshot.view(view).len());
        }
        Ok(report)
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn is_installed(&self, id: &PluginId) -> bool {
        self.snapshot.read().await.is_installed(id)
    }

    /// The current page of `view`, each entry tagged with its installed state.
    pub async fn page(&self, view: CatalogView) -> CatalogPage {
        let snapshot = self.snapshot.read().await;
        let mut pages = self.pages.lock().await;
        let paginator = self.paginator(&mut pages, view);
        let page = paginator.page(snapshot.view(view));
        CatalogPage {
            view,
            entries: page
                .items
                .iter()
                .map(|plugin| CatalogEntry {
                    installed: snapshot.is_installed(&plugin.id),
                    plugin: plugin.clone(),
                })
                .collect(),
            page_index: page.page_index,
            page_count: page.page_count,
            has_next: paginator.has_next(),
            has_previous: paginator.has_previous(),
        }
    }

    /// Jump to page `index` of `view`, clamped. Returns the resulting index.
    pub async fn go_to_page(&self, view: CatalogView, index: usize) -> usize {
        self.navigate(view, |paginator| paginator.go_to(index)).await
    }

    pub async fn next_page(&self, view: CatalogView) -> usize {
        self.navigate(view, Paginator::next_page).await
    }

    pub async fn previous_page(&self, view: CatalogView) -> usize {
        self.navigate(view, Paginator::previous_page).await
    }

    async fn navigate(&self, view: CatalogView, step: impl FnOnce(&mut Paginator) -> usize) -> usize {
        let len = self.snapshot.read().await.view(view).len();
        let mut pages = self.pages.lock().await;
        let paginator = self.paginator(&mut pages, view);
        paginator.sync(len);
        step(paginator)
    }

    fn paginator<'a>(
        &self,
        pages: &'a mut HashMap<CatalogView, Paginator>,
        view: CatalogView,
    ) -> &'a mut Paginator {
        pages
            .entry(view)
            .or_insert_with(|| Paginator::new(self.page_size))
    }

    // Modal

    pub async fn select(&self, plugin_id: Option<PluginId>) -> Result<ModalView> {
        self.workflow.select(plugin_id).await
    }

    pub async fn dismiss(&self) -> ModalView {
        self.workflow.dismiss().await
    }

    pub async fn install(&self) -> Result<InstallOutcome> {
        self.workflow.install().await
    }

    pub async fn modal(&self) -> ModalView {
        self.workflow.view().await
    }

    pub async fn wait_for_redirect(&self) -> bool {
        self.workflow.wait_for_redirect().await
    }

    /// Cancel pending redirects and orphan in-flight requests.
    pub async fn teardown(&self) {
        self.workflow.teardown().await;
    }

    // Session

    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = session;
        info!("session replaced");
    }

    /// Adopt the current user from `identity`. See [`resolve_user`].
    pub async fn resolve_user(&self, identity: &dyn IdentityProvider) -> bool {
        let mut resolved = self.session.read().await.clone();
        if !resolve_user(&mut resolved, identity).await {
            return false;
        }
        match resolved.user_id() {
            Some(user_id) => {
                self.session.write().await.set_user(user_id.to_string());
                true
            },
            None => false,
        }
    }

    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.user_id().map(str::to_string)
    }
}
