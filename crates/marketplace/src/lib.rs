//! Plugin marketplace client: catalog retrieval, paging, plugin detail and the
//! install workflow.
//!
//! The catalog comes from a remote marketplace service; installed plugins are
//! read from the organizations service for the session's workspace. Installs
//! are POSTed to each plugin's own endpoint and, on success, the host is
//! redirected through an injected [`Navigator`] after a short delay.

pub mod api;
pub mod catalog;
pub mod detail;
pub mod error;
pub mod marketplace;
pub mod pagination;
pub mod redirect;
pub mod session;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use {
    api::{HttpMarketplaceApi, MarketplaceApi},
    catalog::{CatalogFetcher, CatalogReport, FieldUpdate, KeepReason, filter_popular},
    detail::{DETAIL_ERROR_MESSAGE, load_detail},
    error::{MarketplaceError, Result},
    marketplace::{CatalogEntry, CatalogPage, Marketplace, MarketplaceSettings},
    pagination::{Page, Paginator, paginate},
    redirect::{Navigator, RedirectTask, RedirectWaiter},
    session::{IdentityProvider, Selection, Session, StaticIdentity, Ticket, UserRecord, resolve_user},
    types::{
        CatalogSnapshot, CatalogView, InstallRequest, InstallResponse, Plugin, PluginId,
        PREVIEW_IMAGE_LIMIT,
    },
    workflow::{
        INSTALL_FAILURE_MESSAGE, INSTALL_SUCCESS_MESSAGE, InstallOutcome, InstallWorkflow,
        ModalView, WorkflowPhase, WorkflowSettings,
    },
};
