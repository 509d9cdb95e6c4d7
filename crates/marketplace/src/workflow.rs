//! Selection-driven detail loading and the install state machine.
//!
//! ```text
//! Idle -> Loading -> Ready -> Installing -> Succeeded | Failed
//!            \
//!             -> Failed
//! ```
//!
//! Every selection change issues a new [`Ticket`](crate::session::Ticket).
//! Detail and install calls hold the ticket they started under and only
//! apply their result if it is still current; otherwise they report
//! [`MarketplaceError::StaleResponse`] and leave the state alone.

use std::{fmt, sync::Arc, time::Duration};

use {
    bazaar_config::InstallConfig,
    secrecy::{ExposeSecret, SecretString},
    serde::Serialize,
    tokio::sync::{Mutex, RwLock},
    tracing::{debug, error, info, warn},
};

use crate::{
    api::MarketplaceApi,
    detail::{DETAIL_ERROR_MESSAGE, load_detail},
    error::{MarketplaceError, Result},
    redirect::{Navigator, RedirectTask},
    session::{Selection, Session},
    types::{InstallRequest, Plugin, PluginId},
};

pub const INSTALL_SUCCESS_MESSAGE: &str = "Plugin Installed Successfully. Redirecting...";
/// Used when an install fails without a server-supplied message.
pub const INSTALL_FAILURE_MESSAGE: &str = "Plugin could not be installed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// Detail request in flight.
    Loading,
    /// Detail loaded, install allowed.
    Ready,
    Installing,
    Succeeded,
    Failed,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Installing => write!(f, "installing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// User-visible result of the current interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// An empty message is the initial (cleared) state.
    Pending { message: String },
    Success {
        redirect_url: Option<String>,
        message: String,
    },
    Failure { message: String },
}

impl InstallOutcome {
    pub fn cleared() -> Self {
        Self::Pending {
            message: String::new(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Pending { message } | Self::Success { message, .. } | Self::Failure { message } => {
                message
            },
        }
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Pending { message } if message.is_empty())
    }
}

impl Default for InstallOutcome {
    fn default() -> Self {
        Self::cleared()
    }
}

/// Snapshot of the modal for a host to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub plugin_id: Option<PluginId>,
    pub phase: WorkflowPhase,
    pub plugin: Option<Plugin>,
    pub outcome: InstallOutcome,
    /// Pre-flight notice, e.g. a missing workspace session.
    pub notice: Option<String>,
}

impl ModalView {
    pub fn is_install_enabled(&self) -> bool {
        self.phase == WorkflowPhase::Ready && self.plugin.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Upper bound on the install request.
    pub install_timeout: Duration,
    /// How long the success message is shown before navigating.
    pub redirect_delay: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&InstallConfig::default())
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &InstallConfig) -> Self {
        Self {
            install_timeout: config.timeout(),
            redirect_delay: config.redirect_delay(),
        }
    }
}

#[derive(Default)]
struct ModalState {
    selection: Selection,
    phase: WorkflowPhase,
    plugin: Option<Plugin>,
    outcome: InstallOutcome,
    notice: Option<String>,
    redirect: Option<RedirectTask>,
}

impl ModalState {
    /// Back to a blank modal. Dropping the redirect task cancels it.
    fn reset(&mut self) {
        if let Some(redirect) = self.redirect.take() {
            redirect.cancel();
            debug!(url = %redirect.url(), "pending redirect cancelled");
        }
        self.phase = WorkflowPhase::Idle;
        self.plugin = None;
        self.outcome = InstallOutcome::cleared();
        self.notice = None;
    }

    fn view(&self) -> ModalView {
        ModalView {
            plugin_id: self.selection.plugin_id().cloned(),
            phase: self.phase,
            plugin: self.plugin.clone(),
            outcome: self.outcome.clone(),
            notice: self.notice.clone(),
        }
    }
}

/// Drives one modal: select a plugin, load its detail, install it and
/// redirect on success.
pub struct InstallWorkflow {
    api: Arc<dyn MarketplaceApi>,
    navigator: Arc<dyn Navigator>,
    session: Arc<RwLock<Session>>,
    settings: WorkflowSettings,
    state: Mutex<ModalState>,
}

impl InstallWorkflow {
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        navigator: Arc<dyn Navigator>,
        session: Arc<RwLock<Session>>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            api,
            navigator,
            session,
            settings,
            state: Mutex::new(ModalState::default()),
        }
    }

    pub async fn view(&self) -> ModalView {
        self.state.lock().await.view()
    }

    /// Change the selection and load the new plugin's detail.
    ///
    /// Re-selecting the current plugin is a no-op. `None` behaves like
    /// [`dismiss`](Self::dismiss). A detail failure is reported through the
    /// returned view (phase `Failed`), not as an error.
    pub async fn select(&self, plugin_id: Option<PluginId>) -> Result<ModalView> {
        let (ticket, id) = {
            let mut state = self.state.lock().await;
            let Some(ticket) = state.selection.set(plugin_id.clone()) else {
                return Ok(state.view());
            };
            state.reset();
            let Some(id) = plugin_id else {
                info!("plugin selection cleared");
                return Ok(state.view());
            };
            info!(plugin_id = %id, "plugin selected");
            state.phase = WorkflowPhase::Loading;
            (ticket, id)
        };

        let result = load_detail(self.api.as_ref(), &id).await;

        let mut state = self.state.lock().await;
        if !state.selection.is_current(ticket) {
            record_stale("detail");
            debug!(plugin_id = %id, "discarding detail for superseded selection");
            return Err(MarketplaceError::StaleResponse);
        }
        match result {
            Ok(plugin) => {
                state.plugin = Some(plugin);
                state.phase = WorkflowPhase::Ready;
            },
            Err(_) => {
                state.phase = WorkflowPhase::Failed;
                state.outcome = InstallOutcome::Failure {
                    message: DETAIL_ERROR_MESSAGE.into(),
                };
            },
        }
        Ok(state.view())
    }

    /// Close the modal: clear the selection and outcome, cancel any pending
    /// redirect and orphan in-flight requests.
    pub async fn dismiss(&self) -> ModalView {
        let mut state = self.state.lock().await;
        if state.selection.set(None).is_some() {
            info!("plugin modal dismissed");
        }
        state.reset();
        state.view()
    }

    /// Install the loaded plugin into the session's workspace.
    ///
    /// Pre-flight failures (`NothingSelected`, `InstallInProgress`,
    /// `InvalidPhase`, `MissingSession`) issue no request. Once the request
    /// is sent, server and transport failures come back as
    /// `Ok(InstallOutcome::Failure)` with the workflow in `Failed`.
    pub async fn install(&self) -> Result<InstallOutcome> {
        let (ticket, plugin, request, token) = {
            let mut state = self.state.lock().await;
            if state.selection.plugin_id().is_none() {
                return Err(MarketplaceError::NothingSelected);
            }
            match state.phase {
                WorkflowPhase::Ready => {},
                WorkflowPhase::Installing => {
                    debug!("install already in progress, ignoring");
                    return Err(MarketplaceError::InstallInProgress);
                },
                phase => return Err(MarketplaceError::InvalidPhase(phase)),
            }
            let Some(plugin) = state.plugin.clone() else {
                return Err(MarketplaceError::InvalidPhase(state.phase));
            };

            let session = self.session.read().await;
            let Some(workspace_id) = session.workspace_id() else {
                warn!(plugin_id = %plugin.id, "install blocked: no workspace session");
                state.notice = Some(MarketplaceError::MissingSession.to_string());
                return Err(MarketplaceError::MissingSession);
            };
            let request = InstallRequest {
                user_id: session.user_id().map(str::to_string),
                organisation_id: workspace_id.to_string(),
            };
            let token = session.token().map(|t| SecretString::new(t.to_string()));
            drop(session);

            state.notice = None;
            state.phase = WorkflowPhase::Installing;
            (state.selection.ticket(), plugin, request, token)
        };

        info!(
            plugin_id = %plugin.id,
            organisation_id = %request.organisation_id,
            "installing plugin"
        );
        #[cfg(feature = "metrics")]
        let started = tokio::time::Instant::now();

        let token = token.as_ref().map(|t| t.expose_secret().as_str());
        let result = match tokio::time::timeout(
            self.settings.install_timeout,
            self.api.install(&plugin.install_url, &request, token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(MarketplaceError::NetworkFailure(format!(
                "install timed out after {}ms",
                self.settings.install_timeout.as_millis()
            ))),
        };

        #[cfg(feature = "metrics")]
        bazaar_metrics::histogram!(bazaar_metrics::INSTALL_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let mut state = self.state.lock().await;
        if !state.selection.is_current(ticket) {
            record_stale("install");
            debug!(plugin_id = %plugin.id, "discarding install result for superseded selection");
            return Err(MarketplaceError::StaleResponse);
        }

        let outcome = match result {
            Ok(response) if response.success => {
                let redirect_url = response.redirect_url().map(str::to_string);
                match &redirect_url {
                    Some(url) => {
                        state.redirect = Some(RedirectTask::schedule(
                            Arc::clone(&self.navigator),
                            url.clone(),
                            self.settings.redirect_delay,
                        ));
                    },
                    None => warn!(plugin_id = %plugin.id, "install succeeded without a redirect target"),
                }
                info!(plugin_id = %plugin.id, "plugin installed");
                state.phase = WorkflowPhase::Succeeded;
                InstallOutcome::Success {
                    redirect_url,
                    message: INSTALL_SUCCESS_MESSAGE.into(),
                }
            },
            Ok(response) => {
                let message = response.message().unwrap_or(INSTALL_FAILURE_MESSAGE).to_string();
                error!(plugin_id = %plugin.id, %message, "plugin install rejected");
                state.phase = WorkflowPhase::Failed;
                InstallOutcome::Failure { message }
            },
            Err(e) => {
                let message = e.server_message().unwrap_or(INSTALL_FAILURE_MESSAGE).to_string();
                error!(plugin_id = %plugin.id, error = %e, "plugin install failed");
                state.phase = WorkflowPhase::Failed;
                InstallOutcome::Failure { message }
            },
        };

        #[cfg(feature = "metrics")]
        bazaar_metrics::counter!(
            bazaar_metrics::INSTALL_TOTAL,
            "result" => if state.phase == WorkflowPhase::Succeeded { "success" } else { "failure" }
        )
        .increment(1);

        state.outcome = outcome.clone();
        Ok(outcome)
    }

    /// Host is going away: same effect as dismissing.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        state.selection.set(None);
        state.selection.invalidate();
        state.reset();
        debug!("install workflow torn down");
    }

    /// Wait for the pending redirect to resolve. Returns whether it navigated;
    /// `false` when none is pending or it was cancelled while waiting.
    pub async fn wait_for_redirect(&self) -> bool {
        let waiter = self.state.lock().await.redirect.as_ref().map(RedirectTask::waiter);
        match waiter {
            Some(waiter) => waiter.wait().await,
            None => false,
        }
    }
}

fn record_stale(kind: &'static str) {
    #[cfg(feature = "metrics")]
    bazaar_metrics::counter!(bazaar_metrics::STALE_RESPONSE_TOTAL, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
