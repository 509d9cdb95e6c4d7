//! In-process fakes shared by the unit tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    serde_json::json,
    tokio::sync::{Notify, oneshot},
};

use crate::{
    api::MarketplaceApi,
    error::{MarketplaceError, Result},
    redirect::Navigator,
    types::{InstallRequest, InstallResponse, Plugin, PluginId},
};

pub fn plugin_json(id: &str, installs: u64) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Plugin {id}"),
        "icon_url": "https://cdn.example.com/icon.png",
        "images": ["a.png", "b.png", "c.png", "d.png"],
        "description": "Does things",
        "install_count": installs,
        "version": "1.0.0",
        "developer_name": "Acme",
        "created_at": "2021-09-01T10:00:00Z",
        "updated_at": "2021-09-12T08:30:00Z",
        "install_url": format!("https://plugins.example.com/{id}/install"),
    })
}

pub fn plugin(id: &str, installs: u64) -> Plugin {
    serde_json::from_value(plugin_json(id, installs)).unwrap()
}

pub fn data_body(data: serde_json::Value) -> String {
    json!({ "data": data }).to_string()
}

/// Canned answer for a listing endpoint.
#[derive(Debug, Clone)]
pub enum Listing {
    Ok(Vec<Plugin>),
    Null,
    Rejected(u16),
    Unreachable,
}

impl Listing {
    fn resolve(&self) -> Result<Option<Vec<Plugin>>> {
        match self {
            Self::Ok(plugins) => Ok(Some(plugins.clone())),
            Self::Null => Ok(None),
            Self::Rejected(status) => Err(MarketplaceError::ServerRejection {
                status: Some(*status),
                message: None,
            }),
            Self::Unreachable => Err(MarketplaceError::NetworkFailure("connection refused".into())),
        }
    }
}

/// Canned answer for the install endpoint.
#[derive(Debug, Clone)]
pub enum InstallReply {
    Body(InstallResponse),
    Rejected(u16, Option<String>),
    Unreachable,
}

impl InstallReply {
    pub fn success(redirect_url: &str) -> Self {
        Self::Body(
            serde_json::from_value(json!({
                "success": true,
                "data": {"redirect_url": redirect_url}
            }))
            .unwrap(),
        )
    }

    pub fn failure(message: &str) -> Self {
        Self::Body(
            serde_json::from_value(json!({"success": false, "message": message})).unwrap(),
        )
    }
}

/// Scriptable [`MarketplaceApi`]. Detail and install calls can be held open
/// with gates to interleave responses deterministically.
pub struct FakeApi {
    pub all: Mutex<Listing>,
    pub popular: Mutex<Listing>,
    pub installed: Mutex<Listing>,
    pub details: Mutex<HashMap<String, Plugin>>,
    detail_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub detail_started: Notify,
    pub install_reply: Mutex<InstallReply>,
    install_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub install_started: Notify,
    pub install_calls: AtomicUsize,
    pub installed_calls: AtomicUsize,
    pub last_install: Mutex<Option<(String, InstallRequest, Option<String>)>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            all: Mutex::new(Listing::Ok(Vec::new())),
            popular: Mutex::new(Listing::Ok(Vec::new())),
            installed: Mutex::new(Listing::Ok(Vec::new())),
            details: Mutex::new(HashMap::new()),
            detail_gates: Mutex::new(HashMap::new()),
            detail_started: Notify::new(),
            install_reply: Mutex::new(InstallReply::success("/done")),
            install_gate: Mutex::new(None),
            install_started: Notify::new(),
            install_calls: AtomicUsize::new(0),
            installed_calls: AtomicUsize::new(0),
            last_install: Mutex::new(None),
        }
    }
}

impl FakeApi {
    pub fn with_details(plugins: &[Plugin]) -> Self {
        let api = Self::default();
        {
            let mut details = api.details.lock().unwrap();
            for plugin in plugins {
                details.insert(plugin.id.to_string(), plugin.clone());
            }
        }
        api
    }

    /// Hold the next detail request for `id` until the returned sender fires
    /// (or is dropped).
    pub fn gate_detail(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.detail_gates.lock().unwrap().insert(id.to_string(), rx);
        tx
    }

    pub fn gate_install(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.install_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_install_reply(&self, reply: InstallReply) {
        *self.install_reply.lock().unwrap() = reply;
    }

    pub fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketplaceApi for FakeApi {
    async fn list_plugins(&self) -> Result<Vec<Plugin>> {
        let listing = self.all.lock().unwrap().clone();
        listing.resolve().map(Option::unwrap_or_default)
    }

    async fn list_popular(&self) -> Result<Vec<Plugin>> {
        let listing = self.popular.lock().unwrap().clone();
        listing.resolve().map(Option::unwrap_or_default)
    }

    async fn list_installed(&self, _workspace_id: &str, _token: &str) -> Result<Option<Vec<Plugin>>> {
        self.installed_calls.fetch_add(1, Ordering::SeqCst);
        let listing = self.installed.lock().unwrap().clone();
        listing.resolve()
    }

    async fn get_plugin(&self, id: &PluginId) -> Result<Plugin> {
        let gate = self.detail_gates.lock().unwrap().remove(id.as_str());
        self.detail_started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.details
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or(MarketplaceError::ServerRejection {
                status: Some(404),
                message: Some("plugin not found".into()),
            })
    }

    async fn install(
        &self,
        install_url: &str,
        request: &InstallRequest,
        token: Option<&str>,
    ) -> Result<InstallResponse> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_install.lock().unwrap() = Some((
            install_url.to_string(),
            request.clone(),
            token.map(str::to_string),
        ));
        let gate = self.install_gate.lock().unwrap().take();
        self.install_started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.install_reply.lock().unwrap().clone() {
            InstallReply::Body(body) => Ok(body),
            InstallReply::Rejected(status, message) => Err(MarketplaceError::ServerRejection {
                status: Some(status),
                message,
            }),
            InstallReply::Unreachable => {
                Err(MarketplaceError::NetworkFailure("connection reset".into()))
            },
        }
    }
}

/// [`Navigator`] that records every target.
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }
}
