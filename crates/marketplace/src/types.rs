//! Catalog records and the wire envelopes they arrive in.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Canonical plugin identifier.
///
/// The catalog service is inconsistent about whether it sends `id` or `_id`;
/// [`Plugin`] deserialization folds both into this one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PluginId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A marketplace listing. Immutable once fetched; a refetch replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlugin")]
pub struct Plugin {
    pub id: PluginId,
    pub name: String,
    pub icon_url: String,
    pub images: Vec<String>,
    pub description: String,
    pub install_count: u64,
    pub version: String,
    pub developer_name: String,
    pub created_at: String,
    pub updated_at: String,
    /// Plugin-owned endpoint that performs the installation.
    pub install_url: String,
}

/// Number of gallery images shown in a detail view.
pub const PREVIEW_IMAGE_LIMIT: usize = 3;

impl Plugin {
    /// Date part (`YYYY-MM-DD`) of `created_at`.
    pub fn created_on(&self) -> &str {
        date_part(&self.created_at)
    }

    /// Date part (`YYYY-MM-DD`) of `updated_at`.
    pub fn updated_on(&self) -> &str {
        date_part(&self.updated_at)
    }

    pub fn preview_images(&self) -> &[String] {
        &self.images[..self.images.len().min(PREVIEW_IMAGE_LIMIT)]
    }
}

fn date_part(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

/// Plugin as sent by the server: either id field, nullable everything else.
#[derive(Deserialize)]
struct RawPlugin {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    legacy_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    install_count: Option<u64>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    developer_name: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    install_url: Option<String>,
}

impl TryFrom<RawPlugin> for Plugin {
    type Error = String;

    fn try_from(raw: RawPlugin) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .or(raw.legacy_id.filter(|id| !id.is_empty()))
            .ok_or_else(|| "plugin record has neither `id` nor `_id`".to_string())?;

        Ok(Self {
            id: PluginId(id),
            name: raw.name.unwrap_or_default(),
            icon_url: raw.icon_url.unwrap_or_default(),
            images: raw.images.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            install_count: raw.install_count.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            developer_name: raw.developer_name.unwrap_or_default(),
            created_at: raw.created_at.unwrap_or_default(),
            updated_at: raw.updated_at.unwrap_or_default(),
            install_url: raw.install_url.unwrap_or_default(),
        })
    }
}

/// The three catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogView {
    All,
    Popular,
    Installed,
}

impl CatalogView {
    pub const ALL: [Self; 3] = [Self::All, Self::Popular, Self::Installed];
}

impl fmt::Display for CatalogView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Popular => write!(f, "popular"),
            Self::Installed => write!(f, "installed"),
        }
    }
}

impl FromStr for CatalogView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "popular" => Ok(Self::Popular),
            "installed" => Ok(Self::Installed),
            other => Err(format!(
                "unknown catalog view '{other}' (expected all, popular or installed)"
            )),
        }
    }
}

/// In-memory catalog. Each field is replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub all: Vec<Plugin>,
    /// Popular listings above the install threshold.
    pub popular: Vec<Plugin>,
    /// Plugins installed in the session's workspace. May contain plugins
    /// that `all` does not list.
    pub installed: Vec<Plugin>,
}

impl CatalogSnapshot {
    pub fn view(&self, view: CatalogView) -> &[Plugin] {
        match view {
            CatalogView::All => &self.all,
            CatalogView::Popular => &self.popular,
            CatalogView::Installed => &self.installed,
        }
    }

    pub(crate) fn replace(&mut self, view: CatalogView, plugins: Vec<Plugin>) {
        match view {
            CatalogView::All => self.all = plugins,
            CatalogView::Popular => self.popular = plugins,
            CatalogView::Installed => self.installed = plugins,
        }
    }

    /// Whether `id` is installed in the current workspace.
    pub fn is_installed(&self, id: &PluginId) -> bool {
        self.installed.iter().any(|plugin| &plugin.id == id)
    }

    /// Look a plugin up in any listing.
    pub fn find(&self, id: &PluginId) -> Option<&Plugin> {
        CatalogView::ALL
            .iter()
            .flat_map(|view| self.view(*view))
            .find(|plugin| &plugin.id == id)
    }
}

/// `{ "data": ... }` envelope used by every catalog endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// One row of `GET /organizations/{id}/plugins`.
#[derive(Debug, Deserialize)]
pub(crate) struct InstallationRecord {
    pub plugin: Plugin,
}

/// Body POSTed to a plugin's install endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub organisation_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstallResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<InstallResponseData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstallResponseData {
    #[serde(default, alias = "redirectUrl")]
    pub redirect_url: Option<String>,
}

impl InstallResponse {
    pub fn redirect_url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.redirect_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::testing::plugin_json, rstest::rstest, serde_json::json};

    #[test]
    fn test_plugin_deserializes_full_record() {
        let plugin: Plugin = serde_json::from_value(plugin_json("p1", 42)).unwrap();
        assert_eq!(plugin.id, PluginId::new("p1"));
        assert_eq!(plugin.install_count, 42);
        assert_eq!(plugin.created_on(), "2021-09-01");
        assert_eq!(plugin.updated_on(), "2021-09-12");
        assert_eq!(plugin.preview_images(), ["a.png", "b.png", "c.png"]);
    }

    #[rstest]
    #[case::id_only(json!({"id": "a"}), "a")]
    #[case::legacy_only(json!({"_id": "b"}), "b")]
    #[case::both_prefers_id(json!({"id": "a", "_id": "b"}), "a")]
    #[case::empty_id_falls_back(json!({"id": "", "_id": "b"}), "b")]
    fn test_plugin_id_normalization(#[case] value: serde_json::Value, #[case] expected: &str) {
        let plugin: Plugin = serde_json::from_value(value).unwrap();
        assert_eq!(plugin.id.as_str(), expected);
    }

    #[test]
    fn test_plugin_without_any_id_is_rejected() {
        let err = serde_json::from_value::<Plugin>(json!({"name": "nameless"})).unwrap_err();
        assert!(err.to_string().contains("neither `id` nor `_id`"));
    }

    #[test]
    fn test_nullable_fields_default() {
        let plugin: Plugin = serde_json::from_value(json!({
            "_id": "x",
            "images": null,
            "install_count": null,
            "created_at": "2021"
        }))
        .unwrap();
        assert!(plugin.images.is_empty());
        assert_eq!(plugin.install_count, 0);
        assert_eq!(plugin.created_on(), "2021");
        assert!(plugin.preview_images().is_empty());
    }

    #[test]
    fn test_catalog_view_parse_and_display() {
        for view in CatalogView::ALL {
            assert_eq!(view.to_string().parse::<CatalogView>().unwrap(), view);
        }
        assert_eq!(" Popular ".parse::<CatalogView>().unwrap(), CatalogView::Popular);
        assert!("trending".parse::<CatalogView>().is_err());
    }

    #[test]
    fn test_is_installed_checks_membership_by_id() {
        let a: Plugin = serde_json::from_value(plugin_json("a", 1)).unwrap();
        let b: Plugin = serde_json::from_value(plugin_json("b", 1)).unwrap();
        let elsewhere: Plugin = serde_json::from_value(plugin_json("c", 1)).unwrap();
        let snapshot = CatalogSnapshot {
            all: vec![a.clone(), b.clone()],
            popular: vec![],
            installed: vec![a.clone(), elsewhere.clone()],
        };

        assert!(snapshot.is_installed(&a.id));
        assert!(!snapshot.is_installed(&b.id));
        // Installed but not globally listed yet.
        assert!(snapshot.is_installed(&elsewhere.id));
        assert_eq!(snapshot.find(&elsewhere.id), Some(&elsewhere));
    }

    #[test]
    fn test_install_response_shapes() {
        let ok: InstallResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"redirect_url": "/x"}
        }))
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.redirect_url(), Some("/x"));

        let camel: InstallResponse = serde_json::from_value(json!({
            "success": true,
            "data": {"redirectUrl": "/y"}
        }))
        .unwrap();
        assert_eq!(camel.redirect_url(), Some("/y"));

        let failed: InstallResponse = serde_json::from_value(json!({
            "success": false,
            "message": "quota exceeded"
        }))
        .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.message(), Some("quota exceeded"));
        assert_eq!(failed.redirect_url(), None);
    }

    #[test]
    fn test_install_request_omits_missing_user() {
        let request = InstallRequest {
            user_id: None,
            organisation_id: "ws-1".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"organisation_id": "ws-1"})
        );
    }
}
