//! Remote collaborators: the catalog service, the organizations service and
//! each plugin's own install endpoint.

use {
    async_trait::async_trait,
    bazaar_config::ApiConfig,
    reqwest::{RequestBuilder, Response},
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::Value,
    tracing::{debug, warn},
    url::Url,
};

use crate::{
    error::{MarketplaceError, Result},
    types::{DataEnvelope, InstallRequest, InstallResponse, InstallationRecord, Plugin, PluginId},
};

/// Everything the marketplace needs from the network.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// `GET /plugins`
    async fn list_plugins(&self) -> Result<Vec<Plugin>>;

    /// `GET /plugins/popular`, unfiltered.
    async fn list_popular(&self) -> Result<Vec<Plugin>>;

    /// `GET /organizations/{workspace_id}/plugins`, projected to the nested
    /// plugin records. `Ok(None)` when the service answers with `data: null`.
    async fn list_installed(&self, workspace_id: &str, token: &str) -> Result<Option<Vec<Plugin>>>;

    /// `GET /plugins/{id}`
    async fn get_plugin(&self, id: &PluginId) -> Result<Plugin>;

    /// `POST` to a plugin-owned install endpoint.
    ///
    /// A 2xx response is returned as-is, including `success: false` bodies;
    /// other statuses become [`MarketplaceError::ServerRejection`].
    async fn install(
        &self,
        install_url: &str,
        request: &InstallRequest,
        token: Option<&str>,
    ) -> Result<InstallResponse>;
}

/// [`MarketplaceApi`] over HTTP.
pub struct HttpMarketplaceApi {
    http: reqwest::Client,
    catalog_url: Url,
    organizations_url: Url,
}

impl HttpMarketplaceApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("bazaar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(http, &config.catalog_url, &config.organizations_url)
    }

    pub fn with_client(
        http: reqwest::Client,
        catalog_url: &str,
        organizations_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            http,
            catalog_url: Url::parse(catalog_url)?,
            organizations_url: Url::parse(organizations_url)?,
        })
    }

    async fn fetch_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceApi {
    async fn list_plugins(&self) -> Result<Vec<Plugin>> {
        let url = endpoint(&self.catalog_url, &["plugins"])?;
        debug!(%url, "fetching all plugins");
        let records: Vec<Value> = self.fetch_data(self.http.get(url)).await?;
        Ok(decode_records(records, "all"))
    }

    async fn list_popular(&self) -> Result<Vec<Plugin>> {
        let url = endpoint(&self.catalog_url, &["plugins", "popular"])?;
        debug!(%url, "fetching popular plugins");
        let records: Vec<Value> = self.fetch_data(self.http.get(url)).await?;
        Ok(decode_records(records, "popular"))
    }

    async fn list_installed(&self, workspace_id: &str, token: &str) -> Result<Option<Vec<Plugin>>> {
        let url = endpoint(
            &self.organizations_url,
            &["organizations", workspace_id, "plugins"],
        )?;
        debug!(%url, "fetching installed plugins");
        let records: Option<Vec<Value>> =
            self.fetch_data(self.http.get(url).bearer_auth(token)).await?;
        Ok(records.map(|records| {
            decode_records::<InstallationRecord>(records, "installed")
                .into_iter()
                .map(|record| record.plugin)
                .collect()
        }))
    }

    async fn get_plugin(&self, id: &PluginId) -> Result<Plugin> {
        let url = endpoint(&self.catalog_url, &["plugins", id.as_str()])?;
        debug!(%url, "fetching plugin detail");
        self.fetch_data(self.http.get(url)).await
    }

    async fn install(
        &self,
        install_url: &str,
        request: &InstallRequest,
        token: Option<&str>,
    ) -> Result<InstallResponse> {
        let url = Url::parse(install_url)?;
        debug!(%url, organisation_id = %request.organisation_id, "posting install request");
        let mut builder = self.http.post(url).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Decode each listing record on its own, skipping the ones that do not
/// normalize instead of failing the whole listing.
fn decode_records<T: DeserializeOwned>(records: Vec<Value>, listing: &str) -> Vec<T> {
    let total = records.len();
    let decoded: Vec<T> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(listing, error = %e, "skipping malformed record");
                None
            },
        })
        .collect();
    let dropped = total - decoded.len();
    if dropped > 0 {
        warn!(listing, dropped, total, "skipped malformed catalog records");
    }
    decoded
}

/// Append path segments to a base URL, tolerating a trailing slash and
/// percent-encoding each segment.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| MarketplaceError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Deserialize)]
struct RejectionBody {
    #[serde(default)]
    message: Option<String>,
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // Error bodies are best-effort: keep the server's message when it sent one.
    let message = response
        .json::<RejectionBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty());
    Err(MarketplaceError::ServerRejection {
        status: Some(status.as_u16()),
        message,
    })
}
