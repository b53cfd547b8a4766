//! GeoServer REST client.
//!
//! Every call is a single blocking-in-sequence request without retries.
//! The expected status code of each call is fixed; anything else becomes
//! [`GeoServerError::UnexpectedStatus`] carrying the response body.

use std::path::Path;
use std::time::Duration;

use reqwest::{header, Body, Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{GeoServerError, GeoServerResult};
use crate::payload::{
    Coverage, CoverageBody, CoverageStore, CoverageStoreBody, NamedRef, Style, StyleBody,
    WorkspaceBody,
};

/// Content type of uploaded style documents.
pub const SLD_CONTENT_TYPE: &str = "application/vnd.ogc.sld+xml";

/// Connection settings for a GeoServer instance.
#[derive(Debug, Clone)]
pub struct GeoServerConfig {
    /// Scheme and host, e.g. `http://localhost`
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Workspace all resources are created in
    pub workspace: String,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl GeoServerConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            workspace: workspace.into(),
            timeout: Duration::from_secs(600),
        }
    }

    /// Root of the REST API.
    pub fn rest_root(&self) -> String {
        format!(
            "{}:{}/geoserver/rest",
            self.host.trim_end_matches('/'),
            self.port
        )
    }
}

/// Outcome of the workspace creation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOutcome {
    Created,
    AlreadyExists,
}

/// File payloads accepted by the store upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Zip archive of granules plus indexer descriptors
    ImageMosaic,
    /// A single GeoTIFF
    GeoTiff,
}

impl UploadKind {
    fn endpoint(&self) -> &'static str {
        match self {
            UploadKind::ImageMosaic => "file.imagemosaic",
            UploadKind::GeoTiff => "file.geotiff",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            UploadKind::ImageMosaic => "application/zip",
            UploadKind::GeoTiff => "image/tiff",
        }
    }
}

/// Client for the GeoServer REST API.
#[derive(Debug, Clone)]
pub struct GeoServerClient {
    client: Client,
    config: GeoServerConfig,
}

impl GeoServerClient {
    pub fn new(config: GeoServerConfig) -> GeoServerResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeoServerConfig {
        &self.config
    }

    pub fn workspace(&self) -> &str {
        &self.config.workspace
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.rest_root(), path)
    }

    fn workspace_url(&self, path: &str) -> String {
        self.url(&format!("workspaces/{}/{}", self.config.workspace, path))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.config.user, Some(&self.config.password))
    }

    fn json_request<T: Serialize>(&self, method: Method, url: &str, body: &T) -> GeoServerResult<RequestBuilder> {
        Ok(self
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?))
    }

    /// Create the configured workspace.
    ///
    /// 401 and 409 mean the workspace already exists and are not errors.
    #[instrument(skip(self), fields(workspace = %self.config.workspace))]
    pub async fn create_workspace(&self) -> GeoServerResult<WorkspaceOutcome> {
        let body = WorkspaceBody {
            workspace: NamedRef::new(&self.config.workspace),
        };
        let resp = self
            .json_request(Method::POST, &self.url("workspaces"), &body)?
            .send()
            .await?;

        match resp.status().as_u16() {
            201 => {
                info!("Workspace did not exist and was created");
                Ok(WorkspaceOutcome::Created)
            }
            401 | 409 => {
                info!(status = resp.status().as_u16(), "Workspace already exists");
                Ok(WorkspaceOutcome::AlreadyExists)
            }
            _ => Err(unexpected("Creation of workspace", resp).await),
        }
    }

    /// Create a coverage store in the workspace.
    #[instrument(skip(self, store), fields(store = %store.name))]
    pub async fn create_coverage_store(&self, store: CoverageStore) -> GeoServerResult<()> {
        info!(store_type = ?store.store_type, url = %store.url, "Creating coverage store");
        let body = CoverageStoreBody {
            coverage_store: store,
        };
        let resp = self
            .json_request(Method::POST, &self.workspace_url("coveragestores"), &body)?
            .send()
            .await?;
        expect_status(resp, 201, "Creation of coveragestore").await?;
        Ok(())
    }

    /// Upload a file that creates (or extends) a store and its coverage.
    ///
    /// The body is streamed from `path`.
    #[instrument(skip(self, path), fields(store = %store, path = %path.display()))]
    pub async fn upload_store_file(
        &self,
        store: &str,
        kind: UploadKind,
        path: &Path,
        coverage_name: Option<&str>,
    ) -> GeoServerResult<()> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        debug!(size, "Uploading store file");

        let url = self.workspace_url(&format!("coveragestores/{}/{}", store, kind.endpoint()));
        let mut req = self
            .request(Method::PUT, &url)
            .header(header::CONTENT_TYPE, kind.content_type())
            .header(header::CONTENT_LENGTH, size)
            .body(Body::from(file));
        if let Some(name) = coverage_name {
            req = req.query(&[("coverageName", name)]);
        }

        let resp = req.send().await?;
        expect_status(resp, 201, "Upload of store file").await?;
        info!("Upload succeeded");
        Ok(())
    }

    /// Create a coverage (and its layer) in an existing store.
    #[instrument(skip(self, coverage), fields(layer = %coverage.name))]
    pub async fn create_coverage(&self, store: &str, coverage: Coverage) -> GeoServerResult<()> {
        let url = self.workspace_url(&format!("coveragestores/{}/coverages", store));
        let resp = self
            .json_request(Method::POST, &url, &CoverageBody { coverage })?
            .send()
            .await?;
        expect_status(resp, 201, "Creation of coverage").await?;
        info!("Creation of coverage succeeded");
        Ok(())
    }

    /// Rewrite an existing coverage, e.g. one created by a mosaic upload.
    #[instrument(skip(self, coverage), fields(layer = %coverage.name))]
    pub async fn update_coverage(&self, store: &str, coverage_name: &str, coverage: Coverage) -> GeoServerResult<()> {
        let url = self.workspace_url(&format!(
            "coveragestores/{}/coverages/{}",
            store, coverage_name
        ));
        let resp = self
            .json_request(Method::PUT, &url, &CoverageBody { coverage })?
            .send()
            .await?;
        expect_status(resp, 200, "Updating of coverage").await?;
        info!("Updating of coverage succeeded");
        Ok(())
    }

    /// Fetch a layer definition.
    pub async fn get_layer(&self, layer: &str) -> GeoServerResult<Value> {
        let url = self.workspace_url(&format!("layers/{}", layer));
        let resp = self.request(Method::GET, &url).send().await?;
        let body = expect_status(resp, 200, "Fetching of layer").await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the resource (coverage) a layer definition points at.
    pub async fn get_layer_resource(&self, layer_def: &Value) -> GeoServerResult<Value> {
        let href = layer_def["layer"]["resource"]["href"]
            .as_str()
            .ok_or_else(|| GeoServerError::InvalidResponse {
                operation: "Fetching of layer".to_string(),
                message: "layer has no resource href".to_string(),
            })?;
        let resp = self.request(Method::GET, href).send().await?;
        let body = expect_status(resp, 200, "Fetching of layer resource").await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Create an empty style named after the layer.
    pub async fn create_style(&self, name: &str) -> GeoServerResult<()> {
        let body = StyleBody {
            style: Style {
                name: name.to_string(),
                filename: format!("{}.sld", name),
            },
        };
        let resp = self
            .json_request(Method::POST, &self.workspace_url("styles"), &body)?
            .send()
            .await?;
        expect_status(resp, 201, "Creation of style").await?;
        debug!(style = %name, "Empty style created");
        Ok(())
    }

    /// Upload the style document into an existing style.
    pub async fn upload_style(&self, name: &str, sld: String) -> GeoServerResult<()> {
        let url = self.workspace_url(&format!("styles/{}", name));
        let resp = self
            .request(Method::PUT, &url)
            .header(header::CONTENT_TYPE, SLD_CONTENT_TYPE)
            .body(sld)
            .send()
            .await?;
        expect_status(resp, 200, "Adding content to empty style").await?;
        debug!(style = %name, "Added content to empty style");
        Ok(())
    }

    /// Point a layer's default style at `style` and write the definition back.
    pub async fn set_default_style(&self, layer: &str, style: &str, mut layer_def: Value) -> GeoServerResult<()> {
        let style_href = self.workspace_url(&format!("styles/{}.json", style));
        let layer_obj = layer_def
            .get_mut("layer")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| GeoServerError::InvalidResponse {
                operation: "Attaching of style".to_string(),
                message: "layer definition has no 'layer' object".to_string(),
            })?;
        layer_obj.insert(
            "defaultStyle".to_string(),
            serde_json::json!({ "name": style, "href": style_href }),
        );

        let url = self.workspace_url(&format!("layers/{}", layer));
        let resp = self
            .json_request(Method::PUT, &url, &layer_def)?
            .send()
            .await?;
        expect_status(resp, 200, "Attaching of style").await?;
        Ok(())
    }

    /// Style attachment: create the style, upload its content, make it the
    /// layer's default style.
    #[instrument(skip(self, sld), fields(layer = %layer))]
    pub async fn attach_style(&self, layer: &str, sld: String) -> GeoServerResult<()> {
        self.create_style(layer).await?;
        self.upload_style(layer, sld).await?;
        let layer_def = self.get_layer(layer).await?;
        self.set_default_style(layer, layer, layer_def).await?;
        info!("Style attached");
        Ok(())
    }
}

/// Return the body if the status matches, otherwise a status error.
async fn expect_status(resp: Response, expected: u16, operation: &str) -> GeoServerResult<String> {
    if resp.status().as_u16() != expected {
        return Err(unexpected(operation, resp).await);
    }
    Ok(resp.text().await?)
}

async fn unexpected(operation: &str, resp: Response) -> GeoServerError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    GeoServerError::UnexpectedStatus {
        operation: operation.to_string(),
        status,
        body,
    }
}
