//! HTTP session against an OpenSearch cluster's REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode, Url};
use tracing::debug;

use super::requests::{ComponentTemplateBody, GetComponentTemplatesResponse};
use crate::error::{Error, Result};
use crate::reconcilers::TemplateSession;

/// Basic-auth credentials for the cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

/// Transport options for [`OpenSearchClient`]
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub skip_tls_verify: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            skip_tls_verify: false,
        }
    }
}

/// Client bound to a single cluster endpoint
#[derive(Clone, Debug)]
pub struct OpenSearchClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl OpenSearchClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        options: &ClientOptions,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::config(format!("invalid OpenSearch URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!("invalid OpenSearch URL '{}'", base_url)));
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.skip_tls_verify)
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// `<base>/_component_template/<name>`, with the name as one escaped segment.
    ///
    /// Names containing `*` or `,` are rejected since OpenSearch expands them
    /// to several templates even when escaped.
    fn template_url(&self, template: &str) -> Result<Url> {
        if template.is_empty() || template.contains(['*', ',']) {
            return Err(Error::InvalidTemplateName(template.to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("invalid OpenSearch URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["_component_template", template]);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        template: &str,
        body: Option<&ComponentTemplateBody>,
    ) -> Result<Response> {
        let url = self.template_url(template)?;
        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }
        Ok(request.send().await?)
    }

    /// Fetch a stored template, `None` when it does not exist
    pub async fn get_template(&self, name: &str) -> Result<Option<ComponentTemplateBody>> {
        let response = self.send(Method::GET, name, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let parsed: GetComponentTemplatesResponse = serde_json::from_slice(&response.bytes().await?)?;

        Ok(parsed
            .component_templates
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.component_template))
    }
}

#[async_trait]
impl TemplateSession for OpenSearchClient {
    async fn template_exists(&self, name: &str) -> Result<bool> {
        let response = self.send(Method::HEAD, name, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(api_error(response).await),
        }
    }

    async fn template_differs(&self, name: &str, desired: &ComponentTemplateBody) -> Result<bool> {
        let Some(existing) = self.get_template(name).await? else {
            debug!(template = %name, "component template not found, treating as drift");
            return Ok(true);
        };
        let differs = desired.differs_from(&existing);
        if differs {
            debug!(template = %name, existing = ?existing, "component template drifted");
        }
        Ok(differs)
    }

    async fn upsert_template(&self, name: &str, desired: &ComponentTemplateBody) -> Result<()> {
        let response = self.send(Method::PUT, name, Some(desired)).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_template(&self, name: &str) -> Result<()> {
        let response = self.send(Method::DELETE, name, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::OpenSearchApi { status, body }
}
