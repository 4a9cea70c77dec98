//! OpenStack API client implementation.
//!
//! This module provides the HTTP client for the OpenStack identity, compute,
//! and block-storage APIs. It authenticates once against Keystone and then
//! talks to the catalog endpoints with the issued token.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::{AuthConfig, CloudConfig};
use crate::error::{ConfigError, ProviderError, Result};

use super::api::CloudApi;
use super::types::{
    CatalogEntry, Server, ServerEnvelope, ServerList, ServerTagList, TokenResponse, Volume,
    VolumeEnvelope, VolumeList,
};

/// Compute microversion that introduced server tags.
const NOVA_MICROVERSION: &str = "2.26";

/// Header carrying the compute microversion.
const NOVA_VERSION_HEADER: &str = "X-OpenStack-Nova-API-Version";

/// Header carrying the token on every API call.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header Keystone returns the issued token in.
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Catalog service types for compute, in preference order.
const COMPUTE_SERVICE_TYPES: &[&str] = &["compute"];

/// Catalog service types for block storage, in preference order.
const BLOCK_STORAGE_SERVICE_TYPES: &[&str] = &["volumev3", "block-storage", "volume"];

/// OpenStack API client.
#[derive(Debug, Clone)]
pub struct OpenStackClient {
    /// HTTP client.
    client: Client,
    /// Keystone token.
    token: String,
    /// Compute endpoint, without trailing slash.
    compute_url: String,
    /// Block-storage endpoint, without trailing slash.
    block_storage_url: String,
}

impl OpenStackClient {
    /// Authenticates against Keystone and resolves service endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are incomplete, authentication fails,
    /// or the catalog lacks a required endpoint.
    pub async fn connect(cloud: &CloudConfig) -> Result<Self> {
        let client = build_http_client(cloud.timeout_secs())?;
        let (token, catalog) = Self::authenticate(&client, &cloud.auth).await?;

        let region = cloud.region_name.as_deref();
        let interface = cloud.interface();

        let compute_url = match &cloud.compute_endpoint_override {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => select_endpoint(&catalog, COMPUTE_SERVICE_TYPES, region, interface)?,
        };
        let block_storage_url = match &cloud.block_storage_endpoint_override {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => select_endpoint(&catalog, BLOCK_STORAGE_SERVICE_TYPES, region, interface)?,
        };

        info!("Authenticated; compute at {compute_url}, block storage at {block_storage_url}");

        Ok(Self {
            client,
            token,
            compute_url,
            block_storage_url,
        })
    }

    /// Creates a client from an existing token and known endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_token(
        token: impl Into<String>,
        compute_url: &str,
        block_storage_url: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            token: token.into(),
            compute_url: compute_url.trim_end_matches('/').to_string(),
            block_storage_url: block_storage_url.trim_end_matches('/').to_string(),
        })
    }

    /// Requests a project-scoped token with password credentials.
    async fn authenticate(
        client: &Client,
        auth: &AuthConfig,
    ) -> Result<(String, Vec<CatalogEntry>)> {
        let auth_url = auth
            .auth_url
            .as_deref()
            .ok_or_else(|| ConfigError::missing("auth.auth_url"))?;
        let username = auth
            .username
            .as_deref()
            .ok_or_else(|| ConfigError::missing("auth.username"))?;
        let password = auth
            .password
            .as_deref()
            .ok_or_else(|| ConfigError::missing("auth.password"))?;

        let scope = match (&auth.project_id, &auth.project_name) {
            (Some(id), _) => serde_json::json!({ "project": { "id": id } }),
            (None, Some(name)) => serde_json::json!({
                "project": { "name": name, "domain": { "name": auth.project_domain() } }
            }),
            (None, None) => return Err(ConfigError::missing("auth.project_name").into()),
        };

        let body = serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "domain": { "name": auth.user_domain() },
                            "password": password,
                        }
                    }
                },
                "scope": scope,
            }
        });

        let url = tokens_url(auth_url);
        debug!("Requesting token from {url}");

        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("Token request failed: {e}")))?;
        let response = check_response(response).await?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::invalid_response("Token response has no X-Subject-Token header")
            })?;

        let token_response: TokenResponse = decode(response).await?;
        Ok((token, token_response.token.catalog))
    }

    /// Builds a compute request carrying the tag microversion.
    fn compute_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(NOVA_VERSION_HEADER, NOVA_MICROVERSION)
    }

    /// Sends a request with the token, without checking the status.
    async fn send_unchecked(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.header(AUTH_TOKEN_HEADER, &self.token);
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("Request failed: {e}")))?;
        trace!("{} {}", response.status(), response.url());
        Ok(response)
    }

    /// Sends a request with the token and fails on non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.send_unchecked(request).await?;
        check_response(response).await
    }

    /// Sends a request and decodes its JSON body.
    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        decode(response).await
    }

    /// Fetches `{base}/{collection}/{id}`, mapping 404 to `None`.
    async fn get_by_id<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = self.send_unchecked(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_response(response).await?;
        Ok(Some(decode(response).await?))
    }
}

#[async_trait]
impl CloudApi for OpenStackClient {
    async fn find_server(&self, reference: &str) -> Result<Option<Server>> {
        if is_uuid(reference) {
            let url = build_url(&self.compute_url, &["servers", reference])?;
            let found: Option<ServerEnvelope> =
                self.get_by_id(self.compute_request(Method::GET, url)).await?;
            if let Some(envelope) = found {
                return Ok(Some(envelope.server));
            }
            debug!("No server with ID {reference}, trying name lookup");
        }

        let mut url = build_url(&self.compute_url, &["servers"])?;
        url.query_pairs_mut()
            .append_pair("name", &exact_name_filter(reference));
        let list: ServerList = self
            .get_json(self.compute_request(Method::GET, url))
            .await?;

        // The filter is still a regex on the server side; keep exact hits only.
        let matches = list
            .servers
            .into_iter()
            .filter(|s| s.name == reference || s.id == reference)
            .collect();
        single_match(reference, matches)
    }

    async fn server_tags(&self, server_id: &str) -> Result<Vec<String>> {
        let url = build_url(&self.compute_url, &["servers", server_id, "tags"])?;
        let list: ServerTagList = self
            .get_json(self.compute_request(Method::GET, url))
            .await?;
        Ok(list.tags)
    }

    async fn set_server_tags(&self, server_id: &str, tags: &[String]) -> Result<()> {
        let url = build_url(&self.compute_url, &["servers", server_id, "tags"])?;
        let body = ServerTagList {
            tags: tags.to_vec(),
        };
        self.send(self.compute_request(Method::PUT, url).json(&body))
            .await?;
        Ok(())
    }

    async fn remove_server_tag(&self, server_id: &str, tag: &str) -> Result<()> {
        let url = build_url(&self.compute_url, &["servers", server_id, "tags", tag])?;
        self.send(self.compute_request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn find_volume(&self, reference: &str) -> Result<Option<Volume>> {
        if is_uuid(reference) {
            let url = build_url(&self.block_storage_url, &["volumes", reference])?;
            let found: Option<VolumeEnvelope> =
                self.get_by_id(self.client.get(url)).await?;
            if let Some(envelope) = found {
                return Ok(Some(envelope.volume));
            }
            debug!("No volume with ID {reference}, trying name lookup");
        }

        let mut url = build_url(&self.block_storage_url, &["volumes"])?;
        url.query_pairs_mut().append_pair("name", reference);
        let list: VolumeList = self.get_json(self.client.get(url)).await?;

        let matches = list
            .volumes
            .into_iter()
            .filter(|v| v.name.as_deref() == Some(reference) || v.id == reference)
            .collect();
        single_match(reference, matches)
    }

    async fn block_storage_get(&self, path: &str) -> Result<serde_json::Value> {
        let url = build_url(&self.block_storage_url, &path_segments(path))?;
        self.get_json(self.client.get(url)).await
    }

    async fn block_storage_post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let url = build_url(&self.block_storage_url, &path_segments(path))?;
        self.send(self.client.post(url).json(body)).await?;
        Ok(())
    }
}

/// Builds the HTTP client with the configured timeout.
fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::network(format!("Failed to create HTTP client: {e}")))?;
    Ok(client)
}

/// Returns the token endpoint for an identity URL with or without `/v3`.
fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

/// Picks the first catalog endpoint matching service type, interface, and region.
fn select_endpoint(
    catalog: &[CatalogEntry],
    service_types: &[&str],
    region: Option<&str>,
    interface: &str,
) -> Result<String> {
    service_types
        .iter()
        .find_map(|service_type| {
            catalog
                .iter()
                .filter(|entry| entry.service_type == *service_type)
                .flat_map(|entry| entry.endpoints.iter())
                .find(|ep| ep.interface == interface && region.is_none_or(|r| ep.in_region(r)))
                .map(|ep| ep.url.trim_end_matches('/').to_string())
        })
        .ok_or_else(|| {
            ProviderError::EndpointNotFound {
                service: service_types.join("/"),
                region: region.unwrap_or("any").to_string(),
                interface: interface.to_string(),
            }
            .into()
        })
}

/// Appends percent-encoded path segments to an endpoint URL.
fn build_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| {
        ProviderError::invalid_response(format!("Invalid endpoint URL '{base}': {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|()| ProviderError::invalid_response(format!("Endpoint URL '{base}' has no path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Splits a relative API path into segments.
fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Builds a compute `name` filter matching exactly `name`.
///
/// The compute API evaluates the filter as a regular expression.
fn exact_name_filter(name: &str) -> String {
    format!("^{}$", regex::escape(name))
}

/// Returns true if the reference looks like a resource UUID.
fn is_uuid(reference: &str) -> bool {
    uuid::Uuid::parse_str(reference).is_ok()
}

/// Reduces lookup results to at most one resource.
fn single_match<T>(reference: &str, mut matches: Vec<T>) -> Result<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(ProviderError::MultipleMatches {
            reference: reference.to_string(),
        }
        .into()),
    }
}

/// Decodes a JSON response body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let value = response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::invalid_response(format!("Failed to parse response: {e}")))?;
    Ok(value)
}

/// Maps non-success responses to provider errors.
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let extra_data = serde_json::from_str::<serde_json::Value>(&body).ok();
    let message = extra_data
        .as_ref()
        .and_then(fault_message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.clone()
            }
        });

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ProviderError::AuthenticationFailed { message }.into());
    }

    Err(ProviderError::api_error(status.as_u16(), message, extra_data).into())
}

/// Extracts the message from an OpenStack fault body.
///
/// Faults look like `{"itemNotFound": {"message": "...", "code": 404}}`.
fn fault_message(body: &serde_json::Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(serde_json::Value::as_str) {
        return Some(message.to_string());
    }
    body.as_object()?
        .values()
        .find_map(|fault| fault.get("message").and_then(serde_json::Value::as_str))
        .map(String::from)
}
