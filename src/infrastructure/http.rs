use crate::session::SessionStore;
use crate::types::constants::API_PATH_SUFFIX;
use crate::types::{RealtimeError, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// REST client that attaches the stored bearer token to every request.
///
/// No retry, backoff or circuit breaking: a failed request is returned to
/// the caller as-is.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(RealtimeError::Connection(format!(
                "'{}' cannot be used as an API base URL",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a path relative to the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Starts a request with the bearer token attached, if one is stored.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        let mut request = self.http.request(method, url);

        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        Ok(request)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = send(self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = send(self.request(Method::POST, path)?.json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = send(self.request(Method::PUT, path)?.json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        return Err(RealtimeError::Connection(format!(
            "request to {} failed with status {}: {}",
            url, status, body
        )));
    }

    tracing::debug!("{} {}", status, response.url());
    Ok(response)
}

/// Derives the socket endpoint from the REST base URL by dropping a
/// trailing `/api` path segment.
pub fn socket_endpoint_from_api(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    trimmed
        .strip_suffix(API_PATH_SUFFIX)
        .unwrap_or(trimmed)
        .to_string()
}
