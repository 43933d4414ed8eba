use anyhow::Context;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::client::services::session::SessionHandle;
use crate::common::config::ClientConfig;
use crate::common::error::ApiError;

/// Uniform request layer: resolves paths against the API base and attaches the
/// current session token as a bearer credential when there is one.
///
/// Every call is single-shot. No retries, no deduplication, no caching, and an
/// `Unauthorized` answer is handed back to the caller untouched.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionHandle) -> anyhow::Result<Self> {
        let mut raw = config.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).with_context(|| format!("invalid API_URL '{}'", config.api_url))?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http, base, session })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::NetworkFailure(format!("bad endpoint '{}': {}", path, e)))
    }

    /// Starts a request with the bearer credential already attached.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        log::debug!("{} {}", method, url.path());
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(&self, kind: &'static str, path: &str) -> Result<T, ApiError> {
        let req = self.request(Method::GET, path)?;
        self.execute(kind, req).await
    }

    pub async fn get_with_query<T, Q>(&self, kind: &'static str, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self.request(Method::GET, path)?.query(query);
        self.execute(kind, req).await
    }

    pub async fn post<T, B>(&self, kind: &'static str, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.execute(kind, req).await
    }

    pub async fn put<T, B>(&self, kind: &'static str, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let req = self.request(Method::PUT, path)?.json(body);
        self.execute(kind, req).await
    }

    pub async fn delete(&self, kind: &'static str, path: &str) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, path)?;
        let resp = req.send().await?;
        Self::check(kind, resp).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(&self, kind: &'static str, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await?;
        let resp = Self::check(kind, resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(format!("{} response: {}", kind, e)))
    }

    async fn check(kind: &'static str, resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        log::debug!("{} request failed with {}: {}", kind, status.as_u16(), message);
        Err(ApiError::from_status(status.as_u16(), kind, message))
    }
}

/// Pulls a human readable message out of an error body (`{"message": ..}` or
/// `{"error": ..}`), falling back to short plain-text bodies.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        return ["message", "error", "msg"]
            .iter()
            .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
            .map(str::to_string);
    }
    if body.len() <= 200 && !body.starts_with('<') {
        return Some(body.to_string());
    }
    None
}
