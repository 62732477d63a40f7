use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
}

/// Issues one HTTP exchange. Implementations do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;
        let builder = self
            .client
            .request(method.clone(), &url)
            .headers(headers)
            .timeout(timeout);
        let builder = match body {
            Some(RequestBody::Json(payload)) => builder.json(&payload),
            Some(RequestBody::Form(pairs)) => builder.form(&pairs),
            None => builder,
        };
        debug!(method = %method, url = %url, "http request");
        let start = std::time::Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| map_reqwest_error(err, timeout))?;
        debug!(
            method = %method,
            url = %url,
            status = %status,
            elapsed_ms = start.elapsed().as_millis(),
            "http response"
        );
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(err.to_string())
    }
}
