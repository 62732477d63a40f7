use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use choosy_core::{
    describe_failure, CredentialPair, CredentialStore, KeyValueStore, TokenGrant, TokenResponse,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::error::ClientError;
use crate::issuer::TokenIssuer;
use crate::transport::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the stored access credential and refresh it on 401.
    #[default]
    Bearer,
    /// Never attach a credential and never refresh; used for the token endpoint.
    Anonymous,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Overrides the configured timeout for every attempt of this call.
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub auth: AuthMode,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }
}

/// Where one logical call stands. Attempts are numbered from 1.
#[derive(Debug)]
enum RequestState<T> {
    Attempting {
        attempt: u32,
    },
    Refreshing {
        attempt: u32,
        rejected: Option<String>,
        error: ClientError,
    },
    Retrying {
        attempt: u32,
        error: ClientError,
    },
    Failed(ClientError),
    Succeeded(T),
}

/// Per-call values fixed before the first attempt.
struct PreparedCall {
    request_id: String,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<RequestBody>,
    timeout: Duration,
    credential_call: bool,
}

#[derive(Clone)]
pub struct RequestClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    coordinator: Arc<RefreshCoordinator>,
}

impl RequestClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let config = Arc::new(config);
        let credentials = CredentialStore::new(store, config.namespace.clone());
        let issuer = TokenIssuer::new(transport.clone(), config.clone());
        let coordinator = Arc::new(RefreshCoordinator::new(credentials.clone(), issuer));
        Self {
            config,
            transport,
            credentials,
            coordinator,
        }
    }

    /// Builds a client around an existing coordinator, so several clients
    /// share one refresh.
    pub fn with_coordinator(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            credentials: coordinator.credentials().clone(),
            coordinator,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn credentials(&self) -> Result<Option<CredentialPair>, ClientError> {
        Ok(self.credentials.load()?)
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let call = self.prepare(path, options)?;
        self.execute(call).await
    }

    /// Like [`call`](Self::call) for endpoints that need a logged-in user:
    /// without a stored access credential it returns `None` and sends nothing.
    pub async fn call_gated<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, ClientError> {
        if self.credentials.access_token()?.is_none() {
            debug!(path = %path, "no access credential; skipping login-gated call");
            return Ok(None);
        }
        self.call(path, options).await.map(Some)
    }

    /// Exchanges an authorization code for a credential pair and stores it.
    pub async fn login(&self, code: &str) -> Result<CredentialPair, ClientError> {
        let grant = TokenGrant::AuthorizationCode {
            code: code.to_string(),
        };
        let options = RequestOptions::post()
            .form(grant.form_pairs(self.config.client_id.as_deref()))
            .auth(AuthMode::Anonymous);
        let response: TokenResponse = self.call(&self.config.token_path, options).await?;
        let pair = CredentialPair::issued(&response, Utc::now()).ok_or_else(|| {
            ClientError::Decode {
                message: format!("expires_in out of range: {}", response.expires_in),
            }
        })?;
        self.credentials.save(&pair)?;
        info!(namespace = %self.credentials.namespace(), expires_at = %pair.access_expires_at, "logged in");
        Ok(pair)
    }

    pub async fn refresh_now(&self) -> Result<CredentialPair, ClientError> {
        self.coordinator.force_refresh().await?;
        self.credentials
            .load()?
            .ok_or_else(|| ClientError::AuthenticationExpired {
                reason: "no credentials stored after refresh".to_string(),
            })
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.credentials.clear()?;
        info!(namespace = %self.credentials.namespace(), "logged out");
        Ok(())
    }

    fn prepare(&self, path: &str, options: RequestOptions) -> Result<PreparedCall, ClientError> {
        let request_id = Uuid::now_v7().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|err| {
                ClientError::InvalidRequest {
                    message: format!("invalid header name '{name}': {err}"),
                }
            })?;
            let value =
                HeaderValue::from_str(value.trim()).map_err(|err| ClientError::InvalidRequest {
                    message: format!("invalid value for header '{name}': {err}"),
                })?;
            headers.insert(name, value);
        }
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(&request_id).map_err(|err| ClientError::InvalidRequest {
                message: err.to_string(),
            })?,
        );

        let mut url = self.config.url_for(path);
        append_query(&mut url, &options.query);

        Ok(PreparedCall {
            request_id,
            method: options.method,
            url,
            headers,
            body: options.body,
            timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
            credential_call: options.auth == AuthMode::Anonymous
                || self.config.is_token_path(path),
        })
    }

    async fn execute<T: DeserializeOwned>(&self, call: PreparedCall) -> Result<T, ClientError> {
        let max_attempts = self.config.retry.attempts();
        if !call.credential_call {
            self.coordinator.ensure_fresh().await?;
        }

        let mut refreshed = false;
        let mut state = RequestState::Attempting { attempt: 1 };
        loop {
            state = match state {
                RequestState::Attempting { attempt } => {
                    let token = if call.credential_call {
                        None
                    } else {
                        self.credentials.access_token()?
                    };
                    let result = self.attempt(&call, token.as_deref(), attempt).await;
                    self.next_state(&call, result, token, attempt, refreshed)
                }
                RequestState::Refreshing {
                    attempt,
                    rejected,
                    error,
                } => match self.coordinator.refresh(rejected.as_deref()).await {
                    Ok(outcome) => {
                        refreshed = true;
                        debug!(request_id = %call.request_id, ?outcome, "retrying after refresh");
                        if attempt < max_attempts {
                            RequestState::Attempting {
                                attempt: attempt + 1,
                            }
                        } else {
                            RequestState::Failed(error)
                        }
                    }
                    Err(err) => RequestState::Failed(err),
                },
                RequestState::Retrying { attempt, error } => {
                    warn!(
                        request_id = %call.request_id,
                        method = %call.method,
                        url = %call.url,
                        attempt,
                        "request failed, retrying: {error}"
                    );
                    tokio::time::sleep(self.config.retry.delay()).await;
                    RequestState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RequestState::Failed(err) => return Err(err),
                RequestState::Succeeded(value) => return Ok(value),
            };
        }
    }

    async fn attempt(
        &self,
        call: &PreparedCall,
        token: Option<&str>,
        attempt: u32,
    ) -> Result<Result<HttpResponse, TransportError>, ClientError> {
        let mut headers = call.headers.clone();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                ClientError::InvalidRequest {
                    message: format!("stored access credential is not a valid header: {err}"),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        debug!(
            request_id = %call.request_id,
            method = %call.method,
            url = %call.url,
            attempt,
            "sending request"
        );
        let request = HttpRequest {
            method: call.method.clone(),
            url: call.url.clone(),
            headers,
            body: call.body.clone(),
            timeout: call.timeout,
        };
        Ok(self.transport.send(request).await)
    }

    fn next_state<T: DeserializeOwned>(
        &self,
        call: &PreparedCall,
        result: Result<Result<HttpResponse, TransportError>, ClientError>,
        token: Option<String>,
        attempt: u32,
        refreshed: bool,
    ) -> RequestState<T> {
        let max_attempts = self.config.retry.attempts();
        let error = match result {
            Err(err) => return RequestState::Failed(err),
            Ok(Ok(response)) if response.status.is_success() => {
                return match decode(&response.body) {
                    Ok(value) => RequestState::Succeeded(value),
                    Err(err) => RequestState::Failed(err),
                };
            }
            Ok(Ok(response)) => {
                let message = describe_failure(&response.body);
                debug!(
                    request_id = %call.request_id,
                    status = %response.status,
                    attempt,
                    "request returned error status"
                );
                if response.status == StatusCode::UNAUTHORIZED && !call.credential_call {
                    if refreshed {
                        return RequestState::Failed(ClientError::Unauthorized { message });
                    }
                    return RequestState::Refreshing {
                        attempt,
                        rejected: token,
                        error: ClientError::Request {
                            status: Some(response.status.as_u16()),
                            message,
                            attempts: attempt,
                        },
                    };
                }
                ClientError::Request {
                    status: Some(response.status.as_u16()),
                    message,
                    attempts: attempt,
                }
            }
            Ok(Err(err)) => ClientError::Request {
                status: None,
                message: err.to_string(),
                attempts: attempt,
            },
        };

        if attempt < max_attempts {
            RequestState::Retrying { attempt, error }
        } else {
            warn!(
                request_id = %call.request_id,
                method = %call.method,
                url = %call.url,
                attempts = attempt,
                "request failed: {error}"
            );
            RequestState::Failed(error)
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|err| ClientError::Decode {
        message: err.to_string(),
    })
}

fn append_query(url: &mut String, params: &[(String, String)]) {
    if params.is_empty() {
        return;
    }
    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<String>>()
        .join("&");
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query);
}
