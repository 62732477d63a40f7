use std::sync::Arc;

use choosy_core::{describe_failure, TokenGrant, TokenResponse};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{HttpRequest, RequestBody, Transport};

/// Sends grants to the credential endpoint. A grant is sent once and never
/// carries a bearer header.
#[derive(Clone)]
pub struct TokenIssuer {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl TokenIssuer {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<ClientConfig>) -> Self {
        Self { transport, config }
    }

    pub fn grant_request(&self, grant: &TokenGrant) -> HttpRequest {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        HttpRequest {
            method: Method::POST,
            url: self.config.url_for(&self.config.token_path),
            headers,
            body: Some(RequestBody::Form(
                grant.form_pairs(self.config.client_id.as_deref()),
            )),
            timeout: self.config.timeout(),
        }
    }

    pub async fn exchange(&self, grant: &TokenGrant) -> Result<TokenResponse, ClientError> {
        debug!(grant_type = grant.grant_type(), "requesting token grant");
        let response = self
            .transport
            .send(self.grant_request(grant))
            .await
            .map_err(|err| ClientError::Request {
                status: None,
                message: err.to_string(),
                attempts: 1,
            })?;
        if !response.status.is_success() {
            return Err(ClientError::Request {
                status: Some(response.status.as_u16()),
                message: describe_failure(&response.body),
                attempts: 1,
            });
        }
        serde_json::from_str(&response.body).map_err(|err| ClientError::Decode {
            message: err.to_string(),
        })
    }
}
