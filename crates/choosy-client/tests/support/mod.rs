#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use choosy_client::{
    ClientConfig, HttpRequest, HttpResponse, RequestBody, RequestClient, RetryPolicy, Transport,
    TransportError,
};
use choosy_core::{
    CredentialPair, CredentialStore, KeyValueStore, MemoryStore, StoreError, TokenResponse,
};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

pub const BASE: &str = "https://api.test";
pub const TOKEN_PATH: &str = "/oauth/token";
pub const NAMESPACE: &str = "test";

pub struct Reply {
    pub delay: Option<Duration>,
    pub result: Result<HttpResponse, TransportError>,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).expect("status code");
        Self {
            delay: None,
            result: Ok(HttpResponse::new(status, body)),
        }
    }

    pub fn ok() -> Self {
        Self::json(200, json!({"ok": true}))
    }

    pub fn unauthorized() -> Self {
        Self::json(401, json!({"error": "invalid_token", "error_description": "token expired"}))
    }

    pub fn tokens(access: &str, refresh: &str) -> Self {
        Self::json(
            200,
            json!({
                "access_token": access,
                "refresh_token": refresh,
                "token_type": "Bearer",
                "expires_in": 7200
            }),
        )
    }

    pub fn timeout() -> Self {
        Self {
            delay: None,
            result: Err(TransportError::Timeout(Duration::from_secs(10))),
        }
    }

    pub fn network(message: &str) -> Self {
        Self {
            delay: None,
            result: Err(TransportError::Network(message.to_string())),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
    pub at: tokio::time::Instant,
}

impl RecordedCall {
    pub fn form_value(&self, key: &str) -> Option<String> {
        match &self.body {
            Some(RequestBody::Form(pairs)) => pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }
}

type Handler = Box<dyn Fn(&RecordedCall) -> Reply + Send + Sync>;

/// In-memory transport that answers from a handler and records every call.
pub struct FakeTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&RecordedCall) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Replies per path in order; the last reply for a path repeats.
    pub fn scripted(script: Vec<(&str, Vec<Reply>)>) -> Arc<Self> {
        let queues: HashMap<String, Mutex<VecDeque<Reply>>> = script
            .into_iter()
            .map(|(path, replies)| (path.to_string(), Mutex::new(replies.into())))
            .collect();
        Self::new(move |call| {
            let Some(queue) = queues.get(&call.path) else {
                return Reply::json(404, json!({"detail": format!("no route for {}", call.path)}));
            };
            let mut queue = queue.lock().expect("queue lock");
            if queue.len() > 1 {
                queue.pop_front().expect("reply")
            } else {
                let last = queue.front().expect("at least one reply per path");
                Reply {
                    delay: last.delay,
                    result: last.result.clone(),
                }
            }
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let call = RecordedCall {
            method: request.method.clone(),
            path: request
                .url
                .strip_prefix(BASE)
                .unwrap_or(&request.url)
                .split('?')
                .next()
                .unwrap_or_default()
                .to_string(),
            authorization: request
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            request_id: request
                .headers
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body: request.body.clone(),
            timeout: request.timeout,
            at: tokio::time::Instant::now(),
        };
        self.calls.lock().expect("calls lock").push(call.clone());
        let reply = (self.handler)(&call);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.result
    }
}

/// Memory store that counts removals of the access credential key.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    access_removals: AtomicUsize,
}

impl CountingStore {
    pub fn access_removals(&self) -> usize {
        self.access_removals.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if key.ends_with("::access_token") {
            self.access_removals.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.remove(key)
    }
}

pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new(BASE);
    config.namespace = NAMESPACE.to_string();
    config.client_id = Some("choosy-mini".to_string());
    config
}

pub fn pair(access: &str, refresh: &str, expires_in: i64) -> CredentialPair {
    CredentialPair::issued(
        &TokenResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
        },
        Utc::now(),
    )
    .expect("issued pair")
}

pub fn seed(store: Arc<dyn KeyValueStore>, pair: &CredentialPair) {
    CredentialStore::new(store, NAMESPACE)
        .save(pair)
        .expect("seed credentials");
}

pub fn logged_in_store() -> Arc<CountingStore> {
    let store = Arc::new(CountingStore::default());
    seed(store.clone(), &pair("access-1", "refresh-1", 7200));
    store
}

pub fn client(transport: Arc<FakeTransport>, store: Arc<dyn KeyValueStore>) -> RequestClient {
    RequestClient::new(config(), transport, store)
}

pub fn client_with_policy(
    transport: Arc<FakeTransport>,
    store: Arc<dyn KeyValueStore>,
    policy: RetryPolicy,
) -> RequestClient {
    let mut config = config();
    config.retry = policy;
    RequestClient::new(config, transport, store)
}

pub fn stored(store: Arc<dyn KeyValueStore>) -> Option<CredentialPair> {
    CredentialStore::new(store, NAMESPACE)
        .load()
        .expect("load credentials")
}
