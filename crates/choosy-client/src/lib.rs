#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

//! Authenticated HTTP client for the Choosy backend.
//!
//! [`RequestClient`] attaches the stored bearer credential, refreshes it once
//! through a shared [`RefreshCoordinator`] when the backend answers 401, and
//! retries other failures with a fixed delay. The network and the credential
//! storage are both injected: see [`Transport`] and
//! [`choosy_core::KeyValueStore`].

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod issuer;
pub mod transport;

pub use client::{AuthMode, RequestClient, RequestOptions};
pub use config::{ClientConfig, RetryPolicy};
pub use coordinator::{RefreshCoordinator, RefreshOutcome};
pub use error::ClientError;
pub use issuer::TokenIssuer;
pub use transport::{
    HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport, TransportError,
};
