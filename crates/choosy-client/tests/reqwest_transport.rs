use std::sync::Arc;
use std::time::Duration;

use choosy_client::{
    ClientConfig, ClientError, ReqwestTransport, RequestClient, RequestOptions, RetryPolicy,
};
use choosy_core::{CredentialPair, CredentialStore, MemoryStore, TokenResponse};
use mockito::{Matcher, Server};
use serde_json::json;

fn client_for(url: &str, store: Arc<MemoryStore>) -> RequestClient {
    let mut config = ClientConfig::new(url);
    config.retry = RetryPolicy {
        max_attempts: 3,
        delay_ms: 10,
    };
    config.timeout_ms = 2_000;
    RequestClient::new(
        config,
        Arc::new(ReqwestTransport::new(reqwest::Client::new())),
        store,
    )
}

fn logged_in(access: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let pair = CredentialPair::issued(
        &TokenResponse {
            access_token: access.to_string(),
            refresh_token: "refresh-1".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 7200,
        },
        chrono::Utc::now(),
    )
    .expect("issued pair");
    CredentialStore::new(store.clone(), "default")
        .save(&pair)
        .expect("seed");
    store
}

#[tokio::test]
async fn sends_bearer_query_and_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/plans")
        .match_header("authorization", "Bearer access-1")
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".to_string()))
        .match_header("x-client", "cli")
        .match_query(Matcher::UrlEncoded("week".into(), "42".into()))
        .match_body(Matcher::Json(json!({"recipes": [1, 2]})))
        .with_status(201)
        .with_body(json!({"id": "plan-1"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), logged_in("access-1"));
    let created: serde_json::Value = client
        .call(
            "/api/plans",
            RequestOptions::post()
                .json(json!({"recipes": [1, 2]}))
                .query("week", "42")
                .header("x-client", "cli"),
        )
        .await
        .expect("created");

    assert_eq!(created["id"], "plan-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn refreshes_over_http_and_retries_once() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/api/favorites")
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .with_body(json!({"detail": "token expired"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/oauth/token")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "token_type": "Bearer",
                "expires_in": 7200
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("GET", "/api/favorites")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), logged_in("access-1"));
    let favorites: Vec<serde_json::Value> = client
        .call("/api/favorites", RequestOptions::get())
        .await
        .expect("favorites");

    assert!(favorites.is_empty());
    rejected.assert_async().await;
    refresh.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_budget() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/categories")
        .with_status(500)
        .with_body(json!({"message": "database unavailable"}).to_string())
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server.url(), logged_in("access-1"));
    let err = client
        .call::<serde_json::Value>("/api/categories", RequestOptions::get())
        .await
        .expect_err("fails");

    assert_eq!(
        err,
        ClientError::Request {
            status: Some(500),
            message: "database unavailable".to_string(),
            attempts: 3,
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn connection_errors_consume_attempts() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = client_for(&format!("http://{addr}"), logged_in("access-1"));
    let start = std::time::Instant::now();
    let err = client
        .call::<serde_json::Value>(
            "/api/recipes",
            RequestOptions::get().timeout(Duration::from_millis(500)),
        )
        .await
        .expect_err("unreachable");

    match err {
        ClientError::Request {
            status: None,
            attempts,
            ..
        } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(start.elapsed() >= Duration::from_millis(20));
}
