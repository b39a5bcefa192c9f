mod harness;

use harness::config::ConfigBuilder;
use harness::mock_account::MockAccount;
use harness::server::TestServer;

fn messages_body() -> serde_json::Value {
    serde_json::json!({
        "model": "claude-sonnet-4",
        "max_tokens": 64,
        "messages": [{"role": "user", "content": "Hello"}]
    })
}

#[tokio::test]
async fn native_path_uses_family_key_header() {
    let claude = MockAccount::start("claude", &["claude-sonnet-4"]).await.unwrap();

    let config = ConfigBuilder::new()
        .with_account_ext(1, "claude", &claude.base_url(), Some("openai,claude"))
        .build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/messages"))
        .bearer_auth("caller-token")
        .json(&messages_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let headers = claude.last_headers().unwrap();
    assert_eq!(headers["x-api-key"], "sk-claude");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert!(headers.get("authorization").is_none());
}

#[tokio::test]
async fn other_accounts_get_bearer_auth() {
    let relay = MockAccount::start("relay", &["claude-sonnet-4"]).await.unwrap();

    let config = ConfigBuilder::new().with_account(1, "relay", &relay.base_url()).build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/messages"))
        .bearer_auth("caller-token")
        .json(&messages_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let headers = relay.last_headers().unwrap();
    assert_eq!(headers["authorization"], "Bearer sk-relay");
    assert!(headers.get("x-api-key").is_none());
}
