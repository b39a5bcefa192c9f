mod harness;

use harness::config::ConfigBuilder;
use harness::mock_account::MockAccount;
use harness::server::TestServer;

async fn list(server: &TestServer, opt_in: bool) -> serde_json::Value {
    let mut request = server.client().get(server.url("/v1/models"));
    if opt_in {
        request = request.header("x-enable-claude", "true");
    }

    let resp = request.send().await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

fn ids(list: &serde_json::Value) -> Vec<&str> {
    list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn listing_merges_accounts() {
    let a = MockAccount::start("a", &["o3", "gpt-4o"]).await.unwrap();
    let b = MockAccount::start("b", &["gpt-4o", "claude-sonnet-4"]).await.unwrap();

    let config = ConfigBuilder::new()
        .with_account(1, "a", &a.base_url())
        .with_account(2, "b", &b.base_url())
        .build();
    let server = TestServer::start(config).await.unwrap();

    let listing = list(&server, false).await;
    assert_eq!(listing["object"], "list");
    assert_eq!(listing["success"], true);
    assert_eq!(ids(&listing), vec!["gpt-4o", "o3"]);

    let gpt = &listing["data"][0];
    assert_eq!(gpt["owned_by"], "a, b");
    assert_eq!(gpt["created"], 1_700_000_000);
}

#[tokio::test]
async fn hidden_family_needs_opt_in() {
    let b = MockAccount::start("b", &["gpt-4o", "claude-sonnet-4"]).await.unwrap();

    let config = ConfigBuilder::new().with_account(1, "b", &b.base_url()).build();
    let server = TestServer::start(config).await.unwrap();

    assert_eq!(ids(&list(&server, false).await), vec!["gpt-4o"]);
    assert_eq!(ids(&list(&server, true).await), vec!["claude-sonnet-4", "gpt-4o"]);
}
