mod harness;

use futures_util::StreamExt;
use harness::config::ConfigBuilder;
use harness::mock_account::MockAccount;
use harness::server::TestServer;

fn streaming_body(model: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "Hello"}],
        "stream": true
    })
}

/// Parse SSE event lines from raw response text
fn parse_sse_data(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("data: "))
        .map(|line| line.trim_start_matches("data: ").to_owned())
        .collect()
}

#[tokio::test]
async fn stream_is_relayed_unchanged() {
    let mock = MockAccount::start("a", &["gpt-4o"]).await.unwrap();
    let config = ConfigBuilder::new().with_account(1, "a", &mock.base_url()).build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .json(&streaming_body("gpt-4o"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(
        content_type.contains("text/event-stream"),
        "expected text/event-stream, got {content_type}"
    );
    assert_eq!(resp.headers()["x-mock-account"], "a");

    let text = resp.text().await.unwrap();
    let events = parse_sse_data(&text);

    assert_eq!(events.len(), 5);
    assert_eq!(events.last().map(String::as_str), Some("[DONE]"));

    let content: String = events[..4]
        .iter()
        .map(|e| {
            let chunk: serde_json::Value = serde_json::from_str(e).unwrap();
            chunk["choices"][0]["delta"]["content"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(content, "Hello from a");
}

#[tokio::test]
async fn stream_arrives_incrementally() {
    let mock = MockAccount::start("a", &["gpt-4o"]).await.unwrap();
    let config = ConfigBuilder::new().with_account(1, "a", &mock.base_url()).build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .json(&streaming_body("gpt-4o"))
        .send()
        .await
        .unwrap();

    let mut chunks = resp.bytes_stream();
    let mut received = 0;
    while let Some(chunk) = chunks.next().await {
        assert!(!chunk.unwrap().is_empty());
        received += 1;
    }

    // The mock pauses between events, so they cannot all arrive as one frame
    assert!(received > 1, "expected several frames, got {received}");
}

#[tokio::test]
async fn failed_account_before_stream_is_retried() {
    let flaky = MockAccount::start_failing("flaky", &["gpt-4o"], 500).await.unwrap();
    let steady = MockAccount::start("steady", &["gpt-4o"]).await.unwrap();

    let config = ConfigBuilder::new()
        .with_account(1, "flaky", &flaky.base_url())
        .with_account(2, "steady", &steady.base_url())
        .build();

    let server = TestServer::start(config).await.unwrap();

    for _ in 0..3 {
        let resp = server
            .client()
            .post(server.url("/v1/chat/completions"))
            .json(&streaming_body("gpt-4o"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let events = parse_sse_data(&resp.text().await.unwrap());
        assert_eq!(events.last().map(String::as_str), Some("[DONE]"));
    }

    assert!(flaky.hits() <= 1);
    assert_eq!(steady.hits(), 3);
}
