//! End-to-end tests of the relay against a mock upstream.

use std::time::Duration;

use axum::http::StatusCode;
use llm_relay::config::ErrorPassthrough;
use serde_json::{json, Value};

mod common;

use common::{client, relay_config, start_fixed_upstream, start_programmable_upstream, start_relay, MockReply, TEST_KEY};

const COMPLETION: &str = r#"{"id":"gen-42","object":"chat.completion","model":"openai/gpt-4o-mini","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there"},"finish_reason":"stop"}]}"#;

#[tokio::test]
async fn test_missing_key_returns_500_without_upstream_call() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let mut config = relay_config(&upstream);
    config.upstream.api_key = None;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "server_misconfigured");
    assert!(body["message"].as_str().unwrap().contains("misconfigured"));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_success_is_relayed_verbatim() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), COMPLETION);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_outbound_call_shape() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let mut config = relay_config(&upstream);
    config.upstream.title = Some("Relay Tests".into());
    let relay = start_relay(config).await;

    client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "What is 2+2?", "temperature": 0.7}))
        .send()
        .await
        .unwrap();

    let calls = upstream.recorded();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.authorization.as_deref(), Some(format!("Bearer {}", TEST_KEY).as_str()));
    assert_eq!(call.content_type.as_deref(), Some("application/json"));
    assert_eq!(call.title.as_deref(), Some("Relay Tests"));
    assert_eq!(
        call.body,
        json!({
            "model": "openai/gpt-4o-mini",
            "messages": [{"role": "user", "content": "What is 2+2?"}],
            "max_tokens": 300,
            "temperature": 0.7,
        })
    );
}

#[tokio::test]
async fn test_provider_payload_is_forwarded_unchanged() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let payload = json!({
        "model": "anthropic/claude-3-haiku",
        "messages": [
            {"role": "system", "content": "Answer in one word."},
            {"role": "user", "content": "Capital of France?"}
        ],
        "max_tokens": 5,
        "stream": false,
    });

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(upstream.recorded()[0].body, payload);
}

#[tokio::test]
async fn test_server_errors_are_retried_then_502() {
    let upstream = start_fixed_upstream(503, "Service Unavailable").await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream_unavailable");
    assert_eq!(body["attempts"], 2);
    assert_eq!(body["last_failure"]["status"], 503);
    assert_eq!(upstream.calls(), 2, "one attempt plus one retry");
}

#[tokio::test]
async fn test_larger_retry_budget() {
    let upstream = start_fixed_upstream(500, "boom").await;
    let mut config = relay_config(&upstream);
    config.retries.retry_budget = 3;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(upstream.calls(), 4);
}

#[tokio::test]
async fn test_recovers_after_one_server_error() {
    let upstream = start_programmable_upstream(|call| {
        if call == 0 {
            MockReply::new(502, "bad gateway")
        } else {
            MockReply::new(200, COMPLETION)
        }
    })
    .await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), COMPLETION);
    assert_eq!(upstream.calls(), 2);
    assert_eq!(upstream.recorded()[0].body, upstream.recorded()[1].body);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let upstream = start_fixed_upstream(429, r#"{"error":{"code":429,"message":"Rate limit exceeded"}}"#).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"error":{"code":429,"message":"Rate limit exceeded"}}"#
    );
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_client_error_json_envelope() {
    let upstream = start_fixed_upstream(401, "No auth credentials found").await;
    let mut config = relay_config(&upstream);
    config.responses.error_passthrough = ErrorPassthrough::Json;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(body["upstream_status"], 401);
    assert_eq!(body["body"], "No auth credentials found");
}

#[tokio::test]
async fn test_html_reply_becomes_502() {
    let upstream = start_fixed_upstream(200, "<!DOCTYPE html><html><body>Cloudflare</body></html>").await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream_html_response");
    assert!(body["preview"].as_str().unwrap().starts_with("<!DOCTYPE html>"));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_non_json_success_is_wrapped() {
    let upstream = start_fixed_upstream(200, "").await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"ok": true, "raw": ""}));
}

#[tokio::test]
async fn test_slow_attempt_times_out_and_is_retried() {
    let upstream = start_programmable_upstream(|call| {
        if call == 0 {
            MockReply::new(200, COMPLETION).delayed(Duration::from_secs(2))
        } else {
            MockReply::new(200, COMPLETION)
        }
    })
    .await;
    let mut config = relay_config(&upstream);
    config.timeouts.attempt_ms = 200;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_timeouts_exhaust_budget() {
    let upstream = start_programmable_upstream(|_| {
        MockReply::new(200, COMPLETION).delayed(Duration::from_secs(2))
    })
    .await;
    let mut config = relay_config(&upstream);
    config.timeouts.attempt_ms = 100;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["last_failure"]["kind"], "timed_out");
    assert_eq!(body["last_failure"]["timeout_ms"], 100);
}

#[tokio::test]
async fn test_preflight_never_reaches_upstream() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client()
        .request(reqwest::Method::OPTIONS, relay.url("/api/myapi"))
        .header("origin", "https://random.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type, x-app-version")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(
        res.headers()["access-control-allow-headers"],
        "content-type, x-app-version"
    );
    assert!(res.headers().contains_key("access-control-expose-headers"));
    assert!(res.text().await.unwrap().is_empty());
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_allowlisted_origin_gets_credentials() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let mut config = relay_config(&upstream);
    config.cors.allowed_origins = vec!["https://chat.example.com".into()];
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .header("origin", "https://chat.example.com")
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "https://chat.example.com");
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_health_probe() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client().get(relay.url("/_health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_oversize_body_is_rejected_before_upstream() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let mut config = relay_config(&upstream);
    config.security.max_body_size = 64;
    let relay = start_relay(config).await;

    let res = client()
        .post(relay.url("/api/myapi"))
        .json(&json!({"prompt": "x".repeat(200)}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "payload_too_large");
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_wrong_method_is_json_405() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;

    let res = client().get(relay.url("/api/myapi")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let upstream = start_fixed_upstream(200, COMPLETION).await;
    let relay = start_relay(relay_config(&upstream)).await;
    let client = client();

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        let url = relay.url("/api/myapi");
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({"prompt": format!("question {}", i)}))
                .send()
                .await
                .map(|res| res.status())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), StatusCode::OK);
    }
    assert_eq!(upstream.calls(), 8);

    let mut prompts: Vec<String> = upstream
        .recorded()
        .iter()
        .map(|call| call.body["messages"][0]["content"].as_str().unwrap().to_string())
        .collect();
    prompts.sort();
    let mut expected: Vec<String> = (0..8).map(|i| format!("question {}", i)).collect();
    expected.sort();
    assert_eq!(prompts, expected);
}
