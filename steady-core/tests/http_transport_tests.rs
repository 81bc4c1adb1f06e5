//! Transport tests against a mocked completion endpoint

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use steady_core::config::{ConnectionConfig, SecretString};
use steady_core::http::{HttpTransport, Transport, TransportError};
use steady_core::logging::{LogLevel, MemorySink};
use steady_core::protocol::{ChatRequest, Message};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer, sink: Arc<MemorySink>) -> HttpTransport {
    transport_with(server, sink, ConnectionConfig::default())
}

fn transport_with(
    server: &MockServer,
    sink: Arc<MemorySink>,
    connection: ConnectionConfig,
) -> HttpTransport {
    HttpTransport::new(
        format!("{}/v1", server.uri()),
        SecretString::new("sk-test-key"),
        &connection,
        sink,
    )
    .expect("transport builds")
}

fn request(stream: bool) -> ChatRequest {
    ChatRequest::new("gpt-test", vec![Message::user("Say hello")])
        .with_temperature(0.5)
        .with_streaming(stream)
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
    })
}

fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    body.push_str(
        "data: {\"id\":\"c1\",\"model\":\"gpt-test\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    );
    for fragment in fragments {
        let chunk = json!({
            "id": "c1",
            "model": "gpt-test",
            "choices": [{ "index": 0, "delta": { "content": fragment } }]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: {\"id\":\"c1\",\"model\":\"gpt-test\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn test_non_streaming_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(header_exists("x-request-id"))
        .and(body_partial_json(json!({
            "model": "gpt-test",
            "stream": false,
            "temperature": 0.5,
            "messages": [{ "role": "user", "content": "Say hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hello there")))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let text = transport(&server, sink.clone())
        .send(&request(false))
        .await
        .unwrap();

    assert_eq!(text, "Hello there");
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_streaming_concatenates_fragments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Hel", "lo", " ", "there"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let text = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(true))
        .await
        .unwrap();

    assert_eq!(text, "Hello there");
}

#[tokio::test]
async fn test_streaming_matches_non_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("The answer is 42.")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["The ", "answer ", "is ", "42."]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let transport = transport(&server, Arc::new(MemorySink::new()));
    let whole = transport.send(&request(false)).await.unwrap();
    let streamed = transport.send(&request(true)).await.unwrap();

    assert_eq!(whole, streamed);
}

#[tokio::test]
async fn test_stream_without_done_marker_ends_at_body_end() {
    let server = MockServer::start().await;
    let body = sse_body(&["partial ", "answer"]).replace("data: [DONE]\n\n", "");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let text = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(true))
        .await
        .unwrap();
    assert_eq!(text, "partial answer");
}

#[tokio::test]
async fn test_malformed_stream_chunk_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"choices\": [\n\ndata: [DONE]\n\n", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = transport(&server, sink.clone()).send(&request(true)).await;

    assert!(matches!(result, Err(TransportError::Stream(_))));
    assert_eq!(sink.matching("Error in send").len(), 1);
}

#[tokio::test]
async fn test_stream_request_answered_with_json_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "streaming unsupported" }
        })))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = transport(&server, sink.clone()).send(&request(true)).await;

    match result {
        Err(TransportError::Parse(message)) => assert!(message.contains("text/event-stream")),
        other => panic!("expected parse error, got {:?}", other),
    }
    assert_eq!(sink.matching("Error in send").len(), 1);
}

#[tokio::test]
async fn test_server_error_is_logged_to_sink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "overloaded", "type": "server_error" }
        })))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let result = transport(&server, sink.clone()).send(&request(false)).await;

    match result {
        Err(TransportError::Status { status, message }) => {
            assert_eq!(status, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Error);
    assert!(entries[0].message.starts_with("Error in send"));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({ "error": { "message": "slow down" } })),
        )
        .mount(&server)
        .await;

    let err = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(false))
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(false))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Authentication { .. }));
}

#[tokio::test]
async fn test_invalid_json_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{not json", "application/json"),
        )
        .mount(&server)
        .await;

    let err = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(false))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Parse(_)));
}

#[tokio::test]
async fn test_no_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-test",
            "choices": []
        })))
        .mount(&server)
        .await;

    let err = transport(&server, Arc::new(MemorySink::new()))
        .send(&request(false))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::EmptyResponse);
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let connection = ConnectionConfig {
        request_timeout_ms: 100,
        ..ConnectionConfig::default()
    };
    let err = transport_with(&server, Arc::new(MemorySink::new()), connection)
        .send(&request(false))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::Timeout);
}
