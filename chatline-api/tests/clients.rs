use anyhow::Result;
use assert_matches::assert_matches;
use chatline_api::ApiError;
use chatline_api::ApiKeyAuth;
use chatline_api::Backend;
use chatline_api::LoadApi;
use chatline_api::LoadClient;
use chatline_api::MessagesApi;
use chatline_api::MessagesClient;
use chatline_api::Provider;
use chatline_api::RemoteMessage;
use chatline_api::Role;
use chatline_api::RunsApi;
use chatline_api::RunsClient;
use chatline_api::ThreadListOptions;
use chatline_api::ThreadMessage;
use chatline_api::ThreadsApi;
use chatline_api::ThreadsClient;
use chatline_api::services::CreateMessageRequest;
use chatline_api::services::CreateThreadRequest;
use chatline_api::services::RunStreamRequest;
use chatline_api::services::UpdateThreadRequest;
use chatline_client::ReqwestTransport;
use chrono::Utc;
use futures::StreamExt;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

const API_KEY: &str = "test-key";

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(reqwest::Client::new())
}

fn provider(server: &MockServer) -> Provider {
    Provider::new(server.uri())
}

fn auth() -> ApiKeyAuth {
    ApiKeyAuth::new(Some(API_KEY.to_string()))
}

fn sse(events: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream")
}

#[tokio::test]
async fn thread_endpoints_use_expected_paths_and_bodies() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"external_id": "ext-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"thread_id": "t-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/threads/t-1"))
        .and(body_json(json!({"title": "Renamed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/threads/t-1"))
        .and(body_json(json!({"is_archived": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/threads/t-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "threads": [
                {"id": "t-1", "title": "Renamed", "is_archived": true, "external_id": "ext-1"},
                {"id": "t-2", "title": "Other", "is_archived": false}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ThreadsClient::new(transport(), provider(&server), auth());
    let created = client
        .create(CreateThreadRequest {
            last_message_at: Utc::now(),
            external_id: Some("ext-1".to_string()),
        })
        .await?;
    assert_eq!(created.thread_id, "t-1");

    client
        .update(
            "t-1",
            UpdateThreadRequest {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await?;
    client
        .update(
            "t-1",
            UpdateThreadRequest {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .await?;
    client.delete("t-1").await?;

    let threads = client.list().await?;
    assert_eq!(threads.len(), 2);
    assert!(threads[0].is_archived);
    assert_eq!(threads[1].external_id, None);
    Ok(())
}

#[tokio::test]
async fn message_endpoints_round_trip() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/t-1/messages"))
        .and(body_json(json!({
            "parent_id": "m-0",
            "format": "aui/v0",
            "content": {"role": "user", "content": [{"type": "text", "text": "hi"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message_id": "m-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/t-1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "m-1", "parent_id": "m-0", "format": "aui/v0", "content": {}},
                {"id": "m-0", "format": "other", "content": null}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MessagesClient::new(transport(), provider(&server), auth());
    let created = client
        .create(
            "t-1",
            CreateMessageRequest {
                parent_id: Some("m-0".to_string()),
                format: "aui/v0".to_string(),
                content: json!({"role": "user", "content": [{"type": "text", "text": "hi"}]}),
            },
        )
        .await?;
    assert_eq!(created.message_id, "m-1");

    let listed = client.list("t-1").await?;
    assert_eq!(listed[0].id.as_deref(), Some("m-1"));
    assert_eq!(listed[1].parent_id, None);
    Ok(())
}

#[tokio::test]
async fn malformed_json_reply_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ThreadsClient::new(transport(), provider(&server), auth());
    let result = client.list().await;

    assert_matches!(
        result,
        Err(ApiError::InvalidResponse { endpoint: "threads.list", .. })
    );
}

#[tokio::test]
async fn failed_status_maps_to_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/threads/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ThreadsClient::new(transport(), provider(&server), auth());
    let result = client.delete("missing").await;

    assert_matches!(
        result,
        Err(ApiError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn run_stream_requests_event_stream_and_decodes_events() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/runs/stream"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({
            "thread_id": "t-1",
            "assistant_id": "system/thread_title",
            "messages": [{"role": "user", "content": [{"type": "text", "text": "hello"}]}]
        })))
        .respond_with(sse_response(sse(&[
            json!({"type": "text", "message": {"content": "Greet", "role": "assistant"}}),
            json!({"type": "text", "message": {"content": "Greetings", "role": "assistant"}}),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = RunsClient::new(transport(), provider(&server), auth());
    let stream = client
        .stream(
            RunStreamRequest {
                thread_id: "t-1".to_string(),
                assistant_id: "system/thread_title".to_string(),
                messages: vec![(&ThreadMessage::text("m", Role::User, "hello")).into()],
            },
            CancellationToken::new(),
        )
        .await?;
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 2);
    assert_matches!(&events[1], Ok(RemoteMessage::Text(text)) if text.content == "Greetings");
    Ok(())
}

#[tokio::test]
async fn title_generation_returns_last_text() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/runs/stream"))
        .and(body_partial_json(json!({"assistant_id": "system/thread_title"})))
        .respond_with(sse_response(sse(&[
            json!({"type": "text", "message": {"content": "Weekly", "role": "assistant"}}),
            json!({"type": "text", "message": {"content": "Weekly revenue", "role": "assistant"}}),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = Backend::remote(transport(), provider(&server), auth());
    let adapter = backend.thread_list(ThreadListOptions::default());
    let title = adapter
        .generate_title(
            "t-1",
            &[ThreadMessage::text("m", Role::User, "show weekly revenue")],
            CancellationToken::new(),
        )
        .await?
        .last_text()
        .await?;

    assert_eq!(title.as_deref(), Some("Weekly revenue"));
    Ok(())
}

#[tokio::test]
async fn load_sends_chat_id_header_and_body() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/load"))
        .and(header("x-chat-id", "chat-9"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(json!({"chatId": "chat-9", "message": "show revenue"})))
        .respond_with(sse_response(sse(&[json!({
            "type": "metric",
            "message": {"metrics": ["revenue"], "data": [{"revenue": 10}]}
        })])))
        .expect(1)
        .mount(&server)
        .await;

    let client = LoadClient::new(transport(), provider(&server), auth());
    let events: Vec<_> = client
        .load_chat_message("chat-9", "show revenue", CancellationToken::new())
        .await?
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert_matches!(&events[0], Ok(RemoteMessage::Metric(metric)) if metric.metrics == vec!["revenue"]);
    Ok(())
}

#[tokio::test]
async fn non_streaming_reply_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/load"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": {"message": "quota exceeded"}})),
        )
        .mount(&server)
        .await;

    let client = LoadClient::new(transport(), provider(&server), auth());
    let result = client
        .load_chat_message("chat-9", "hi", CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(ApiError::NonStreamingResponse { server_message }) if server_message == "quota exceeded"
    );
}

#[tokio::test]
async fn streaming_error_status_is_reported_before_reading_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/load"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = LoadClient::new(transport(), provider(&server), auth());
    let result = client
        .load_chat_message("chat-9", "hi", CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(ApiError::HttpStatus { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn bodiless_error_status_keeps_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/load"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = LoadClient::new(transport(), provider(&server), auth());
    let result = client
        .load_chat_message("chat-9", "hi", CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(ApiError::HttpStatus { status, .. }) if status == StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn cancelling_while_request_is_in_flight_aborts_with_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/load"))
        .respond_with(sse_response(sse(&[])).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let client = LoadClient::new(transport(), provider(&server), auth());
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        client.load_chat_message("chat-9", "hi", cancel),
    )
    .await
    .unwrap_or_else(|_| panic!("cancellation did not abort the request"));

    assert_matches!(result, Err(ApiError::Cancelled));
}
