mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use healthkb::api::{create_router, AppState};

use common::{
    query_service, stub_state, test_config, StubChatStore, StubIngestionClient, StubKnowledgeBase,
    DS_ID, KB_ID,
};

struct Harness {
    kb: Arc<StubKnowledgeBase>,
    store: Arc<StubChatStore>,
    ingestion: Arc<StubIngestionClient>,
    app: Router,
}

fn harness_with(kb: Arc<StubKnowledgeBase>, store: Arc<StubChatStore>, api_keys: Vec<String>) -> Harness {
    let ingestion = StubIngestionClient::new();
    let app = create_router(stub_state(kb.clone(), store.clone(), ingestion.clone(), api_keys));
    Harness {
        kb,
        store,
        ingestion,
        app,
    }
}

fn harness(answer: &str) -> Harness {
    harness_with(StubKnowledgeBase::answering(answer), StubChatStore::new(), Vec::new())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_text(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn dialog_body(source: &str, question: Option<&str>) -> Value {
    let slot = match question {
        Some(q) => json!({"value": {"originalValue": q, "interpretedValue": q}}),
        None => Value::Null,
    };
    json!({
        "invocationSource": source,
        "sessionId": "s-1",
        "inputTranscript": "transcript text",
        "sessionState": {"intent": {"name": "AskHealthQuestion", "slots": {"question": slot}}}
    })
}

#[tokio::test]
async fn query_json_body_returns_question_and_response() {
    let h = harness("Stay hydrated.");

    let (status, body) = send(
        &h.app,
        post_json("/query", json!({"question": "How to avoid heatstroke?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"question": "How to avoid heatstroke?", "response": "Stay hydrated."})
    );
    assert_eq!(h.store.all().len(), 1);
}

#[tokio::test]
async fn query_raw_text_body_is_the_question() {
    let h = harness("Sleep 7-9 hours.");

    let (status, body) = send(&h.app, post_text("/query", "How much sleep do adults need?")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "How much sleep do adults need?");
    assert_eq!(body["response"], "Sleep 7-9 hours.");
    assert_eq!(h.kb.calls()[0].text, "How much sleep do adults need?");
}

#[tokio::test]
async fn query_many_questions_round_trip() {
    let h = harness("R");
    for question in ["a", "What is a normal resting heart rate?", "ünïcödé question?"] {
        let (status, body) = send(&h.app, post_json("/query", json!({"question": question}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"question": question, "response": "R"}));
    }
    assert_eq!(h.store.all().len(), 3);
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let h = harness("unused");

    let (status, body) = send(&h.app, post_text("/query", "   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_request");

    let (status, body) = send(&h.app, post_json("/query", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing required field: question");

    assert!(h.kb.calls().is_empty());
}

#[tokio::test]
async fn store_failure_is_not_a_silent_success() {
    let h = harness_with(
        StubKnowledgeBase::answering("generated"),
        StubChatStore::failing(),
        Vec::new(),
    );

    let (status, body) = send(&h.app, post_json("/query", json!({"question": "q"}))).await;

    assert!(status.is_server_error());
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn generation_failure_is_5xx() {
    let h = harness_with(StubKnowledgeBase::failing(), StubChatStore::new(), Vec::new());

    let (status, _) = send(&h.app, post_json("/query", json!({"question": "q"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(h.store.all().is_empty());
}

#[tokio::test]
async fn stored_chat_can_be_fetched() {
    let h = harness("Answer.");
    send(&h.app, post_json("/query", json!({"question": "Q?"}))).await;
    let id = h.store.all()[0].id.clone();

    let (status, body) = send(
        &h.app,
        Request::get(format!("/chats/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["response"], "Answer.");

    let (status, body) = send(
        &h.app,
        Request::get("/chats/unknown").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn dialog_elicits_closes_and_delegates() {
    let h = harness("Use sunscreen.");

    let (status, body) = send(&h.app, post_json("/dialog", dialog_body("DialogCodeHook", None))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionState"]["dialogAction"]["type"], "ElicitSlot");
    assert_eq!(body["sessionState"]["dialogAction"]["slotToElicit"], "question");
    assert_eq!(body["sessionState"]["intent"]["name"], "AskHealthQuestion");

    let (_, body) = send(
        &h.app,
        post_json("/dialog", dialog_body("DialogCodeHook", Some("skin cancer prevention"))),
    )
    .await;
    assert_eq!(body["sessionState"]["dialogAction"]["type"], "Close");
    assert_eq!(body["sessionState"]["intent"]["state"], "Fulfilled");
    assert_eq!(body["messages"][0]["content"], "Use sunscreen.");
    assert_eq!(body["messages"][0]["contentType"], "PlainText");

    let (_, body) = send(
        &h.app,
        post_json("/dialog", dialog_body("FulfillmentCodeHook", Some("anything"))),
    )
    .await;
    assert_eq!(body["sessionState"]["dialogAction"]["type"], "Delegate");

    assert_eq!(h.kb.calls().len(), 1);
}

#[tokio::test]
async fn malformed_dialog_event_is_bad_request() {
    let h = harness("unused");

    let (status, body) = send(&h.app, post_json("/dialog", dialog_body("Unknown", None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_request");

    let (status, _) = send(&h.app, post_json("/dialog", json!({"invocationSource": "DialogCodeHook"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn storage_event(request_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/events/storage").header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = request_id {
        builder = builder.header("lambda-runtime-aws-request-id", id);
    }
    let body = json!({
        "Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {"bucket": {"name": "health-docs"}, "object": {"key": "guides/diabetes.pdf"}}
        }]
    });
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn storage_event_starts_ingestion_job() {
    let h = harness("unused");

    let (status, body) = send(&h.app, storage_event(Some("req-1"))).await;

    assert_eq!(status, StatusCode::OK);
    let job = &body["ingestionJob"];
    assert_eq!(job["knowledgeBaseId"], KB_ID);
    assert_eq!(job["dataSourceId"], DS_ID);
    assert_eq!(job["status"], "STARTING");
    assert_eq!(job["clientToken"], h.ingestion.tokens()[0].as_str());
}

#[tokio::test]
async fn redelivered_event_reuses_client_token() {
    let h = harness("unused");

    send(&h.app, storage_event(Some("req-1"))).await;
    send(&h.app, storage_event(Some("req-1"))).await;
    send(&h.app, storage_event(Some("req-2"))).await;

    let tokens = h.ingestion.tokens();
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0], tokens[1]);
    assert_ne!(tokens[0], tokens[2]);
}

#[tokio::test]
async fn lambda_context_header_is_preferred() {
    let h = harness("unused");
    let body = json!({"Records": []}).to_string();

    for runtime_id in ["rt-1", "rt-2"] {
        let request = Request::post("/events/storage")
            .header("x-amzn-lambda-context", r#"{"request_id":"ctx-1"}"#)
            .header("lambda-runtime-aws-request-id", runtime_id)
            .body(Body::from(body.clone()))
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let tokens = h.ingestion.tokens();
    assert_eq!(tokens[0], tokens[1]);
}

#[tokio::test]
async fn event_without_request_id_uses_generated_one() {
    let h = harness("unused");

    let (status, body) = send(&h.app, storage_event(None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["ingestionJob"].is_object());
    assert_eq!(h.ingestion.tokens().len(), 1);
}

#[tokio::test]
async fn storage_test_event_does_not_start_a_job() {
    let h = harness("unused");
    let request = post_json(
        "/events/storage",
        json!({"Service": "Amazon S3", "Event": "s3:TestEvent", "Bucket": "health-docs"}),
    );

    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ingestionJob": null}));
    assert!(h.ingestion.tokens().is_empty());
}

#[tokio::test]
async fn ingestion_job_status_route() {
    let h = harness("unused");

    let (status, body) = send(
        &h.app,
        Request::get("/ingestion-jobs/JOB7").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ingestionJobId"], "JOB7");
    assert_eq!(body["status"], "COMPLETE");

    let (status, _) = send(
        &h.app,
        Request::get("/ingestion-jobs/missing").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_flows_are_unavailable() {
    let query_only = AppState::new(
        test_config(Vec::new()),
        Some(query_service(StubKnowledgeBase::answering("x"), StubChatStore::new())),
        None,
    );
    let app = create_router(query_only);

    let (status, body) = send(&app, storage_event(Some("req-1"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "service_unavailable");

    let ingestion_only = AppState::new(
        test_config(Vec::new()),
        None,
        Some(common::ingestion_service(StubIngestionClient::new())),
    );
    let app = create_router(ingestion_only);

    let (status, _) = send(&app, post_json("/query", json!({"question": "q"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = send(&app, post_json("/dialog", dialog_body("DialogCodeHook", None))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], false);
    assert_eq!(body["ingestion"], true);
}

#[tokio::test]
async fn health_reports_enabled_flows() {
    let h = harness("unused");

    let (status, body) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["query"], true);
    assert_eq!(body["ingestion"], true);
    assert_eq!(body["chatStore"], "memory");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let h = harness("unused");

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "caller-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "caller-id");
}

#[tokio::test]
async fn api_keys_protect_everything_but_health_and_docs() {
    let h = harness_with(
        StubKnowledgeBase::answering("ok"),
        StubChatStore::new(),
        vec!["secret-key".to_string()],
    );

    let (status, body) = send(&h.app, post_json("/query", json!({"question": "q"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let request = Request::post("/query")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("q"))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::post("/query")
        .header(header::AUTHORIZATION, "Bearer secret-key")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("q"))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&h.app, Request::get("/openapi.json").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/query"].is_object());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let h = harness("unused");
    let big = "x".repeat(128 * 1024);
    let request = Request::post("/query")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, big.len())
        .body(Body::from(big))
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(h.kb.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_without_content_length_is_rejected() {
    let h = harness("unused");
    let request = Request::post("/query")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("x".repeat(128 * 1024)))
        .unwrap();

    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "payload_too_large");
    assert!(h.kb.calls().is_empty());
}
