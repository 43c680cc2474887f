//! Route-level tests: one-shot requests against the router with a scripted
//! model and an in-memory store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use lexdraft::chat::pipeline::Pacing;
use lexdraft::db::Database;
use lexdraft::llm::{GenerateText, LlmError};
use lexdraft::{routes, AppState};

struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

#[async_trait]
impl GenerateText for ScriptedModel {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.starts_with("Summarize the following message") {
            return Ok("Scripted Title".to_string());
        }
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| r#"{"content": "scripted answer"}"#.to_string()))
    }
}

struct TestApp {
    router: Router,
    token: String,
}

fn test_app(replies: Vec<String>) -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let user = db.create_user("counsel@example.com", None).unwrap();
    let token = db.create_session(&user.id).unwrap();
    let model = Arc::new(ScriptedModel {
        replies: Mutex::new(replies.into()),
    });
    let state = AppState::new(db, model, Pacing::immediate(50));
    TestApp {
        router: routes::router(state),
        token,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(app: &TestApp, uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .body(Body::empty())
        .unwrap()
}

fn with_json(app: &TestApp, method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn unauthenticated_requests_get_401() {
    let app = test_app(vec![]);
    let request = Request::builder()
        .method("GET")
        .uri("/chat")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_conversation_list_is_an_empty_collection() {
    let app = test_app(vec![]);
    let (status, body) = send(&app, get(&app, "/chat")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversations"], json!([]));
}

#[tokio::test]
async fn missing_required_params_get_400() {
    let app = test_app(vec![]);

    let request = Request::builder()
        .method("DELETE")
        .uri("/chat")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get(&app, "/messages")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_conversation_gets_404() {
    let app = test_app(vec![]);
    let (status, _) = send(&app, get(&app, "/chat?conversation_id=missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_round_trip_over_http() {
    let app = test_app(vec![
        r#"{"content": "An NDA protects confidential information.", "judgment": {"text": "ok"}, "sources": []}"#.to_string(),
    ]);

    let (status, body) = send(
        &app,
        with_json(&app, "POST", "/chat", json!({ "query": "what is an NDA?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversation_id = body["conversationId"].as_str().unwrap().to_string();
    assert_eq!(body["message"], "Request processed successfully");

    let (status, body) = send(
        &app,
        get(&app, &format!("/chat?conversation_id={conversation_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["conversation"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(
        messages[1]["content"],
        "An NDA protects confidential information."
    );
}

#[tokio::test]
async fn generation_failure_surfaces_as_500_with_notice() {
    let app = test_app(vec!["junk".to_string(), "more junk".to_string()]);

    let (status, _) = send(
        &app,
        with_json(&app, "POST", "/chat", json!({ "query": "draft something" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The fallback notice still reached the conversation.
    let (_, body) = send(&app, get(&app, "/chat")).await;
    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    let messages = conversations[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[1]["content"]
        .as_str()
        .unwrap()
        .contains("Could not generate a valid response"));
}

#[tokio::test]
async fn admin_bootstrap_token_works() {
    let app = test_app(vec![]);
    let (status, body) = send(
        &app,
        with_json(
            &app,
            "POST",
            "/admin/users",
            json!({ "email": "new@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("GET")
        .uri("/chat")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn document_version_chain_over_http() {
    let app = test_app(vec![]);

    let (status, body) = send(
        &app,
        with_json(
            &app,
            "POST",
            "/document",
            json!({ "title": "Lease", "content": "v1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);
    let document_id = body["documentId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        with_json(
            &app,
            "POST",
            "/document",
            json!({ "title": "Lease", "content": "v2", "documentId": document_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    // Editing a historical version is rejected.
    let (status, _) = send(
        &app,
        with_json(
            &app,
            "PATCH",
            "/document",
            json!({ "id": document_id, "version": 1, "content": "tamper" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Editing the latest version is allowed.
    let (status, _) = send(
        &app,
        with_json(
            &app,
            "PATCH",
            "/document",
            json!({ "id": document_id, "version": 2, "content": "v2 edited" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&app, &format!("/document?id={document_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let versions = body.as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1]["content"], "v2 edited");

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/document?id={document_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get(&app, &format!("/document?id={document_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_document_id_is_rejected() {
    let app = test_app(vec![]);
    let (status, _) = send(
        &app,
        with_json(
            &app,
            "POST",
            "/document",
            json!({ "documentId": "not-a-uuid" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subconversation_routes_round_trip() {
    let app = test_app(vec![
        r#"{"content": "root answer"}"#.to_string(),
    ]);

    let (_, body) = send(
        &app,
        with_json(&app, "POST", "/chat", json!({ "query": "root question" })),
    )
    .await;
    let root_id = body["conversationId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        with_json(
            &app,
            "POST",
            "/conversation/subconversation",
            json!({ "sourceText": "a cited source", "parentConversationId": root_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "subchat");
    assert_eq!(body["parent_conversation_id"], root_id.as_str());

    let (status, body) = send(&app, get(&app, "/conversation/subconversation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get(&app, "/conversation")).await;
    assert_eq!(status, StatusCode::OK);
    let roots = body.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["subConversations"].as_array().unwrap().len(), 1);
}
