use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use docqa_core::{builtin_local_models, EmbeddingRegistry, MemoryStore, Settings};
use docqa_server::routes::router;
use docqa_server::state::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

// The router under test runs against the in-memory store with only the
// local embedding models registered and no completion backend, so no
// request here touches the network or a database.
fn test_router() -> Router {
    let mut registry = EmbeddingRegistry::new(LOCAL_MODEL);
    for model in builtin_local_models() {
        registry.register(Arc::new(model));
    }

    let settings = Settings {
        default_embedding_model: LOCAL_MODEL.to_string(),
        ..Settings::default()
    };

    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(registry),
        Vec::new(),
        Arc::new(settings),
    );
    router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(uri: &str, method: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app: Router = test_router();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn asking_without_documents_returns_the_empty_retrieval_answer() {
    let app = test_router();
    let response = app
        .oneshot(json_request(
            "/qa/ask",
            "POST",
            json!({ "question": "what does the manual say about pressure?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["answer"],
        "No relevant documents were found for this question."
    );
    assert!(body["data"]["relevant_documents"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let app = test_router();
    let response = app
        .oneshot(json_request("/qa/ask", "POST", json!({ "question": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn feedback_on_unknown_answer_is_not_found() {
    let app = test_router();
    let response = app
        .oneshot(json_request(
            "/qa/answers/8e2c2f0a-9bd1-4f6e-8f4e-0d1a40b3c111",
            "PATCH",
            json!({ "is_positive": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn zero_byte_upload_is_a_validation_error() {
    let app = test_router();
    let boundary = "docqa-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"empty.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         \r\n--{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("empty upload"));
}

#[tokio::test]
async fn unknown_document_delete_is_not_found() {
    let app = test_router();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/upload/8e2c2f0a-9bd1-4f6e-8f4e-0d1a40b3c111")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn text_embedding_test_runs_on_local_models() {
    let app = test_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "/embedding-test/test-with-text",
            "POST",
            json!({
                "question": "what is machine learning",
                "model_names": [LOCAL_MODEL],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entry = &body["data"]["results"][LOCAL_MODEL];
    assert_eq!(entry["status"], "success");
    assert_eq!(entry["results"].as_array().unwrap().len(), 3);

    // The run is recorded write-once and shows up in the test history.
    let history = app
        .oneshot(
            Request::builder()
                .uri("/embedding-test/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history_body = body_json(history).await;
    assert_eq!(history_body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unavailable_models_are_reported_not_crashed() {
    let app = test_router();
    let response = app
        .oneshot(json_request(
            "/embedding-test/test-with-text",
            "POST",
            json!({
                "question": "what is machine learning",
                "model_names": ["text-embedding-ada-002"],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["results"]["text-embedding-ada-002"]["status"],
        "error"
    );
}

#[tokio::test]
async fn available_models_lists_unregistered_backends_as_unavailable() {
    let app = test_router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/embedding-test/available-models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ada = &body["data"]["text-embedding-ada-002"];
    assert_eq!(ada["available"], false);
    assert_eq!(ada["dimension"], 1536);

    let local = &body["data"][LOCAL_MODEL];
    assert_eq!(local["available"], true);
}

#[tokio::test]
async fn statistics_start_empty() {
    let app = test_router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/history/statistics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["documents"]["total"], 0);
    assert_eq!(body["data"]["qa"]["total_questions"], 0);
}

#[tokio::test]
async fn malformed_date_filter_is_rejected() {
    let app = test_router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/history/documents?date_from=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
