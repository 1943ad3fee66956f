use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docgate_config::schema::{ExtractConfig, OcrConfig, SearchConfig};
use docgate_core::ObjectStore;
use docgate_gateway::{build_router, GatewayState};
use docgate_storage::MemoryObjectStore;
use docgate_understanding::{AutoRagClient, ExtractOrchestrator, MistralOcrClient};

const RAG_PATH: &str = "/accounts/acct/autorag/rags/docs";

fn state(store: &Arc<MemoryObjectStore>) -> GatewayState {
    GatewayState::new(store.clone())
}

fn search_client(server: &MockServer) -> AutoRagClient {
    let config = SearchConfig {
        api_token: Some("cf-token".into()),
        account_id: Some("acct".into()),
        rag_name: Some("docs".into()),
        base_url: server.uri(),
    };
    AutoRagClient::from_config(&config, reqwest::Client::new()).unwrap()
}

fn ocr_client(server: &MockServer) -> MistralOcrClient {
    let config = OcrConfig {
        api_key: Some("mistral-key".into()),
        base_url: server.uri(),
        ..OcrConfig::default()
    };
    MistralOcrClient::from_config(&config, reqwest::Client::new()).unwrap()
}

fn extractor(server: &MockServer, store: &Arc<MemoryObjectStore>) -> ExtractOrchestrator {
    let config = ExtractConfig {
        client_id: Some("adobe-id".into()),
        client_secret: Some("adobe-secret".into()),
        base_url: server.uri(),
        poll_attempts: 3,
        poll_interval_ms: 0,
        settle_delay_ms: 0,
    };
    ExtractOrchestrator::from_config(&config, reqwest::Client::new(), store.clone()).unwrap()
}

async fn mount_extract_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUri": format!("{}/upload/asset-7", server.uri()),
            "assetID": "asset-7"
        })))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/asset-7"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_extract_job(server: &MockServer) {
    mount_extract_upload(server).await;
    Mock::given(method("POST"))
        .and(path("/operation/extractpdf/jobs"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("location", format!("{}/jobs/7/status", server.uri())),
        )
        .mount(server)
        .await;
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn upload_then_download_returns_identical_bytes() {
    let store = Arc::new(MemoryObjectStore::new());
    let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let upload = Request::builder()
        .method("POST")
        .uri("/upload/reports/2024/q1.pdf")
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(bytes.clone()))
        .unwrap();
    let (status, _, body) = send(build_router(state(&store)), upload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"File uploaded as reports/2024/q1.pdf");

    let download = Request::builder()
        .uri("/download/reports/2024/q1.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(build_router(state(&store)), download).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(body, bytes);
}

#[tokio::test]
async fn download_guesses_type_when_none_was_stored() {
    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("notes.md", bytes::Bytes::from_static(b"# hi"), None)
        .await
        .unwrap();

    let request = Request::builder().uri("/download/notes.md").body(Body::empty()).unwrap();
    let (status, headers, _) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
}

#[tokio::test]
async fn download_missing_key_is_404() {
    let store = Arc::new(MemoryObjectStore::new());
    let request = Request::builder().uri("/download/nope.pdf").body(Body::empty()).unwrap();
    let (status, _, _) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_key_is_rejected() {
    let store = Arc::new(MemoryObjectStore::new());
    let request = Request::builder()
        .method("POST")
        .uri("/upload/a/../b.pdf")
        .body(Body::from("x"))
        .unwrap();
    let (status, _, _) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn home_page_is_html() {
    let store = Arc::new(MemoryObjectStore::new());
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, headers, body) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("/autorag"));
}

#[tokio::test]
async fn health_reports_ok() {
    let store = Arc::new(MemoryObjectStore::new());
    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["service"], "docgate");
}

#[tokio::test]
async fn missing_query_is_400_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = || build_router(state(&store).with_search(search_client(&server)));

    let (status, _, body) = send(app(), post_json("/autorag", json!({"q": "typo"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Missing query");

    let (status, _, _) = send(app(), post_json("/autorag", json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let garbage = Request::builder()
        .method("POST")
        .uri("/autorag")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(app(), garbage).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_returns_provider_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{RAG_PATH}/search")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"data": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_search(search_client(&server)));
    let (status, _, body) = send(app, post_json("/autorag", json!({"query": "pumps"}))).await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], true);
}

#[tokio::test]
async fn upstream_error_is_forwarded_with_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{RAG_PATH}/ai-search")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "success": false,
            "error": "rate limited"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_search(search_client(&server)));
    let (status, _, body) = send(
        app,
        post_json("/autorag", json!({"query": "pumps", "mode": "ai-search"})),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({"error": "rate limited"}));
}

#[tokio::test]
async fn streamed_answer_is_relayed_as_sse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{RAG_PATH}/ai-search")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(
                    "data: {\"response\":\"Hello\"}\n\ndata: {\"response\":\" there\"}\n\ndata: [DONE]\n\n",
                ),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_search(search_client(&server)).with_stream_buffer(1));
    let (status, headers, body) = send(
        app,
        post_json("/autorag", json!({"query": "hi", "stream": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));
    let text = String::from_utf8(body).unwrap();
    let data: Vec<&str> = text
        .lines()
        .filter_map(|l| l.strip_prefix("data: "))
        .collect();
    assert_eq!(data, vec!["Hello", " there", "[DONE]"]);
}

#[tokio::test]
async fn multi_line_chunk_stays_one_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{RAG_PATH}/ai-search")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: {\"response\":\"line one\\nline two\"}\n\ndata: [DONE]\n\n"),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_search(search_client(&server)));
    let request = post_json("/autorag", json!({"query": "hi", "stream": true}));
    let (status, _, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let events: Vec<Vec<&str>> = text
        .split("\n\n")
        .map(|event| event.lines().filter_map(|l| l.strip_prefix("data: ")).collect())
        .filter(|lines: &Vec<&str>| !lines.is_empty())
        .collect();
    assert_eq!(events, vec![vec!["line one", "line two"], vec!["[DONE]"]]);

    let home = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (_, _, page) = send(build_router(state(&store)), home).await;
    assert!(String::from_utf8(page).unwrap().contains("lines.join('\\n')"));
}

#[tokio::test]
async fn unconfigured_provider_is_500() {
    let store = Arc::new(MemoryObjectStore::new());

    let (status, _, body) = send(build_router(state(&store)), post_json("/autorag", json!({"query": "x"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8(body).unwrap().contains("search"));

    let request = Request::builder()
        .method("POST")
        .uri("/adobe-extract/doc.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(build_router(state(&store)), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn ocr_of_missing_key_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_ocr(ocr_client(&server)));
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/missing.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ocr_returns_full_response_and_stores_artifacts() {
    let server = MockServer::start().await;
    let ocr_body = json!({
        "model": "mistral-ocr-2503",
        "pages": [
            {"index": 0, "markdown": "# One", "images": [{"id": "i0", "image_base64": "QUJDREVGR0g="}]},
            {"index": 1, "markdown": "Two", "images": [{"id": "i1", "image_base64": "%%%"}]}
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ocr_body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("doc.pdf", bytes::Bytes::from_static(b"%PDF-1.7"), Some("application/pdf"))
        .await
        .unwrap();

    let app = build_router(state(&store).with_ocr(ocr_client(&server)));
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/doc.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, ocr_body);

    let keys = store.keys().await;
    assert!(keys.contains(&"doc.pdf.page-1.md".to_string()));
    assert!(keys.contains(&"doc.pdf.page-2.md".to_string()));
    assert!(keys.contains(&"doc.pdf.page-1.image-1.jpeg".to_string()));
    assert!(!keys.contains(&"doc.pdf.page-2.image-1.jpeg".to_string()));
}

#[tokio::test]
async fn ocr_of_posted_body_stores_source_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ocr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pages": [{"markdown": "hi"}]})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = || build_router(state(&store).with_ocr(ocr_client(&server)));

    let request = Request::builder()
        .method("POST")
        .uri("/ocr?name=inbox/scan.pdf")
        .body(Body::from("%PDF-1.4"))
        .unwrap();
    let (status, _, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);

    let source = store.get("inbox/scan.pdf").await.unwrap().unwrap();
    assert_eq!(&source.data[..], b"%PDF-1.4");
    assert!(store.get("inbox/scan.pdf.page-1.md").await.unwrap().is_some());

    let empty = Request::builder().method("POST").uri("/ocr").body(Body::empty()).unwrap();
    let (status, _, _) = send(app(), empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ocr_provider_failure_is_502() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ocr"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("doc.pdf", bytes::Bytes::from_static(b"%PDF"), None)
        .await
        .unwrap();

    let app = build_router(state(&store).with_ocr(ocr_client(&server)));
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/doc.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["service"], "mistral-ocr");
    assert_eq!(value["status"], 500);
}

#[tokio::test]
async fn extract_stores_archive_and_reports_size() {
    let server = MockServer::start().await;
    mount_extract_job(&server).await;
    Mock::given(method("GET"))
        .and(path("/jobs/7/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "done",
            "downloadUri": format!("{}/results/7.zip", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/7.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04data".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("doc.pdf", bytes::Bytes::from_static(b"%PDF-1.7"), Some("application/pdf"))
        .await
        .unwrap();

    let app = build_router(state(&store).with_extractor(extractor(&server, &store)));
    let (status, _, body) = send(app, post_empty("/adobe-extract/doc.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        value,
        json!({"message": "Extract complete", "key": "doc.pdf.adobe-extract.zip", "size": 8})
    );
    let archive = store.get("doc.pdf.adobe-extract.zip").await.unwrap().unwrap();
    assert_eq!(&archive.data[..], b"PK\x03\x04data");
}

#[tokio::test]
async fn extract_of_missing_source_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = build_router(state(&store).with_extractor(extractor(&server, &store)));
    let (status, _, body) = send(app, post_empty("/adobe-extract/missing.pdf")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["step"], "source");
}

#[tokio::test]
async fn extract_of_invalid_key_is_400() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    let app = || build_router(state(&store).with_extractor(extractor(&server, &store)));

    let (status, _, _) = send(app(), post_empty("/adobe-extract/a//b.pdf")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let download = Request::builder().uri("/download/a//b.pdf").body(Body::empty()).unwrap();
    let (status, _, _) = send(app(), download).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extract_job_rejection_is_502_with_step_report() {
    let server = MockServer::start().await;
    mount_extract_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/operation/extractpdf/jobs"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"code":"BAD_INPUT"}"#))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("doc.pdf", bytes::Bytes::from_static(b"%PDF-1.7"), Some("application/pdf"))
        .await
        .unwrap();

    let app = build_router(state(&store).with_extractor(extractor(&server, &store)));
    let (status, _, body) = send(app, post_empty("/adobe-extract/doc.pdf")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["step"], "job");
    assert_eq!(value["status"], 400);
    assert_eq!(value["body"], r#"{"code":"BAD_INPUT"}"#);
    assert_eq!(value["job"]["assetId"], "asset-7");
    assert!(value["error"].as_str().unwrap().contains("BAD_INPUT"));
    assert!(store.get("doc.pdf.adobe-extract.zip").await.unwrap().is_none());
}

#[tokio::test]
async fn ocr_response_is_returned_as_sent() {
    let store = Arc::new(MemoryObjectStore::new());
    store
        .put("d.pdf", bytes::Bytes::from_static(b"%PDF"), None)
        .await
        .unwrap();

    for provider_body in [
        json!({"pages": [{"index": 0, "markdown": null, "images": null}], "model": "m"}),
        json!({"pages": {"unexpected": true}}),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(provider_body.clone()))
            .mount(&server)
            .await;

        let app = build_router(state(&store).with_ocr(ocr_client(&server)));
        let (status, _, body) = send(app, post_empty("/ocr/d.pdf")).await;

        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, provider_body);
    }
    assert_eq!(store.keys().await, vec!["d.pdf".to_string()]);
}
