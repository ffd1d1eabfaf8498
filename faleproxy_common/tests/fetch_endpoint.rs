//! End-to-end tests for `POST /fetch`, driving the router against a mocked origin.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use faleproxy_common::{app, state::Config};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{any, method, path},
    Mock, MockServer, ResponseTemplate,
};

const SAMPLE_HTML_WITH_YALE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Yale University Test Page</title>
  <meta charset="utf-8">
</head>
<body>
  <div class="container">
    <h1>Welcome to Yale University</h1>
    <p>Yale University is a private Ivy League research university in New Haven, Connecticut.</p>
    <p>Founded in 1701, YALE is the third-oldest institution of higher education in the United States.</p>
    <div class="links">
      <a href="https://www.yale.edu/about">About Yale</a>
      <a href="https://www.yale.edu/admissions">Yale Admissions</a>
      <a href="https://www.yale.edu/academics">yale academics</a>
    </div>
    <img src="https://www.yale.edu/images/logo.png" alt="Yale Logo">
  </div>
</body>
</html>"#;

fn router(config: Config) -> Router {
    app(Arc::new(config)).unwrap()
}

async fn post_json(router: Router, body: Body) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::post("/fetch")
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn fetch(router: Router, payload: Value) -> (StatusCode, Value) {
    post_json(router, Body::from(payload.to_string())).await
}

/// A relay whose every outbound request lands on `proxy`, whatever URL it is asked for.
fn router_via(proxy: &MockServer) -> Router {
    router(Config {
        outbound_proxy: Some(proxy.uri()),
        ..Config::default()
    })
}

#[tokio::test]
async fn replaces_yale_with_fale_in_fetched_content() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(SAMPLE_HTML_WITH_YALE),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let url = format!("{}/", origin.uri());
    let (status, body) = fetch(router(Config::default()), json!({ "url": url })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["title"], "Fale University Test Page");
    assert_eq!(body["originalUrl"], url);

    let content = body["content"].as_str().unwrap();
    assert!(content.contains("<title>Fale University Test Page</title>"));
    assert!(content.contains("<h1>Welcome to Fale University</h1>"));
    assert!(content.contains("<p>Fale University is a private"));
    assert!(content.contains("FALE is the third-oldest"));

    assert!(content.contains(r#"<a href="https://www.yale.edu/about">About Fale</a>"#));
    assert!(content.contains(r#"<a href="https://www.yale.edu/admissions">Fale Admissions</a>"#));
    assert!(content.contains(r#"<a href="https://www.yale.edu/academics">fale academics</a>"#));
    assert!(content.contains(r#"src="https://www.yale.edu/images/logo.png" alt="Yale Logo""#));
}

#[tokio::test]
async fn handles_invalid_urls() {
    let (status, body) = fetch(
        router(Config::default()),
        json!({ "url": "not-a-valid-url" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to fetch content: "), "{error}");
    assert!(error.contains("not-a-valid-url"), "{error}");
}

#[tokio::test]
async fn outbound_requests_reach_the_configured_proxy() {
    let proxy = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Yale</h1>"))
        .expect(1)
        .mount(&proxy)
        .await;

    let (status, body) = fetch(router_via(&proxy), json!({ "url": "http://yale.test/" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "<h1>Fale</h1>");
}

#[tokio::test]
async fn handles_missing_url_parameter() {
    let proxy = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&proxy)
        .await;

    let (status, body) = fetch(router_via(&proxy), json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "URL is required" }));
}

#[tokio::test]
async fn treats_empty_or_unreadable_bodies_as_missing_url() {
    let proxy = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&proxy)
        .await;

    for payload in [json!({ "url": "" }), json!({ "url": "   " }), json!({ "url": 5 })] {
        let (status, body) = fetch(router_via(&proxy), payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], "URL is required", "{payload}");
    }

    let (status, body) = post_json(router_via(&proxy), Body::from("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");
}

#[tokio::test]
async fn accepts_form_encoded_requests() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(SAMPLE_HTML_WITH_YALE),
        )
        .expect(1)
        .mount(&origin)
        .await;

    let url = format!("{}/", origin.uri());
    let response = router(Config::default())
        .oneshot(
            Request::post("/fetch")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("url={url}")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["title"], "Fale University Test Page");
    assert_eq!(body["originalUrl"], url);
}

#[tokio::test]
async fn rejects_empty_form_requests() {
    let response = router(Config::default())
        .oneshot(
            Request::post("/fetch")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("other=1"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_origin_error_status() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&origin)
        .await;

    let (status, body) = fetch(
        router(Config::default()),
        json!({ "url": origin.uri() }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to fetch content: "), "{error}");
    assert!(error.contains("503 Service Unavailable"), "{error}");
}

#[tokio::test]
async fn rejects_oversized_documents() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Yale</p>".repeat(100)))
        .mount(&origin)
        .await;

    let config = Config {
        max_body_bytes: 64,
        ..Config::default()
    };
    let (status, body) = fetch(router(config), json!({ "url": origin.uri() })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "Failed to fetch content: response body exceeds the 64 byte limit"
    );
}

#[tokio::test]
async fn reports_unreachable_origins() {
    // Reserve a port, then free it so nothing is listening there
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let (status, body) = fetch(
        router(Config::default()),
        json!({ "url": format!("http://{addr}/") }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to fetch content: "));
}

#[tokio::test]
async fn index_reports_configured_host() {
    let response = router(Config::default())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        String::from_utf8(bytes.to_vec()).unwrap(),
        "faleproxy is running. Configured host: 0.0.0.0:3001"
    );
}
