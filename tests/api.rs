use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{self, Request, StatusCode};
use curl2req::server::{AppState, app};
use curl2req::server::limit::RateLimiter;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn service() -> Router {
    app(Arc::new(AppState::default()))
}

fn throttled_service(max_requests: u32) -> Router {
    app(Arc::new(AppState {
        limiter: RateLimiter::new(max_requests, Duration::from_secs(15 * 60)),
    }))
}

fn parse_request(body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/parse-curl")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn parse_command(command: &str) -> Request<String> {
    parse_request(&serde_json::json!({ "curlCommand": command }).to_string())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// --- success ---

#[tokio::test]
async fn parse_plain_get_command() {
    let resp = service()
        .oneshot(parse_command("curl https://api.example.com/users"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["method"], "GET");
    assert_eq!(json["data"]["url"], "https://api.example.com/users");
    assert!(json["data"].get("body").is_none());
}

#[tokio::test]
async fn parse_post_with_data() {
    let resp = service()
        .oneshot(parse_command(
            r#"curl -X POST -d '{"a":1}' https://api.example.com/users"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["method"], "POST");
    assert_eq!(json["data"]["body"]["type"], "raw");
    assert_eq!(json["data"]["body"]["content"], r#"{"a":1}"#);
}

#[tokio::test]
async fn parse_preserves_header_order() {
    let resp = service()
        .oneshot(parse_command(
            r#"curl -H "A: 1" -H "B: 2" https://api.example.com/me"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["headers"][0]["name"], "A");
    assert_eq!(json["data"]["headers"][1]["name"], "B");
}

// --- validation: 400 before translation ---

#[tokio::test]
async fn empty_command_returns_400() {
    let resp = service().oneshot(parse_command("  ")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "The cURL command cannot be empty.");
}

#[tokio::test]
async fn wrong_invocation_token_returns_400() {
    let resp = service()
        .oneshot(parse_command("wget https://example.com"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Invalid cURL command format.");
}

#[tokio::test]
async fn missing_field_returns_400() {
    let resp = service().oneshot(parse_request(r#"{}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "The cURL command is required.");
}

#[tokio::test]
async fn malformed_json_body_returns_400() {
    let resp = service().oneshot(parse_request("not json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
}

// --- translation failures: 500 with a generic message ---

#[tokio::test]
async fn unterminated_quote_returns_500() {
    let resp = service()
        .oneshot(parse_command("curl 'https://example.com"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(
        json["message"],
        "Failed to parse the cURL command. Please ensure it is valid."
    );
}

#[tokio::test]
async fn missing_url_returns_500() {
    let resp = service()
        .oneshot(parse_command("curl -L --insecure"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- routing ---

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let resp = service()
        .oneshot(
            Request::builder()
                .uri("/nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "The requested endpoint does not exist.");
}

// --- middleware ---

#[tokio::test]
async fn responses_carry_cors_and_security_headers() {
    let resp = service()
        .oneshot(parse_command("curl https://example.com/"))
        .await
        .unwrap();

    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn preflight_is_answered_directly() {
    let resp = service()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/parse-curl")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn requests_beyond_the_window_limit_get_429() {
    let app = throttled_service(2);

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(parse_command("curl https://example.com/"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(parse_command("curl https://example.com/"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Too many requests, please try again later.");
}

#[tokio::test]
async fn rate_limited_responses_still_carry_cors_headers() {
    let app = throttled_service(0);
    let resp = app
        .oneshot(parse_command("curl https://example.com/"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
