pub mod limit;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{ConversionError, translator};
use crate::server::limit::RateLimiter;

/// Generic message for any translator failure; categories stay in the logs.
const PARSE_FAILED_MSG: &str = "Failed to parse the cURL command. Please ensure it is valid.";

/// Shared per-process state. The translator itself is stateless; only the
/// rate limiter lives here.
#[derive(Default)]
pub struct AppState {
    pub limiter: RateLimiter,
}

pub type SharedState = Arc<AppState>;

/// Response envelope: `{"success": bool, "message"?: string, "data"?: object}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    fn success(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseCurlParams {
    curl_command: String,
}

/// Builds the service router: `POST /parse-curl` plus a JSON 404 fallback,
/// wrapped in rate-limit, security-header and CORS middleware (outermost
/// last, so even rejected requests carry CORS headers).
pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/parse-curl", post(parse_curl))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn parse_curl(
    payload: Result<Json<ParseCurlParams>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let Ok(Json(params)) = payload else {
        return bad_request("The cURL command is required.");
    };
    let command = params.curl_command.trim();
    if command.is_empty() {
        return bad_request("The cURL command cannot be empty.");
    }
    if !translator::is_curl(command) {
        return bad_request("Invalid cURL command format.");
    }

    let result = translator::translate(command).and_then(|request| {
        serde_json::to_value(&request).map_err(|err| ConversionError::Internal(err.to_string()))
    });
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))),
        Err(err) => {
            let category = match &err {
                ConversionError::MalformedInput(_) => "malformed input",
                ConversionError::Internal(_) => "internal failure",
            };
            log::error!("cURL conversion failed ({category}): {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(PARSE_FAILED_MSG)),
            )
        }
    }
}

async fn not_found() -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("The requested endpoint does not exist.")),
    )
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::failure(message)))
}

/// Per-IP fixed-window limiting. The client key is the socket peer address;
/// requests without one (in-process test calls) fall back to loopback.
async fn rate_limit(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::from([127, 0, 0, 1]), |ConnectInfo(peer)| peer.ip());
    if state.limiter.check(ip) {
        next.run(request).await
    } else {
        log::warn!("rate limit exceeded for {ip}");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::failure(
                "Too many requests, please try again later.",
            )),
        )
            .into_response()
    }
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

/// Allow any origin; preflights are answered directly with 204.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == axum::http::Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors(response.headers_mut());
        return response;
    }
    let mut response = next.run(request).await;
    apply_cors(response.headers_mut());
    response
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
