use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{AppState, error::AppError};

const API_KEY_HEADER: &str = "x-api-key";
const BEARER_PREFIX: &str = "Bearer ";

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
}

fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Rejects mutating requests without the configured API key. With no key
/// configured every request is rejected.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "rejected request to a protected route: API_KEY is not configured"
        );
        return Err(AppError::Unauthorized);
    };

    let presented = presented_key(request.headers());
    let key_present = presented.is_some();
    if presented.is_some_and(|key| keys_match(key, expected)) {
        return Ok(next.run(request).await);
    }

    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        key_present,
        "rejected request without a valid API key"
    );
    Err(AppError::Unauthorized)
}

/// Bounds every request by the configured timeout. On expiry the handler
/// future is dropped, which abandons any query it was awaiting.
pub async fn enforce_timeout(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.request_timeout;
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%path, timeout_ms = limit.as_millis() as u64, "request timed out");
            AppError::Timeout.into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Router,
        body::Body,
        http::{HeaderValue, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, db::connect_in_memory, movies::MovieService};

    async fn state(config: Config) -> Arc<AppState> {
        Arc::new(AppState {
            config: Arc::new(config),
            movies: MovieService::new(connect_in_memory().await),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn slow_requests_time_out_with_504() {
        let config = Config { request_timeout: Duration::from_millis(20), ..Config::for_tests(None) };
        let state = state(config).await;
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/fast", get(|| async { "quick" }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), enforce_timeout))
            .with_state(state);

        let request = axum::http::Request::get("/slow").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "REQUEST_TIMEOUT");
        assert_eq!(json["success"], false);

        let request = axum::http::Request::get("/fast").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_fail_closed_without_a_configured_key() {
        let state = state(Config::for_tests(None)).await;
        let app = Router::new()
            .route("/write", get(|| async { "written" }))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_api_key))
            .with_state(state);

        let request = axum::http::Request::get("/write")
            .header(API_KEY_HEADER, "anything")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
    }

    #[test]
    fn key_is_read_from_either_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(presented_key(&headers), Some("s3cret"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("other"));
        assert_eq!(presented_key(&headers), Some("other"));
    }

    #[test]
    fn comparison_requires_exact_match() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cre", "s3cret"));
        assert!(!keys_match("S3CRET", "s3cret"));
    }
}
