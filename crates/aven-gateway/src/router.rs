use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{chat_handler, health_handler};
use super::server::AppState;

const MAX_RATE_LIMIT_ENTRIES: usize = 10_000;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct RateLimitState {
    limit: u32,
    counters: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

pub(crate) fn build_router(state: AppState, rate_limit: u32, max_body_size: usize) -> Router {
    let rate_state = RateLimitState {
        limit: rate_limit,
        counters: Arc::new(Mutex::new(HashMap::new())),
    };

    let chat = Router::new()
        .route("/chat", post(chat_handler))
        .layer(middleware::from_fn_with_state(
            rate_state,
            rate_limit_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .merge(chat)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn rate_limit_middleware(
    axum::extract::State(state): axum::extract::State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if state.limit == 0 {
        return next.run(req).await;
    }

    let ip = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), |ci| ci.0.ip());

    let now = Instant::now();
    let mut counters = state.counters.lock().await;

    if counters.len() >= MAX_RATE_LIMIT_ENTRIES && !counters.contains_key(&ip) {
        counters.retain(|_, (_, ts)| now.duration_since(*ts) < RATE_WINDOW);
    }

    let entry = counters.entry(ip).or_insert((0, now));
    if now.duration_since(entry.1) >= RATE_WINDOW {
        *entry = (1, now);
    } else {
        entry.0 += 1;
        if entry.0 > state.limit {
            tracing::warn!(%ip, "chat rate limit exceeded");
            return StatusCode::TOO_MANY_REQUESTS.into_response();
        }
    }
    drop(counters);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::NO_INPUT;
    use crate::server::ChatRequest;

    /// Router whose chat worker answers with the upper-cased input.
    fn echo_router(rate_limit: u32, max_body_size: usize) -> Router {
        let (tx, mut rx) = mpsc::channel::<ChatRequest>(16);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let _ = req.reply.send(req.input.to_uppercase());
            }
        });
        let state = AppState {
            chat_tx: tx,
            started_at: Instant::now(),
        };
        build_router(state, rate_limit, max_body_size)
    }

    fn chat_request(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = echo_router(0, 1_048_576);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_worker_response() {
        let app = echo_router(0, 1_048_576);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"input": "what is aven?"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json = json_body(resp).await;
        assert_eq!(json["response"], "WHAT IS AVEN?");
    }

    #[tokio::test]
    async fn missing_input_is_bad_request() {
        let app = echo_router(0, 1_048_576);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let json = json_body(resp).await;
        assert_eq!(json["error"], NO_INPUT);
    }

    #[tokio::test]
    async fn blank_input_is_bad_request() {
        let app = echo_router(0, 1_048_576);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"input": "  "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = echo_router(0, 1_048_576);
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 400);
        let json = json_body(resp).await;
        assert_eq!(json["error"], NO_INPUT);
    }

    #[tokio::test]
    async fn closed_worker_is_service_unavailable() {
        let (tx, rx) = mpsc::channel::<ChatRequest>(1);
        drop(rx);
        let state = AppState {
            chat_tx: tx,
            started_at: Instant::now(),
        };
        let app = build_router(state, 0, 1_048_576);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"input": "hi"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn dropped_reply_is_internal_error() {
        let (tx, mut rx) = mpsc::channel::<ChatRequest>(1);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                drop(req);
            }
        });
        let state = AppState {
            chat_tx: tx,
            started_at: Instant::now(),
        };
        let app = build_router(state, 0, 1_048_576);
        let resp = app
            .oneshot(chat_request(&serde_json::json!({"input": "hi"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn rate_limit_enforced() {
        use tower::Service;

        let mut app = echo_router(2, 1_048_576);
        let body = serde_json::json!({"input": "hi"});

        let resp = app.call(chat_request(&body)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let resp = app.call(chat_request(&body)).await.unwrap();
        assert_eq!(resp.status(), 200);
        let resp = app.call(chat_request(&body)).await.unwrap();
        assert_eq!(resp.status(), 429);
    }

    #[tokio::test]
    async fn health_is_not_rate_limited() {
        use tower::Service;

        let mut app = echo_router(1, 1_048_576);
        for _ in 0..3 {
            let req = Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap();
            let resp = app.call(req).await.unwrap();
            assert_eq!(resp.status(), 200);
        }
    }

    #[tokio::test]
    async fn body_size_limit() {
        let app = echo_router(0, 64);
        let oversized = serde_json::json!({"input": "a".repeat(128)});
        let resp = app.oneshot(chat_request(&oversized)).await.unwrap();
        assert_eq!(resp.status(), 413);
    }

    #[tokio::test]
    async fn cors_preflight_allowed() {
        let app = echo_router(0, 1_048_576);
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_success());
        assert!(
            resp.headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
