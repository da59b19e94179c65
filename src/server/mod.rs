//! Local HTTP server: the web page, the listing API and digest subscriptions.
//!
//! Binds to loopback by default. Every request is logged by the trace layer;
//! the CORS layer allows any origin so the page also works when opened from
//! a file.

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the router with all routes and layers attached.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::index))
        .route("/api/reddit", get(routes::get_posts))
        .route("/api/subscribe", post(routes::subscribe))
        .route("/api/unsubscribe", post(routes::unsubscribe))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Fails if `addr` can't be bound or the accept loop dies.
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::ListingFetcher;
    use crate::fetcher::tests::{listing_body, test_config};
    use crate::subscriptions::SubscriptionStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(base_url: &str) -> AppState {
        let fetcher = Arc::new(ListingFetcher::new(test_config(base_url)).unwrap());
        AppState::new(fetcher, Arc::new(SubscriptionStore::new()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
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
    async fn test_index_page() {
        let app = create_router(test_state("http://127.0.0.1:9"));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("/api/reddit"));
    }

    #[tokio::test]
    async fn test_get_posts_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/programming/top.json"))
            .and(query_param("limit", "5"))
            .and(query_param("t", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&[
                "a", "b", "c", "d", "e",
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let app = create_router(test_state(&server.uri()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reddit?subreddit=programming&sort=top&time=week&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 5);
        assert_eq!(json["posts"][4]["position"], 5);
        assert_eq!(json["posts"][0]["time_filter"], "week");
    }

    #[tokio::test]
    async fn test_get_posts_invalid_sort() {
        let app = create_router(test_state("http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reddit?subreddit=rust&sort=best")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "invalid_sort");
    }

    #[tokio::test]
    async fn test_get_posts_missing_subreddit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let app = create_router(test_state(&server.uri()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reddit?subreddit=nosuchsub")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("r/nosuchsub"));
    }

    #[tokio::test]
    async fn test_get_posts_bad_limit() {
        let app = create_router(test_state("http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reddit?subreddit=rust&limit=lots")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_query");
    }

    #[tokio::test]
    async fn test_subscribe_then_resubscribe_then_unsubscribe() {
        let state = test_state("http://127.0.0.1:9");
        let store = state.store.clone();
        let app = create_router(state);

        let body = json!({
            "email": "reader@example.com",
            "frequency": "weekly",
            "subreddit": "r/rust",
            "sort": "top",
            "time": "week",
            "posts": 5
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/subscribe", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["next_send"].as_str().unwrap().ends_with("09:00"));

        let mut again = body.clone();
        again["frequency"] = json!("monthly");
        let response = app
            .clone()
            .oneshot(post_json("/api/subscribe", again))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["message"].as_str().unwrap().starts_with("Updated"));
        assert_eq!(store.len().await, 1);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/unsubscribe",
                json!({"email": "reader@example.com", "subreddit": "rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], 1);
        assert_eq!(store.len().await, 0);

        let response = app
            .oneshot(post_json("/api/unsubscribe", json!({"email": "reader@example.com"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsubscribe_accepts_subscribe_spelling() {
        let state = test_state("http://127.0.0.1:9");
        let store = state.store.clone();
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/subscribe",
                json!({"email": "reader@example.com", "subreddit": "/r/rust/"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.len().await, 1);

        let response = app
            .oneshot(post_json(
                "/api/unsubscribe",
                json!({"email": "reader@example.com", "subreddit": "/r/rust/"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_validation() {
        let app = create_router(test_state("http://127.0.0.1:9"));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/subscribe",
                json!({"email": "not-an-email", "subreddit": "rust"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "invalid_email");

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/subscribe",
                json!({"email": "a@example.com", "subreddit": "rust", "frequency": "daily"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["code"], "invalid_frequency");

        let response = app
            .oneshot(post_json("/api/subscribe", json!({"subreddit": "rust"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = create_router(test_state("http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/subscribe")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
