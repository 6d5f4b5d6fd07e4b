use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response, Router};
use taskmatch_core::open_db;

use super::api::{self, AppState};

/// Build the application router with request logging.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .layer(axum::middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    log::info!(
        "event=http_request module=api status={} method={} path={} duration_ms={}",
        response.status().as_u16(),
        method,
        path,
        started_at.elapsed().as_millis()
    );
    response
}

/// Opens the database and serves the HTTP surface until Ctrl+C.
pub async fn start_server(bind_addr: SocketAddr, db_path: &Path) -> Result<(), ServerError> {
    let conn = open_db(db_path).map_err(|err| ServerError::Database(err.to_string()))?;
    let app = build_router(Arc::new(AppState::new(conn)));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|err| ServerError::Io(format!("failed to bind to {bind_addr}: {err}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|err| ServerError::Io(err.to_string()))?;
    log::info!(
        "event=server_start module=api status=ok addr={local_addr} db_path={}",
        db_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| ServerError::Io(format!("server error: {err}")))?;

    log::info!("event=server_stop module=api status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("event=server_stop module=api status=error error={err}");
    }
}

/// Failure to start or run the HTTP server.
#[derive(Debug)]
pub enum ServerError {
    Database(String),
    Io(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(message) => write!(f, "database error: {message}"),
            Self::Io(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use taskmatch_core::open_db_in_memory;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = build_router(Arc::new(AppState::new(open_db_in_memory().unwrap())));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], taskmatch_core::core_version());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = build_router(Arc::new(AppState::new(open_db_in_memory().unwrap())));
        let req = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
