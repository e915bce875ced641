//! Web application router and middleware setup.

use crate::error::Result;
use crate::web::{handlers, websocket, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the main axum application with all routes and middleware.
pub async fn create_app(state: AppState) -> Result<Router> {
    let index = match state.config.index_file() {
        Some(index_file) if index_file.exists() => {
            info!("Serving dashboard page from: {:?}", index_file);
            get(handlers::serve_index)
        }
        Some(index_file) => {
            warn!("{:?} not found, serving built-in dashboard", index_file);
            get(handlers::default_index)
        }
        None => get(handlers::default_index),
    };

    let enable_cors = state.config.enable_cors;

    let mut app = Router::new()
        .route("/", index)
        // API routes
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/sensors", get(handlers::get_sensors))
        .route("/api/health", get(handlers::health_check))
        // WebSocket route
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state);

    // Add CORS if enabled
    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashboardSnapshot;
    use crate::web::WebConfig;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_create_app() {
        let (_tx, rx) = watch::channel(DashboardSnapshot::default());
        let app = create_app(AppState::new(WebConfig::default(), rx)).await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_create_app_with_missing_static_dir() {
        let (_tx, rx) = watch::channel(DashboardSnapshot::default());
        let config = WebConfig::default().with_static_path(Some("/nonexistent".into()));
        assert!(create_app(AppState::new(config, rx)).await.is_ok());
    }
}
