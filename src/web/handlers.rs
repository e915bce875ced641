//! HTTP handlers for API endpoints.

use crate::dashboard::{DashboardSnapshot, SensorState};
use crate::web::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use serde_json::json;
use tracing::error;

/// Get the current dashboard snapshot as JSON.
pub async fn get_snapshot(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.current())
}

/// Get the current sensor rows as JSON.
pub async fn get_sensors(State(state): State<AppState>) -> Json<Vec<SensorState>> {
    Json(state.current().sensors)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.current();
    let clients = state.clients.read().await.describe();

    Json(json!({
        "status": "ok",
        "service": "vital-watch",
        "version": env!("CARGO_PKG_VERSION"),
        "device_connected": snapshot.connection.is_connected(),
        "lines_received": snapshot.lines_received,
        "websocket_clients": clients.len(),
        "clients": clients,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve the dashboard page from the configured static directory.
pub async fn serve_index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let Some(index_file) = state.config.index_file() else {
        return Ok(Html(DEFAULT_INDEX_HTML.to_string()));
    };

    match tokio::fs::read_to_string(&index_file).await {
        Ok(content) => Ok(Html(content)),
        Err(e) => {
            error!("Failed to read {:?}: {}", index_file, e);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Serve the built-in dashboard page.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

/// Built-in dashboard page.
const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>VitalWatch Pro - Smart Status Monitor</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: Arial, Helvetica, sans-serif;
            background: linear-gradient(180deg, #0a0f1f 0%, #12233f 50%, #1c2c4a 100%);
            color: white;
            min-height: 100vh;
            padding: 20px;
        }

        .container {
            max-width: 460px;
            margin: 0 auto;
        }

        .header {
            text-align: center;
            margin-bottom: 12px;
        }

        .header h1 {
            font-size: 1.6rem;
            line-height: 1.3;
        }

        .clock {
            font-family: Consolas, monospace;
            color: #bbb;
            text-align: center;
            margin-bottom: 8px;
        }

        .banner {
            font-weight: bold;
            text-align: center;
            margin-bottom: 6px;
        }

        .last-data {
            font-family: Consolas, monospace;
            font-size: 0.8rem;
            color: #aaa;
            text-align: center;
            margin-bottom: 16px;
        }

        .sensor {
            display: flex;
            align-items: center;
            gap: 12px;
            padding: 10px 0;
            border-bottom: 1px solid rgba(255,255,255,0.4);
        }

        .sensor-name {
            flex: 1;
            font-size: 1.1rem;
        }

        .sensor-value {
            background-color: #1e3c59;
            padding: 6px 12px;
            border-radius: 10px;
        }

        .sensor-status {
            font-weight: bold;
            width: 80px;
            text-align: right;
        }

        .monitor {
            margin-top: 16px;
            height: 150px;
            overflow-y: auto;
            background-color: #111;
            color: #0f0;
            font-family: Consolas, monospace;
            font-size: 0.8rem;
            padding: 6px;
            white-space: pre;
        }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>VitalWatch Pro<br>Status Dashboard</h1>
        </div>
        <div class="clock" id="clock"></div>
        <div class="banner" id="banner" style="color: #e74c3c;">Arduino Disconnected</div>
        <div class="last-data" id="last-data">Last data: N/A</div>
        <div id="sensors"></div>
        <div class="monitor" id="monitor"></div>
    </div>

    <script>
        let ws;
        let reconnectDelay = 1000;

        function connectWebSocket() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = function() {
                reconnectDelay = 1000;
            };

            ws.onmessage = function(event) {
                try {
                    updateDashboard(JSON.parse(event.data));
                } catch (e) {
                    console.error('Failed to parse WebSocket message:', e);
                }
            };

            ws.onclose = function() {
                const banner = document.getElementById('banner');
                banner.textContent = 'Dashboard server unreachable';
                banner.style.color = '#e74c3c';
                setTimeout(connectWebSocket, reconnectDelay);
                reconnectDelay = Math.min(reconnectDelay * 2, 10000);
            };
        }

        function row(sensor) {
            const div = document.createElement('div');
            div.className = 'sensor';
            const name = document.createElement('span');
            name.className = 'sensor-name';
            name.textContent = sensor.key;
            const value = document.createElement('span');
            value.className = 'sensor-value';
            value.textContent = sensor.last_value;
            const status = document.createElement('span');
            status.className = 'sensor-status';
            status.textContent = sensor.status;
            status.style.color = sensor.color;
            div.append(name, value, status);
            return div;
        }

        function updateDashboard(data) {
            if (data.clock) {
                document.getElementById('clock').textContent = data.clock;
            }

            const banner = document.getElementById('banner');
            banner.textContent = data.banner;
            banner.style.color = data.banner_color;

            document.getElementById('last-data').textContent = data.last_data;

            const sensors = document.getElementById('sensors');
            sensors.replaceChildren(...data.sensors.map(row));

            const monitor = document.getElementById('monitor');
            const atBottom = monitor.scrollTop + monitor.clientHeight >= monitor.scrollHeight - 4;
            monitor.textContent = data.monitor.join('\n');
            if (atBottom) {
                monitor.scrollTop = monitor.scrollHeight;
            }
        }

        connectWebSocket();

        fetch('/api/snapshot')
            .then(response => response.json())
            .then(data => updateDashboard(data))
            .catch(error => console.error('Failed to fetch initial data:', error));
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::WebConfig;
    use tokio::sync::watch;

    fn state() -> (watch::Sender<DashboardSnapshot>, AppState) {
        let (tx, rx) = watch::channel(DashboardSnapshot::default());
        (tx, AppState::new(WebConfig::default(), rx))
    }

    #[tokio::test]
    async fn test_snapshot_follows_publisher() {
        let (tx, state) = state();
        let mut next = DashboardSnapshot::default();
        next.lines_received = 7;
        tx.send_replace(next);

        let Json(snapshot) = get_snapshot(State(state)).await;
        assert_eq!(snapshot.lines_received, 7);
    }

    #[tokio::test]
    async fn test_sensors_endpoint() {
        let (_tx, state) = state();
        let Json(sensors) = get_sensors(State(state)).await;
        assert_eq!(sensors.len(), 9);
        assert_eq!(sensors[0].key, "TEMP");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_tx, state) = state();
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["device_connected"], false);
        assert_eq!(body["websocket_clients"], 0);
    }

    #[tokio::test]
    async fn test_serve_index_from_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>custom</p>").unwrap();
        let (_tx, rx) = watch::channel(DashboardSnapshot::default());
        let config =
            WebConfig::default().with_static_path(Some(dir.path().to_string_lossy().into()));

        let Html(body) = serve_index(State(AppState::new(config, rx))).await.unwrap();
        assert_eq!(body, "<p>custom</p>");
    }

    #[tokio::test]
    async fn test_default_index_mentions_websocket() {
        let Html(body) = default_index().await;
        assert!(body.contains("/ws"));
        assert!(body.contains("VitalWatch"));
    }
}
