//! HTTP + WebSocket API for VitalWatch
//!
//! Endpoints:
//! - GET /data - Run a cycle, return the response document
//! - POST /data - Device pushes vitals (in-memory store only)
//! - GET /status - Latest document without polling
//! - POST /alert/reset - Release the alert latch
//! - GET /history/{kind}?limit=n - Recent access events
//! - WS /ws - Live documents
//! - GET /health - Health check

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::Aggregator;
use crate::error::{CycleError, IngestError};
use crate::types::{AccessKind, ErrorDocument, ResponseDocument, SecurityEvent};

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cycles: u64,
}

/// Reset response
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

/// Ingest response
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub data: serde_json::Value,
}

/// History query
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub kind: AccessKind,
    pub events: Vec<SecurityEvent>,
}

/// Create the API router
pub fn create_router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/data", get(data).post(ingest))
        .route("/status", get(status))
        .route("/alert/reset", post(reset_alert))
        .route("/history/:kind", get(history))
        .route("/ws", get(websocket_handler))
        .with_state(aggregator)
}

/// Health check endpoint
async fn health(State(agg): State<Arc<Aggregator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        cycles: agg.cycles(),
    })
}

/// Poll the store and evaluate
async fn data(State(agg): State<Arc<Aggregator>>) -> Response {
    match agg.run_cycle().await {
        Ok(doc) => Json(doc).into_response(),
        Err(CycleError::StoreUnreachable(reason)) => {
            warn!(reason = %reason, "cycle failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorDocument::new("Failed to fetch data")),
            )
                .into_response()
        }
    }
}

/// Store pushed vitals for the next cycle
async fn ingest(
    State(agg): State<Arc<Aggregator>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    match agg.ingest_vitals(body).await {
        Ok(data) => Json(IngestResponse {
            message: "Patient data received successfully".to_string(),
            data,
        })
        .into_response(),
        Err(e) => {
            let status = match e {
                IngestError::Disabled => StatusCode::METHOD_NOT_ALLOWED,
                IngestError::NotAnObject | IngestError::MissingVitals => StatusCode::BAD_REQUEST,
            };
            (status, Json(ErrorDocument::new(e.to_string()))).into_response()
        }
    }
}

/// Latest document
async fn status(State(agg): State<Arc<Aggregator>>) -> Result<Json<ResponseDocument>, StatusCode> {
    agg.latest().await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Release the alert latch
async fn reset_alert(State(agg): State<Arc<Aggregator>>) -> Json<ResetResponse> {
    agg.reset_alert().await;
    Json(ResetResponse { reset: true })
}

/// Recent events for one kind
async fn history(
    State(agg): State<Arc<Aggregator>>,
    Path(kind): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    let kind = match kind.as_str() {
        "authorized" => AccessKind::Authorized,
        "unauthorized" => AccessKind::Unauthorized,
        _ => return Err(StatusCode::NOT_FOUND),
    };
    let events = agg.history(kind, query.limit).await;
    Ok(Json(HistoryResponse { kind, events }))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(agg): State<Arc<Aggregator>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = agg.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward documents until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<ResponseDocument>) {
    let (mut sender, mut receiver) = socket.split();

    let forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(doc) => {
                    let Ok(json) = serde_json::to_string(&doc) else { continue };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "websocket client lagged, documents dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are ignored; a close ends the stream
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }
    debug!("websocket client disconnected");
    forward.abort();
}

/// Run the API server
pub async fn run_server(addr: &str, aggregator: Arc<Aggregator>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(aggregator);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "VitalWatch API listening");
    println!("🩺 VitalWatch API running on {}", addr);
    println!("  GET  /data                 - Poll and evaluate");
    println!("  POST /data                 - Push vitals (in-memory store)");
    println!("  GET  /status               - Latest document");
    println!("  POST /alert/reset          - Reset alert latch");
    println!("  GET  /history/:kind        - Access events (authorized|unauthorized)");
    println!("  WS   /ws                   - Live updates");
    println!("  GET  /health               - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
