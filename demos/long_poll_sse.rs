//! Long-poll delivery over Server-Sent Events with Axum.
//!
//! This example exposes one stream's server-sourced traffic as an SSE
//! endpoint. A background task publishes a tick every two seconds; between
//! ticks the connection stays alive on heartbeat frames.
//!
//! Run with:
//!   cargo run --example long_poll_sse
//!
//! Then, in another terminal:
//!   curl -N http://127.0.0.1:3000/streams/demo/messages

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    routing::get,
};
use futures_util::{Stream, StreamExt};
use rustc_hash::FxHashMap;
use serde_json::json;
use tokio::{net::TcpListener, time::sleep};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use streambus::bus::StreamDirectory;
use streambus::delivery::DeliveryConfig;
use streambus::service::{StreamService, Subscription};

async fn stream_messages(
    State(service): State<Arc<StreamService>>,
    Path(stream_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    let subscription = service
        .subscribe(&stream_id, true)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let Subscription::LongPoll(adapter) = subscription else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let frames = adapter
        .into_frame_stream()
        .map(|frame| Ok(SseEvent::default().json_data(frame.to_json_value()).unwrap()));

    Ok(Sse::new(frames))
}

async fn status(State(service): State<Arc<StreamService>>) -> axum::Json<serde_json::Value> {
    let status = service.status();
    axum::Json(json!({
        "stream_count": status.stream_count,
        "timestamp": status.timestamp.to_rfc3339(),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let service = Arc::new(StreamService::with_delivery_config(
        Arc::new(StreamDirectory::new()),
        DeliveryConfig::from_env().with_heartbeat_interval(Duration::from_secs(10)),
    ));
    service.create_stream(Some("demo".into()));

    // Publish server ticks so connected clients see message frames between
    // heartbeats.
    let publisher = service.clone();
    tokio::spawn(async move {
        let mut seq = 0u64;
        loop {
            sleep(Duration::from_secs(2)).await;
            seq += 1;
            if let Err(err) = publisher.send(
                "demo",
                "ticks",
                json!({"seq": seq}),
                FxHashMap::default(),
            ) {
                tracing::error!("tick publish failed: {err:?}");
                break;
            }
        }
    });

    let router = Router::new()
        .route("/status", get(status))
        .route("/streams/:stream_id/messages", get(stream_messages))
        .with_state(service);

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving SSE frames on http://{addr}/streams/demo/messages");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
