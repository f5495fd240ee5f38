//! Logs every message from a WebSocket endpoint and reconnects on failure.
//!
//! ```text
//! RUST_LOG=streamkeeper=debug cargo run --example stream_logger -- ws://127.0.0.1:9001/stream
//! ```

use std::sync::Arc;
use std::time::Duration;

use streamkeeper::{
    BackoffPolicy, Connected, ConnectionLost, Endpoint, Host, HostConfig, JitterPolicy, Listener, LogReceiver,
    WsTransportFactory,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9001/stream".to_owned());

    let mut cfg = HostConfig::default();
    cfg.grace = Duration::from_secs(5);
    cfg.retry = BackoffPolicy {
        first: Duration::from_millis(200),
        max: Duration::from_secs(10),
        factor: 2.0,
        jitter: JitterPolicy::Equal,
    };

    let mut builder = Host::builder(cfg);
    let conn = builder.connection(Endpoint::parse("stream", &address)?, Arc::new(WsTransportFactory));
    builder.keep_connected(&conn);
    builder.receiver(Arc::new(LogReceiver::new(Arc::clone(&conn))));

    builder.bus().condition_for::<Connected>("stream").add(Listener::new(
        "announce",
        |ep: Endpoint| async move {
            tracing::info!(endpoint = %ep, "stream is up");
            Ok(())
        },
    ));
    builder.bus().condition_for::<ConnectionLost>("stream").add(Listener::new(
        "report",
        |ep: Endpoint| async move {
            tracing::warn!(endpoint = %ep, "stream dropped");
            Ok(())
        },
    ));

    let host = builder.build();
    host.run().await?;
    Ok(())
}
