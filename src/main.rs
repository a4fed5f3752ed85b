//! geo-radar - Geographic identifier resolution
//!
//! This is the composition root that wires together all the components.

use geo_radar::infrastructure::{shutdown_signal, ShutdownController};
use geo_radar::{load_config, Radar, RadarOptions};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let options = RadarOptions::from(&cfg);
    tracing::info!(
        "starting geo-radar postal={} ip={}",
        cfg.geonames_uri,
        if options.maxmind_uri.is_some() { "enabled" } else { "disabled" }
    );

    // ===== COMPOSITION ROOT =====
    let radar = Radar::new(options)?;
    radar.wait().await;
    if let Some(e) = radar.take_error() {
        tracing::warn!("initial refresh failed: {}", e);
    }

    // One-shot mode: resolve the arguments and exit.
    let queries: Vec<String> = std::env::args().skip(1).collect();
    if !queries.is_empty() {
        for query in &queries {
            let answer = match radar.resolve(query) {
                Ok(resolution) => serde_json::json!({ "query": query, "result": resolution }),
                Err(e) => serde_json::json!({ "query": query, "error": e.to_string() }),
            };
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        return Ok(());
    }

    let controller = ShutdownController::new();
    let mut shutdown_rx = controller.subscribe();
    tokio::spawn(shutdown_signal(controller));

    if cfg.refresh_interval_secs == 0 {
        let _ = shutdown_rx.recv().await;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.refresh_interval_secs));
    // The first tick completes immediately; the initial refresh already ran.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                radar.refresh();
                radar.wait().await;
                if let Some(e) = radar.take_error() {
                    tracing::warn!("scheduled refresh failed: {}", e);
                }
                let stats = radar.stats();
                tracing::info!(
                    "serving {} postal records (generation {}), {} ip nodes (generation {})",
                    stats.records,
                    stats.postal_generation,
                    stats.ip_nodes,
                    stats.ip_generation
                );
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    tracing::info!("geo-radar stopped");
    Ok(())
}
