use anyhow::Context;
use smartsum::{api, config, logging, processing::Pipeline};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let pipeline =
        Pipeline::from_config(config).context("Failed to initialize summarization backend")?;
    let app = api::create_router(Arc::new(pipeline));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!(
        port,
        write_output = config.write_output,
        "Summarizer listening on http://0.0.0.0:{port}"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind `preferred` when set; otherwise take the first free port in [`FALLBACK_PORTS`].
async fn bind_listener(preferred: Option<u16>) -> std::io::Result<(TcpListener, u16)> {
    if let Some(port) = preferred {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        return Ok((listener, port));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port busy");
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!(
            "no free port between {} and {}",
            FALLBACK_PORTS.start(),
            FALLBACK_PORTS.end()
        ),
    ))
}
