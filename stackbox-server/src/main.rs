use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use stackbox_config::{DirectoryLayout, StackConfig};
use stackbox_server::{build_router, logging};
use stackbox_supervisor::{ControlPanel, SystemProber};
use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_CONTROL_PORT: u16 = 7700;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_dir = match std::env::var_os("STACKBOX_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    // Load and validate configuration
    let config = StackConfig::load_or_create(&base_dir)?;
    let layout = DirectoryLayout::new(&base_dir);
    layout.ensure()?;

    // Initialize logger (before any other logging)
    logging::setup_logging(&base_dir, &config.logging)?;

    info!("Starting stackbox-server v{}", env!("CARGO_PKG_VERSION"));
    info!(base_dir = %base_dir.display(), "Supervising stack");

    let host = config.web_server.host.clone();
    let control_port = match std::env::var("STACKBOX_CONTROL_PORT") {
        Ok(value) => value.parse()?,
        Err(_) => DEFAULT_CONTROL_PORT,
    };

    let panel = ControlPanel::new(config, layout, Arc::new(SystemProber))?;
    let app = build_router(Arc::new(panel));

    let listener = TcpListener::bind((host.as_str(), control_port)).await?;
    info!("Control API listening on http://{host}:{control_port}");

    axum::serve(listener, app).await?;

    Ok(())
}
