//! Logging setup with file rotation.

use std::path::Path;

use stackbox_config::LoggingSettings;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with console and rotating file output.
///
/// Console output is human readable; the file layer writes daily
/// rotated files under the configured log directory, keeping one week.
pub fn setup_logging(
    base_dir: &Path,
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = base_dir.join(&settings.directory);
    std::fs::create_dir_all(&logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(7)
        .filename_prefix("stackbox-server")
        .filename_suffix("log")
        .build(&logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
