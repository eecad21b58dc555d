use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// The dashboard owns the terminal, so logs go to a daily-rotated JSON file.
pub fn init_file(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let file_layer = fmt::layer()
        .with_writer(rolling::daily(dir, "scanfeed.log"))
        .with_ansi(false)
        .json();
    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .try_init()?;
    Ok(())
}

/// Human-readable lines on stderr for one-shot commands; stdout stays clean
/// for `--json` output.
pub fn init_stderr() -> Result<(), Box<dyn std::error::Error>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}
