use tracing_subscriber::EnvFilter;

use crate::error::{CliError, Result};

const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber.
///
/// An explicit `filter` wins over `RUST_LOG`; without either, only warnings
/// and errors are shown.
pub(crate) fn init(filter: Option<&str>) -> Result<()> {
    let env_filter = build_filter(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn build_filter(filter: Option<&str>) -> Result<EnvFilter> {
    match filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|source| CliError::LogFilter {
                filter: directives.to_string(),
                source,
            })
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}
