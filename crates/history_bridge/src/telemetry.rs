use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Installs the global `fmt` subscriber filtered by `settings.log_filter`.
///
/// Returns `false` when a subscriber was already installed, which makes the
/// call safe to repeat from tests and embedding hosts.
pub fn init_tracing(settings: &Settings) -> anyhow::Result<bool> {
    let filter = EnvFilter::try_new(&settings.log_filter)
        .map_err(|err| anyhow::anyhow!("invalid log filter '{}': {err}", settings.log_filter))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok())
}
