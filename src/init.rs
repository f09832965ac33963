use crate::layer::JsonLineLayer;
use crate::logger::Logger;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global `tracing` bridge.
///
/// **Fields**
/// - `enable_stdout_fmt`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`JsonLineLayer`] and events are also printed in the
///   human-readable `fmt` format (to stdout, so mind mixing it with a
///   logger that writes JSON lines to stdout as well).
#[derive(Clone, Debug, Default)]
pub struct LayerConfig {
    pub enable_stdout_fmt: bool,
}

/// Install a global `tracing` subscriber whose events are written through
/// `logger`.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config(logger: Logger, config: LayerConfig) -> Result<(), SetGlobalDefaultError> {
    let layer = JsonLineLayer::new(logger);

    // The two stacks have different types, hence the two branches.
    if config.enable_stdout_fmt {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with [`LayerConfig::default`].
pub fn init_tracing(logger: Logger) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(logger, LayerConfig::default())
}
