//! Tracing setup shared by the yaml-shellcheck binaries.
//!
//! [`init_tracing`] installs the global subscriber. Log lines go to stderr
//! so that analyzer output printed on stdout stays machine readable.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber: plain text, or newline-delimited JSON
/// when `json` is set. `level` applies unless `RUST_LOG` is given.
///
/// Both formats drop the module target; the `file` and `label` fields
/// already say where a line comes from. Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
