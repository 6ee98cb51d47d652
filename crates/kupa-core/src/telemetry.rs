//! Log output for the `kupa` binary.
//!
//! All diagnostics go to stderr, leaving stdout to the report itself.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Route `tracing` events to stderr, as plain lines or as JSON objects.
///
/// `RUST_LOG` wins over `level` when set. Only the first call in a process
/// installs anything.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let plain = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let structured = json.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_ignored() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
        tracing::info!("still logging");
    }
}
