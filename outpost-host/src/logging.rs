//! Tracing subscriber setup for the add-on process.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence over `level` when set. Set `json` for
/// machine-readable output.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter or a global
/// subscriber is already installed.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_fails() {
        // Only one global subscriber may exist per process, so the second
        // call must fail regardless of which test ran first.
        let _ = init_logging("info", false);
        assert!(init_logging("info", false).is_err());
    }
}
