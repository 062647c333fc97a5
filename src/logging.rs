//! Logging setup (§4.I ambient stack).
//!
//! Grounded on the teacher's `tracing_subscriber::registry()` + `fmt` +
//! `EnvFilter` stack, with a `reload::Layer` in front of the filter so
//! `SIGHUP` (§4.J) can rebuild it without a restart.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static RELOAD_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Build an `EnvFilter` from a 0-5 verbosity level and an optional
/// comma-separated domain list, e.g. level `3` + `"command_reader"`
/// enables `debug` everywhere and leaves `command_reader` at its own
/// directive (still `debug`, here, but distinct so `--logdomains` can
/// single one out without raising the rest).
fn build_filter(level: u8, domains: &str) -> EnvFilter {
    let level_name = match level {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let mut filter = EnvFilter::new(format!("cliap2={level_name}"));
    for domain in domains.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        if let Ok(directive) = format!("{domain}={level_name}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber. Must be called exactly once, before any
/// reader thread starts logging.
pub fn init(level: u8, domains: &str) {
    let (filter_layer, handle) = reload::Layer::new(build_filter(level, domains));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter_layer)
        .init();
    let _ = RELOAD_HANDLE.set(handle);
}

/// Rebuild the active filter from `RUST_LOG`, falling back to the
/// compiled-in default if it's unset or unparsable. `SIGHUP`'s handler
/// calls this; a no-op if `init` was never called.
pub fn reinit() {
    let Some(handle) = RELOAD_HANDLE.get() else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(2, ""));
    if handle.reload(filter).is_err() {
        tracing::warn!(target: "logging", "failed to reload log filter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_filter_accepts_all_levels() {
        for level in 0..=9u8 {
            let _ = build_filter(level, "command_reader,audio_reader");
        }
    }

    #[test]
    fn build_filter_ignores_blank_domains() {
        let _ = build_filter(2, " , ,");
    }
}
