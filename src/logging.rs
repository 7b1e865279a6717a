//! Logging and tracing infrastructure for gosym.
//!
//! The decoders emit point events only: a warn when a section or
//! symbol is missing, a debug when a fallback path is taken, each
//! keyed by section name or address. There are no spans and no
//! long-running operations, so the subscribers here stay minimal and
//! default to quiet; embedding applications with their own subscriber
//! should skip these and keep theirs.

use std::sync::Once;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Default directive when `RUST_LOG` is unset: decoder warnings only.
const QUIET: &str = "gosym=warn";

/// Install a compact, human-readable subscriber.
///
/// One line per event, with the emitting module kept as the only
/// call-site context; callers filter with `RUST_LOG` as usual.
/// Subsequent calls are ignored.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET));

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    });
}

/// Install a JSON subscriber for log ingestion.
///
/// Event fields (section names, addresses, counts) are flattened into
/// the top-level object so downstream queries can key on them directly.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET));

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .flatten_event(true)
            .init();
    });
}
