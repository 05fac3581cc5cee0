//! Logging bootstrap.
//!
//! Thin wrapper over `tracing-subscriber`; simulations call this once at
//! startup and log through the `tracing` macros everywhere else.

use tracing::Level;

/// Initialize logging at the given level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init();
}

/// Initialize logging at `INFO`.
pub fn init() {
    init_with_level(Level::INFO);
}
