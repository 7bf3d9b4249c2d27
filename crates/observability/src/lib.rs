//! Process-wide logging setup shared by the binaries.

/// Initialize tracing for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize with an explicit default filter (used when `RUST_LOG` is unset).
pub fn init_with_default(directive: &str) {
    tracing::init_with_default(directive);
}

/// Subscriber configuration (filters, format).
pub mod tracing;
