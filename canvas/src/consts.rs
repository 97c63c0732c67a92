//! Shared numeric constants for the canvas crate.

// ── Node geometry ───────────────────────────────────────────────

/// Width given to every freshly created node shape, in canvas units.
pub const DEFAULT_NODE_WIDTH: f64 = 200.0;

/// Height given to every freshly created node shape, in canvas units.
pub const DEFAULT_NODE_HEIGHT: f64 = 120.0;
