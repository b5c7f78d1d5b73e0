//! Tracing hooks.
//!
//! Compiled to no-ops unless the `tracing` feature is on. Wire a subscriber
//! in the embedding binary.

#[cfg(feature = "tracing")]
pub fn record(op: &'static str, rows_in: usize, rows_out: usize) {
    tracing::trace!(op, rows_in, rows_out, "operator finished");
}

#[cfg(not(feature = "tracing"))]
pub fn record(_op: &'static str, _rows_in: usize, _rows_out: usize) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn groups_built(keys: usize, rows: usize, groups: usize) {
    tracing::trace!(keys, rows, groups, "group index built");
}

#[cfg(not(feature = "tracing"))]
pub fn groups_built(_keys: usize, _rows: usize, _groups: usize) { /* no-op */
}
