//! Shift reconciliation arithmetic.
//!
//! Everything here is pure: handlers load rows, call into these functions and
//! persist the results. Totals are always recomputed from the full set of rows
//! rather than patched incrementally.

pub mod meter;
pub mod sale;
pub mod shift;
pub mod tank;
