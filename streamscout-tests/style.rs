//! Style Enforcement Tests
//!
//! Scans the workspace's production sources for patterns clippy does not
//! catch on its own.
//!
//! - `production_code` - No dead code allowances, no `unwrap()` outside tests

#[path = "style/production_code.rs"]
mod production_code;
