//! Integration tests for Streamscout
//!
//! These tests drive the search engine through its public API with
//! scripted providers on a paused clock: provider isolation, early
//! completion, cancellation, permit accounting and the source façade.

#[path = "integration/orchestration.rs"]
mod orchestration;

#[path = "integration/rate_limiting.rs"]
mod rate_limiting;

#[path = "integration/source_lookup.rs"]
mod source_lookup;
