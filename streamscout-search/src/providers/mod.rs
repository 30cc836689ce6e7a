//! Provider boundary: registry access and per-provider query functions.
//!
//! Concrete adapters translate a provider's wire format into
//! [`RawResult`]s or [`SourceMetadata`]; the engine only sees these traits.

use async_trait::async_trait;
use streamscout_core::{ProviderCapability, ProviderDescriptor, RawResult, SearchQuery, SourceMetadata};

use crate::errors::ApiError;

pub mod demo;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod registry;
pub mod request;

pub use demo::DemoProviderClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockBehavior, MockProviderClient, UnavailableRegistry, distinct_results, numbered_providers};
pub use registry::StaticProviderRegistry;
pub use request::{ContentRequest, ProviderRequest};

/// Source of provider descriptors.
#[async_trait]
pub trait ProviderRegistry: Send + Sync + std::fmt::Debug {
    /// All providers currently enabled.
    ///
    /// # Errors
    /// - `ApiError` - Registry backend unreachable or corrupt
    async fn enabled_providers(&self) -> Result<Vec<ProviderDescriptor>, ApiError>;

    /// Enabled providers declaring `capability`.
    ///
    /// # Errors
    /// - `ApiError` - Registry backend unreachable or corrupt
    async fn providers_by_capability(
        &self,
        capability: ProviderCapability,
    ) -> Result<Vec<ProviderDescriptor>, ApiError>;
}

/// Per-provider query functions.
///
/// Implementations may be slow or fail; callers enforce deadlines and
/// rate limits around every call.
#[async_trait]
pub trait ProviderClient: Send + Sync + std::fmt::Debug {
    /// Catalogue search for free text.
    ///
    /// # Errors
    /// - `ApiError` - Provider rejected the query or could not be reached
    async fn search(
        &self,
        provider: &ProviderDescriptor,
        query: &SearchQuery,
    ) -> Result<Vec<RawResult>, ApiError>;

    /// Streaming sources for one piece of content.
    ///
    /// # Errors
    /// - `ApiError` - Provider rejected the request or could not be reached
    async fn fetch_sources(
        &self,
        provider: &ProviderDescriptor,
        request: &ProviderRequest,
    ) -> Result<Vec<SourceMetadata>, ApiError>;
}
