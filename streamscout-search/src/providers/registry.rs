//! In-memory provider registry.

use async_trait::async_trait;
use parking_lot::RwLock;
use streamscout_core::{ProviderCapability, ProviderDescriptor};

use super::ProviderRegistry;
use crate::errors::ApiError;

/// Registry backed by a fixed list that can be toggled at runtime.
#[derive(Debug, Default)]
pub struct StaticProviderRegistry {
    providers: RwLock<Vec<ProviderDescriptor>>,
}

impl StaticProviderRegistry {
    pub fn new(providers: impl IntoIterator<Item = ProviderDescriptor>) -> Self {
        Self {
            providers: RwLock::new(providers.into_iter().collect()),
        }
    }

    /// Adds a provider, replacing any entry with the same id.
    pub fn register(&self, provider: ProviderDescriptor) {
        let mut providers = self.providers.write();
        providers.retain(|existing| existing.id != provider.id);
        providers.push(provider);
    }

    /// Enables or disables a provider; returns `false` for unknown ids.
    pub fn set_enabled(&self, provider_id: &str, enabled: bool) -> bool {
        let mut providers = self.providers.write();
        match providers.iter_mut().find(|provider| provider.id == provider_id) {
            Some(provider) => {
                provider.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

#[async_trait]
impl ProviderRegistry for StaticProviderRegistry {
    async fn enabled_providers(&self) -> Result<Vec<ProviderDescriptor>, ApiError> {
        Ok(self
            .providers
            .read()
            .iter()
            .filter(|provider| provider.enabled)
            .cloned()
            .collect())
    }

    async fn providers_by_capability(
        &self,
        capability: ProviderCapability,
    ) -> Result<Vec<ProviderDescriptor>, ApiError> {
        Ok(self
            .providers
            .read()
            .iter()
            .filter(|provider| provider.enabled && provider.has_capability(capability))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_providers_are_hidden() {
        let registry = StaticProviderRegistry::new([
            ProviderDescriptor::new("a", "A"),
            ProviderDescriptor::new("b", "B").disabled(),
        ]);

        let enabled = registry.enabled_providers().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, "a");

        assert!(registry.set_enabled("b", true));
        assert!(!registry.set_enabled("missing", true));
        assert_eq!(registry.enabled_providers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_capability_lookup() {
        let registry = StaticProviderRegistry::new([
            ProviderDescriptor::new("meta", "Meta").with_capabilities([ProviderCapability::Metadata]),
            ProviderDescriptor::new("swarm", "Swarm")
                .with_capabilities([ProviderCapability::Streaming, ProviderCapability::PeerToPeer]),
        ]);

        let streaming = registry
            .providers_by_capability(ProviderCapability::Streaming)
            .await
            .unwrap();
        assert_eq!(streaming.len(), 1);
        assert_eq!(streaming[0].id, "swarm");

        registry.register(ProviderDescriptor::new("meta", "Meta v2"));
        assert_eq!(registry.len(), 2);
    }
}
