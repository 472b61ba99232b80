// Provider Registry
//
// Live provider API instances keyed by provider id

use super::ProviderApi;
use crate::models::{ProviderId, ProviderMetadata};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct RegisteredProvider {
    metadata: ProviderMetadata,
    api: Arc<dyn ProviderApi>,
}

/// Registry of loaded providers
///
/// Loading and unloading provider code happens elsewhere; whoever loads a
/// provider registers its API instance here so the resolver and the test
/// runner can reach it.
#[derive(Default)]
pub struct ProviderApiRegistry {
    providers: RwLock<HashMap<ProviderId, RegisteredProvider>>,
}

impl std::fmt::Debug for ProviderApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderApiRegistry")
            .field("providers", &self.providers.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderApiRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider API instance
    pub fn register(&self, metadata: ProviderMetadata, api: Arc<dyn ProviderApi>) {
        tracing::debug!(provider_id = %metadata.id, "Registering provider API");
        self.providers
            .write()
            .insert(metadata.id.clone(), RegisteredProvider { metadata, api });
    }

    #[must_use]
    pub fn get(&self, provider_id: &ProviderId) -> Option<Arc<dyn ProviderApi>> {
        self.providers
            .read()
            .get(provider_id)
            .map(|p| p.api.clone())
    }

    #[must_use]
    pub fn metadata(&self, provider_id: &ProviderId) -> Option<ProviderMetadata> {
        self.providers
            .read()
            .get(provider_id)
            .map(|p| p.metadata.clone())
    }

    /// Metadata of all registered providers, sorted by id
    #[must_use]
    pub fn list(&self) -> Vec<ProviderMetadata> {
        let mut list: Vec<_> = self
            .providers
            .read()
            .values()
            .map(|p| p.metadata.clone())
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockProvider;

    #[test]
    fn test_register_and_lookup() {
        let registry = ProviderApiRegistry::new();
        let id = ProviderId::new("demo");

        registry.register(
            ProviderMetadata::new("demo", "Demo"),
            Arc::new(MockProvider::default()),
        );

        assert!(registry.get(&id).is_some());
        assert_eq!(registry.metadata(&id).map(|m| m.name), Some("Demo".to_string()));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert!(registry.get(&ProviderId::new("other")).is_none());
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = ProviderApiRegistry::new();
        registry.register(ProviderMetadata::new("b", "B"), Arc::new(MockProvider::default()));
        registry.register(ProviderMetadata::new("a", "A"), Arc::new(MockProvider::default()));

        let ids: Vec<_> = registry.list().into_iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
