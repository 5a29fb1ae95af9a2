//! Provider factory and registry.
//!
//! The factory creates provider handles from configuration, loading API keys
//! from environment variables when not supplied. The registry maps a
//! `(provider, model)` pair to a shared handle so routing decisions resolve
//! to something invocable without re-reading credentials per call.

use crate::{GeminiProvider, MockProvider, OpenAiProvider, PerplexityProvider};
use relay_abstraction::{Provider, ProviderError, ProviderKind};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Provider handle configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// The provider family to create.
    pub kind: ProviderKind,
    /// The model id (e.g., "gpt-4o", "sonar").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Creates a new `ProviderConfig` with the given family and model id.
    #[must_use]
    pub fn new(kind: ProviderKind, model_id: String) -> Self {
        Self { kind, model_id, api_key: None }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

/// Factory for creating provider handles.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates a provider handle from the given configuration.
    ///
    /// # Errors
    /// Returns a `ProviderError` if creation fails (e.g., missing API key, or
    /// a family that cannot be constructed directly).
    pub fn create(config: ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
        debug!(
            kind = %config.kind,
            model_id = %config.model_id,
            "Creating provider handle"
        );

        match config.kind {
            ProviderKind::OpenAi => {
                let provider = if let Some(api_key) = config.api_key {
                    OpenAiProvider::with_api_key(config.model_id, api_key)
                } else {
                    OpenAiProvider::new(config.model_id)?
                };
                Ok(Arc::new(provider))
            }
            ProviderKind::Gemini => {
                let provider = if let Some(api_key) = config.api_key {
                    GeminiProvider::with_api_key(config.model_id, api_key)
                } else {
                    GeminiProvider::new(config.model_id)?
                };
                Ok(Arc::new(provider))
            }
            ProviderKind::Perplexity => {
                let provider = if let Some(api_key) = config.api_key {
                    PerplexityProvider::with_api_key(config.model_id, api_key)
                } else {
                    PerplexityProvider::new(config.model_id)?
                };
                Ok(Arc::new(provider))
            }
            ProviderKind::Orchestrated => Err(ProviderError::UnsupportedProvider(
                "'orchestrated' labels composed pipeline output and cannot be invoked directly"
                    .to_string(),
            )),
        }
    }
}

/// Registry of invocable provider handles keyed by `(provider, model)`.
pub struct ProviderRegistry {
    /// Registered handles (thread-safe).
    handles: RwLock<HashMap<(ProviderKind, String), Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { handles: RwLock::new(HashMap::new()) }
    }

    /// Registers a handle under its self-reported `(provider, model)` identity.
    ///
    /// Re-registering the same identity replaces the previous handle.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let key = (provider.provider(), provider.model_id().to_string());
        debug!(kind = %key.0, model_id = %key.1, "Registering provider handle");
        let mut handles = match self.handles.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.insert(key, provider);
    }

    /// Looks up a handle for a routing decision.
    #[must_use]
    pub fn get(&self, kind: ProviderKind, model_id: &str) -> Option<Arc<dyn Provider>> {
        let handles = match self.handles.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.get(&(kind, model_id.to_string())).cloned()
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        let handles = match self.handles.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handles.len()
    }

    /// Whether the registry holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a registry from environment credentials for the given catalog.
    ///
    /// Families whose API key is absent are skipped with a warning so a
    /// partially-credentialed process still routes among available providers.
    #[must_use]
    pub fn from_env(catalog: &[(ProviderKind, &str)]) -> Self {
        let registry = Self::new();
        for (kind, model_id) in catalog {
            match ProviderFactory::create(ProviderConfig::new(*kind, (*model_id).to_string())) {
                Ok(provider) => registry.register(provider),
                Err(e) => {
                    warn!(kind = %kind, model_id = %model_id, error = %e, "Skipping provider");
                }
            }
        }
        registry
    }

    /// Builds a registry of mock handles for the given catalog (tests, demos).
    #[must_use]
    pub fn with_mocks(catalog: &[(ProviderKind, &str)]) -> Self {
        let registry = Self::new();
        for (kind, model_id) in catalog {
            registry.register(Arc::new(MockProvider::new(*kind, (*model_id).to_string())));
        }
        registry
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
