//! Connector registry (§3 `RegistryEntry`, REDESIGN FLAGS): replaces a
//! duck-typed plug-in discovery mechanism with a process-global map from
//! `short_name` to an immutable descriptor plus an instantiation factory.
//! One of the two process-global structures the engine keeps outside a
//! per-job [`crate::context::SyncContext`] — the other is the progress
//! pubsub registry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::destination::Destination;
use crate::source::{AuthMethod, Source};

pub type SourceFactory = Arc<dyn Fn(serde_json::Value) -> Result<Arc<dyn Source>, conflux_core::EngineError> + Send + Sync>;
pub type DestinationFactory =
    Arc<dyn Fn(serde_json::Value) -> Result<Arc<dyn Destination>, conflux_core::EngineError> + Send + Sync>;

#[derive(Clone)]
pub struct SourceRegistryEntry {
    pub short_name: &'static str,
    pub name: &'static str,
    pub supported_auth_methods: &'static [AuthMethod],
    pub requires_byoc: bool,
    pub factory: SourceFactory,
}

#[derive(Clone)]
pub struct DestinationRegistryEntry {
    pub short_name: &'static str,
    pub name: &'static str,
    pub factory: DestinationFactory,
}

#[derive(Debug)]
pub struct RegistryError {
    pub short_name: String,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no connector registered under short_name '{}'", self.short_name)
    }
}

impl std::error::Error for RegistryError {}

/// Registers source and destination connectors by `short_name`, unique
/// within each half of the registry (§3 invariant: "keys unique by
/// short_name"). Re-registering a `short_name` overwrites the prior entry —
/// this is how a deployment swaps in a test double in front of the same
/// name the real connector uses.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    sources: Arc<DashMap<&'static str, SourceRegistryEntry>>,
    destinations: Arc<DashMap<&'static str, DestinationRegistryEntry>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source(&self, entry: SourceRegistryEntry) {
        self.sources.insert(entry.short_name, entry);
    }

    pub fn register_destination(&self, entry: DestinationRegistryEntry) {
        self.destinations.insert(entry.short_name, entry);
    }

    pub fn source_descriptor(&self, short_name: &str) -> Option<SourceRegistryEntry> {
        self.sources.get(short_name).map(|e| e.clone())
    }

    pub fn destination_descriptor(&self, short_name: &str) -> Option<DestinationRegistryEntry> {
        self.destinations.get(short_name).map(|e| e.clone())
    }

    pub fn create_source(&self, short_name: &str, config: serde_json::Value) -> Result<Arc<dyn Source>, conflux_core::EngineError> {
        let entry = self
            .sources
            .get(short_name)
            .ok_or_else(|| conflux_core::EngineError::Validation(RegistryError { short_name: short_name.to_string() }.to_string()))?;
        (entry.factory)(config)
    }

    pub fn create_destination(
        &self,
        short_name: &str,
        config: serde_json::Value,
    ) -> Result<Arc<dyn Destination>, conflux_core::EngineError> {
        let entry = self
            .destinations
            .get(short_name)
            .ok_or_else(|| conflux_core::EngineError::Validation(RegistryError { short_name: short_name.to_string() }.to_string()))?;
        (entry.factory)(config)
    }

    pub fn list_source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|e| e.short_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DirSyncResult, SourceDescriptor, SourceError};
    use async_trait::async_trait;
    use conflux_core::entity::Entity;

    struct StubSource;

    impl SourceDescriptor for StubSource {
        fn short_name(&self) -> &'static str {
            "stub"
        }
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn supported_auth_methods(&self) -> &'static [AuthMethod] {
            &[AuthMethod::Direct]
        }
    }

    #[async_trait]
    impl Source for StubSource {
        async fn validate(&self) -> Result<bool, SourceError> {
            Ok(true)
        }
        fn generate_entities(&self) -> crate::source::EntityStream<'_> {
            Box::pin(tokio_stream::iter(Vec::<Result<Box<dyn Entity>, SourceError>>::new()))
        }
        async fn get_acl_changes(&self, _cursor: Option<&str>) -> Result<DirSyncResult, SourceError> {
            Ok(DirSyncResult::default())
        }
    }

    #[test]
    fn registers_and_instantiates_a_source_by_short_name() {
        let registry = ConnectorRegistry::new();
        registry.register_source(SourceRegistryEntry {
            short_name: "stub",
            name: "Stub",
            supported_auth_methods: &[AuthMethod::Direct],
            requires_byoc: false,
            factory: Arc::new(|_config| Ok(Arc::new(StubSource) as Arc<dyn Source>)),
        });

        let source = registry.create_source("stub", serde_json::json!({})).unwrap();
        assert_eq!(source.short_name(), "stub");
    }

    #[test]
    fn unknown_short_name_is_a_validation_error() {
        let registry = ConnectorRegistry::new();
        let err = registry.create_source("missing", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, conflux_core::EngineError::Validation(_)));
    }

    #[test]
    fn destination_factory_unknown_name_errors_the_same_way() {
        let registry = ConnectorRegistry::new();
        let err = registry.create_destination("missing", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, conflux_core::EngineError::Validation(_)));
    }
}
