//! Actor type registration table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::actor::{ActorFactory, ActorType};

/// Maps actor types to the factories that create their instances.
///
/// Built once at startup; resolving a reference whose type is absent fails
/// with `UnknownReference`.
#[derive(Clone, Default)]
pub struct ActorRegistry {
    factories: HashMap<ActorType, Arc<dyn ActorFactory>>,
}

impl ActorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `actor_type`, replacing any previous one.
    pub fn register(&mut self, actor_type: ActorType, factory: impl ActorFactory) {
        self.factories.insert(actor_type, Arc::new(factory));
    }

    /// Factory for `actor_type`.
    pub fn get(&self, actor_type: &ActorType) -> Option<Arc<dyn ActorFactory>> {
        self.factories.get(actor_type).cloned()
    }

    /// Whether `actor_type` is registered.
    pub fn contains(&self, actor_type: &ActorType) -> bool {
        self.factories.contains_key(actor_type)
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<ActorType> {
        let mut types: Vec<_> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ActorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRegistry")
            .field("types", &self.types())
            .finish()
    }
}
