use std::collections::HashMap;

use tracing::debug;

use crate::model::SynthesizedType;

/// Declarations of one agent module, in registration order.
///
/// Registration is memoized by name: the first declaration registered under a
/// name wins and later ones are dropped.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: Vec<SynthesizedType>,
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SynthesizedType> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Returns `true` when the declaration was added.
    pub fn register(&mut self, ty: SynthesizedType) -> bool {
        if self.index.contains_key(&ty.name) {
            debug!("type '{}' already registered; keeping first declaration", ty.name);
            return false;
        }
        debug!("registered type '{}'", ty.name);
        self.index.insert(ty.name.clone(), self.types.len());
        self.types.push(ty);
        true
    }

    pub fn types(&self) -> &[SynthesizedType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
