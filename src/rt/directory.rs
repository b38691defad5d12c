//! Type lookup used by call-site resolution

use std::collections::HashMap;

use parking_lot::RwLock;

use super::types::TypeHandle;
use crate::error::{Error, Result};

/// Reflective lookup of defined types by internal name
pub trait TypeDirectory: Send + Sync {
    fn find_type(&self, name: &str) -> Option<TypeHandle>;
}

/// Types defined in one runtime
#[derive(Default)]
pub struct ClassRegistry {
    types: RwLock<HashMap<String, TypeHandle>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a name can only be defined once
    pub(crate) fn insert(&self, handle: TypeHandle) -> Result<()> {
        let mut types = self.types.write();
        if types.contains_key(handle.name()) {
            return Err(Error::DuplicateType { name: handle.name().to_string() });
        }
        types.insert(handle.name().to_string(), handle);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl TypeDirectory for ClassRegistry {
    fn find_type(&self, name: &str) -> Option<TypeHandle> {
        self.types.read().get(name).cloned()
    }
}

impl<T: TypeDirectory + ?Sized> TypeDirectory for std::sync::Arc<T> {
    fn find_type(&self, name: &str) -> Option<TypeHandle> {
        (**self).find_type(name)
    }
}
