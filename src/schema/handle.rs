//! Shared, reloadable schema reference

use std::path::Path;
use std::sync::{Arc, RwLock};

use super::loader::{load_file, SchemaError};
use super::model::SchemaModel;

/// Cheaply cloneable handle to the current schema.
///
/// Readers take an `Arc` snapshot and keep using it for the whole request;
/// a reload swaps the pointer and never mutates a model in place.
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    inner: Arc<RwLock<Arc<SchemaModel>>>,
}

impl SchemaHandle {
    pub fn new(model: SchemaModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(model))),
        }
    }

    /// Snapshot of the current schema
    pub fn current(&self) -> Arc<SchemaModel> {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Install a new schema, returning the one it replaced.
    pub fn replace(&self, model: SchemaModel) -> Arc<SchemaModel> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(model))
    }

    /// Load a schema file and install it.
    ///
    /// The file is fully parsed and checked before the swap; on error the
    /// current schema stays in place.
    pub fn reload_from(&self, path: &Path) -> Result<Arc<SchemaModel>, SchemaError> {
        let model = match load_file(path) {
            Ok(model) => model,
            Err(err) => {
                log::warn!("schema reload from {} failed: {err}", path.display());
                return Err(err);
            }
        };
        let previous = self.replace(model);
        log::info!(
            "schema '{}' replaced from {}",
            previous.id(),
            path.display()
        );
        Ok(self.current())
    }
}
