//! Namespace registry
//!
//! Maps table names to their engine handle and creation options. Lookups of
//! registered names take a shared lock only. First use of a name is
//! serialized on a per-name creation lock, so concurrent first references
//! create the namespace once and never block creation of other names.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::errors::{SessionError, SessionResult};
use crate::engine::{ColumnFamilyHandle, ColumnFamilyOptions};

/// A registered namespace.
///
/// Owns its handle and its options exclusively; neither changes after
/// registration.
#[derive(Debug)]
pub struct Namespace {
    handle: ColumnFamilyHandle,
    options: ColumnFamilyOptions,
}

impl Namespace {
    pub fn new(handle: ColumnFamilyHandle, options: ColumnFamilyOptions) -> Self {
        Self { handle, options }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &ColumnFamilyHandle {
        &self.handle
    }

    /// Options the namespace was opened or created with
    pub fn options(&self) -> &ColumnFamilyOptions {
        &self.options
    }

    pub(crate) fn into_handle(self) -> ColumnFamilyHandle {
        self.handle
    }
}

#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    entries: RwLock<HashMap<String, Arc<Namespace>>>,
    // One per distinct name ever resolved; never removed.
    creation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered entry for `name`, if any
    pub fn get(&self, name: &str) -> SessionResult<Option<Arc<Namespace>>> {
        let entries = self.entries.read().map_err(|_| SessionError::poisoned())?;
        Ok(entries.get(name).cloned())
    }

    /// Registers a namespace opened with the engine.
    ///
    /// An existing entry is never replaced; registering a name twice is an
    /// internal error.
    pub fn insert(&self, namespace: Namespace) -> SessionResult<Arc<Namespace>> {
        let mut entries = self.entries.write().map_err(|_| SessionError::poisoned())?;
        if entries.contains_key(namespace.name()) {
            return Err(SessionError::Internal(format!(
                "namespace '{}' registered twice",
                namespace.name()
            )));
        }
        let namespace = Arc::new(namespace);
        entries.insert(namespace.name().to_string(), Arc::clone(&namespace));
        Ok(namespace)
    }

    /// Returns the entry for `name`, calling `create` at most once across all
    /// threads if it is not registered yet.
    ///
    /// If `create` fails nothing is registered and a later call retries.
    pub fn get_or_create<F>(&self, name: &str, create: F) -> SessionResult<Arc<Namespace>>
    where
        F: FnOnce() -> SessionResult<Namespace>,
    {
        if let Some(existing) = self.get(name)? {
            return Ok(existing);
        }

        let lock = self.creation_lock(name)?;
        let _guard = lock.lock().map_err(|_| SessionError::poisoned())?;

        if let Some(existing) = self.get(name)? {
            return Ok(existing);
        }

        self.insert(create()?)
    }

    fn creation_lock(&self, name: &str) -> SessionResult<Arc<Mutex<()>>> {
        let mut locks = self
            .creation_locks
            .lock()
            .map_err(|_| SessionError::poisoned())?;
        Ok(Arc::clone(
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Registered names, sorted
    pub fn names(&self) -> SessionResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| SessionError::poisoned())?;
        let mut names: Vec<_> = entries.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every entry.
    ///
    /// A poisoned map is still drained, since no write leaves it half
    /// updated; the poisoning comes back as the second value.
    pub(crate) fn drain(&self) -> (Vec<Arc<Namespace>>, Option<SessionError>) {
        let (mut entries, poisoned) = match self.entries.write() {
            Ok(entries) => (entries, None),
            Err(poison) => (poison.into_inner(), Some(SessionError::poisoned())),
        };
        let namespaces = entries.drain().map(|(_, namespace)| namespace).collect();
        (namespaces, poisoned)
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _entries = self.entries.write().unwrap();
            panic!("registry writer panicked");
        }));
    }
}
