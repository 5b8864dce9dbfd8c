//! Column family bookkeeping shared by the in-process engines
//!
//! A `TableSet` maps column family names to ids and ids to tables, tracks
//! which handles are outstanding and whether the engine has been closed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::backend::{ColumnFamilyHandle, EngineIterator};
use super::errors::{EngineError, EngineResult};
use super::options::ColumnFamilyOptions;

/// Ordered key space of one column family
pub(crate) type OrderedTable = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug)]
struct Inner<T> {
    ids: HashMap<String, u32>,
    tables: HashMap<u32, Arc<RwLock<T>>>,
    options: HashMap<u32, ColumnFamilyOptions>,
    live: HashSet<u32>,
    next_id: u32,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            tables: HashMap::new(),
            options: HashMap::new(),
            live: HashSet::new(),
            next_id: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TableSet<T> {
    inner: RwLock<Inner<T>>,
    closed: AtomicBool,
}

impl<T: Default> TableSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> EngineResult<bool> {
        let inner = self.inner.read().map_err(|_| EngineError::poisoned())?;
        Ok(inner.ids.contains_key(name))
    }

    pub(crate) fn names(&self) -> EngineResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| EngineError::poisoned())?;
        let mut names: Vec<_> = inner.ids.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Adds a new, empty column family and returns its id.
    pub(crate) fn add(&self, name: &str, options: ColumnFamilyOptions) -> EngineResult<u32> {
        self.ensure_open()?;
        let mut inner = self.inner.write().map_err(|_| EngineError::poisoned())?;
        if inner.ids.contains_key(name) {
            return Err(EngineError::ColumnFamilyExists(name.to_string()));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.ids.insert(name.to_string(), id);
        inner.tables.insert(id, Arc::new(RwLock::new(T::default())));
        inner.options.insert(id, options);
        Ok(id)
    }

    /// Hands out a handle for an existing column family.
    pub(crate) fn open_handle(&self, name: &str) -> EngineResult<ColumnFamilyHandle> {
        self.ensure_open()?;
        let mut inner = self.inner.write().map_err(|_| EngineError::poisoned())?;
        let id = *inner
            .ids
            .get(name)
            .ok_or_else(|| EngineError::InvalidArgument(format!("column family '{}' does not exist", name)))?;
        inner.live.insert(id);
        Ok(ColumnFamilyHandle::new(id, name))
    }

    /// Options the column family was created with, or declared with at the
    /// latest open
    pub(crate) fn options(&self, name: &str) -> EngineResult<Option<ColumnFamilyOptions>> {
        self.ensure_open()?;
        let inner = self.inner.read().map_err(|_| EngineError::poisoned())?;
        Ok(inner
            .ids
            .get(name)
            .and_then(|id| inner.options.get(id))
            .cloned())
    }

    pub(crate) fn set_options(&self, name: &str, options: ColumnFamilyOptions) -> EngineResult<()> {
        let mut inner = self.inner.write().map_err(|_| EngineError::poisoned())?;
        if let Some(id) = inner.ids.get(name).copied() {
            inner.options.insert(id, options);
        }
        Ok(())
    }

    /// Table behind an existing column family, by name, regardless of handles
    pub(crate) fn table_by_name(&self, name: &str) -> EngineResult<Arc<RwLock<T>>> {
        let inner = self.inner.read().map_err(|_| EngineError::poisoned())?;
        inner
            .ids
            .get(name)
            .and_then(|id| inner.tables.get(id))
            .cloned()
            .ok_or_else(|| EngineError::UnknownColumnFamily(name.to_string()))
    }

    /// Table behind a live handle
    pub(crate) fn table(&self, cf: &ColumnFamilyHandle) -> EngineResult<Arc<RwLock<T>>> {
        self.ensure_open()?;
        let inner = self.inner.read().map_err(|_| EngineError::poisoned())?;
        if !inner.live.contains(&cf.id()) {
            return Err(EngineError::UnknownColumnFamily(cf.name().to_string()));
        }
        inner
            .tables
            .get(&cf.id())
            .cloned()
            .ok_or_else(|| EngineError::UnknownColumnFamily(cf.name().to_string()))
    }

    pub(crate) fn release(&self, cf: ColumnFamilyHandle) -> EngineResult<()> {
        let mut inner = self.inner.write().map_err(|_| EngineError::poisoned())?;
        if !inner.live.remove(&cf.id()) {
            return Err(EngineError::UnknownColumnFamily(cf.name().to_string()));
        }
        Ok(())
    }

    /// Number of handles not yet released
    #[cfg(test)]
    pub(crate) fn live_handles(&self) -> usize {
        self.inner.read().map(|inner| inner.live.len()).unwrap_or(0)
    }

    pub(crate) fn close(&self) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub(crate) fn read_table<T>(table: &RwLock<T>) -> EngineResult<std::sync::RwLockReadGuard<'_, T>> {
    table.read().map_err(|_| EngineError::poisoned())
}

pub(crate) fn write_table<T>(table: &RwLock<T>) -> EngineResult<std::sync::RwLockWriteGuard<'_, T>> {
    table.write().map_err(|_| EngineError::poisoned())
}

/// Forward cursor over an ordered table.
///
/// Each step re-reads the table under a shared lock, so the cursor observes
/// writes made after it was created.
pub(crate) struct TableIterator {
    table: Arc<RwLock<OrderedTable>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    error: Option<String>,
}

impl TableIterator {
    pub(crate) fn new(table: Arc<RwLock<OrderedTable>>) -> Self {
        Self {
            table,
            current: None,
            error: None,
        }
    }

    fn position(&mut self, from: Bound<&[u8]>) {
        let next = match self.table.read() {
            Ok(table) => table
                .range::<[u8], _>((from, Bound::Unbounded))
                .next()
                .map(|(k, v)| (k.clone(), v.clone())),
            Err(_) => {
                self.error = Some("Lock poisoned".to_string());
                None
            }
        };
        self.current = next;
    }
}

impl EngineIterator for TableIterator {
    fn seek(&mut self, target: &[u8]) {
        self.position(Bound::Included(target));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) {
        if let Some((key, _)) = self.current.take() {
            self.position(Bound::Excluded(key.as_slice()));
        }
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or(&[])
    }

    fn status(&self) -> EngineResult<()> {
        match &self.error {
            Some(reason) => Err(EngineError::Internal(reason.clone())),
            None => Ok(()),
        }
    }
}
