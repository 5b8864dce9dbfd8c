//! # Engine Session
//!
//! A session owns the one engine opened against a data directory and shares
//! it between every client that joins. Lifecycle:
//!
//! ```text
//! Unopened --open--> Open(ref_count = 1) --open--> Open(ref_count + 1)
//!    ^                                                  |
//!    +------------- close (ref_count reaches 0) --------+
//! ```
//!
//! `open` and `close` hold the lifecycle mutex for their whole duration, so
//! two engines are never opened against one directory and no close runs
//! while another thread is mid-open. The first opener's directory and
//! configuration win; later `open` calls only join.

mod errors;
pub mod manifest;
mod registry;
mod resolver;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

pub use errors::{SessionError, SessionResult};
pub use registry::{Namespace, NamespaceRegistry};
pub use resolver::{OptionsOrigin, OptionsResolver, ResolvedOptions};

use crate::engine::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, DbOptions, Engine, EngineDriver, EngineKind,
    EngineOptions, OpenedEngine, Options, OptionsFile, DEFAULT_COLUMN_FAMILY,
};
use crate::observability::{
    log_event_with_fields, Event, ObservationScope, OperationMetrics, Severity,
    SCOPE_SESSION_CLOSE, SCOPE_SESSION_OPEN,
};

/// Where engine configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// JSON options file declaring db options and column families
    OptionsFile(PathBuf),
    /// Baseline options, namespaces from the directory's name manifest
    Defaults,
}

impl ConfigSource {
    pub fn from_options_file(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => ConfigSource::OptionsFile(path),
            None => ConfigSource::Defaults,
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    ref_count: usize,
    directory: Option<PathBuf>,
    config_source: Option<ConfigSource>,
}

static GLOBAL_SESSION: OnceLock<Arc<Session>> = OnceLock::new();

/// Reference-counted engine session
#[derive(Debug)]
pub struct Session {
    driver: Arc<dyn EngineDriver>,
    lifecycle: Mutex<Lifecycle>,
    active: RwLock<Option<Arc<ActiveEngine>>>,
    metrics: Arc<OperationMetrics>,
}

impl Session {
    pub fn new(driver: Arc<dyn EngineDriver>) -> Self {
        Self {
            driver,
            lifecycle: Mutex::new(Lifecycle::default()),
            active: RwLock::new(None),
            metrics: Arc::new(OperationMetrics::new()),
        }
    }

    /// The process-wide session.
    ///
    /// Uses the default engine unless `init_global` ran first.
    pub fn global() -> Arc<Session> {
        Arc::clone(
            GLOBAL_SESSION.get_or_init(|| Arc::new(Session::new(EngineKind::default().driver()))),
        )
    }

    /// Installs the process-wide session with `driver` if none exists yet.
    ///
    /// Returns the installed session, which keeps its original driver if it
    /// was already initialized.
    pub fn init_global(driver: Arc<dyn EngineDriver>) -> Arc<Session> {
        Arc::clone(GLOBAL_SESSION.get_or_init(|| Arc::new(Session::new(driver))))
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    // Lifecycle fields are only written after the fallible work of open and
    // close, so the state behind a poisoned guard is still consistent.
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the engine, or joins the already open one.
    ///
    /// # Errors
    ///
    /// `SessionError::EngineInit` if the directory cannot be created, the
    /// configuration cannot be resolved or the engine refuses to open.
    /// `ref_count` is unchanged on error.
    pub fn open(&self, directory: impl AsRef<Path>, config_source: ConfigSource) -> SessionResult<()> {
        let mut lifecycle = self.lifecycle();

        if lifecycle.ref_count > 0 {
            lifecycle.ref_count += 1;
            let ref_count = lifecycle.ref_count.to_string();
            log_event_with_fields(
                Severity::Trace,
                Event::SessionJoined,
                &[("ref_count", &ref_count)],
            );
            return Ok(());
        }

        let directory = directory.as_ref();
        let directory_str = directory.display().to_string();
        let options_file_str = match &config_source {
            ConfigSource::OptionsFile(path) => path.display().to_string(),
            ConfigSource::Defaults => "none".to_string(),
        };
        let scope = ObservationScope::with_fields(
            SCOPE_SESSION_OPEN,
            &[
                ("directory", &directory_str),
                ("engine", self.driver.name()),
                ("options_file", &options_file_str),
            ],
        );

        match self.open_engine(directory, &config_source) {
            Ok(active) => {
                let namespaces = active.registry.len().to_string();
                let mut slot = self
                    .active
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                *slot = Some(Arc::new(active));
                lifecycle.ref_count = 1;
                lifecycle.directory = Some(directory.to_path_buf());
                lifecycle.config_source = Some(config_source);
                scope.complete_with_fields(&[("namespaces", &namespaces)]);
                Ok(())
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn open_engine(
        &self,
        directory: &Path,
        config_source: &ConfigSource,
    ) -> SessionResult<ActiveEngine> {
        let init_error = |reason: String| SessionError::engine_init(directory.display().to_string(), reason);

        fs::create_dir_all(directory)
            .map_err(|e| init_error(format!("failed to create data directory: {}", e)))?;

        let (engine_options, descriptors, options_file) = match config_source {
            ConfigSource::OptionsFile(path) => {
                let file = OptionsFile::load(path).map_err(|e| init_error(e.to_string()))?;
                let path_str = path.display().to_string();
                let declared = file.column_families.len().to_string();
                log_event_with_fields(
                    Severity::Info,
                    Event::OptionsFileLoaded,
                    &[("path", &path_str), ("column_families", &declared)],
                );
                let descriptors = file.open_descriptors();
                (EngineOptions::Multi(file.db.clone()), descriptors, Some(file))
            }
            ConfigSource::Defaults => {
                let names = manifest::load(directory).map_err(|e| init_error(e.to_string()))?;
                let count = names.len().to_string();
                log_event_with_fields(Severity::Info, Event::ManifestLoaded, &[("names", &count)]);

                if names.is_empty() {
                    (EngineOptions::Simple(Options::baseline()), Vec::new(), None)
                } else {
                    let mut descriptors: Vec<_> = names
                        .into_iter()
                        .map(|name| ColumnFamilyDescriptor::new(name, ColumnFamilyOptions::baseline()))
                        .collect();
                    if !descriptors.iter().any(|d| d.name == DEFAULT_COLUMN_FAMILY) {
                        descriptors.insert(
                            0,
                            ColumnFamilyDescriptor::new(
                                DEFAULT_COLUMN_FAMILY,
                                ColumnFamilyOptions::baseline(),
                            ),
                        );
                    }
                    (EngineOptions::Multi(DbOptions::baseline()), descriptors, None)
                }
            }
        };

        let OpenedEngine { engine, handles } = self
            .driver
            .open(directory, &engine_options, &descriptors)
            .map_err(|e| init_error(e.to_string()))?;

        let handle_options: Vec<ColumnFamilyOptions> = match &engine_options {
            EngineOptions::Simple(options) => vec![options.column_family.clone()],
            EngineOptions::Multi(_) => descriptors.into_iter().map(|d| d.options).collect(),
        };
        if handles.len() != handle_options.len() {
            let _ = engine.close();
            return Err(init_error(format!(
                "engine returned {} handles for {} column families",
                handles.len(),
                handle_options.len()
            )));
        }

        let registry = NamespaceRegistry::new();
        for (handle, options) in handles.into_iter().zip(handle_options) {
            if let Err(e) = registry.insert(Namespace::new(handle, options)) {
                let _ = engine.close();
                return Err(init_error(e.to_string()));
            }
        }

        Ok(ActiveEngine {
            engine,
            directory: directory.to_path_buf(),
            resolver: OptionsResolver::new(options_file),
            registry,
            metrics: Arc::clone(&self.metrics),
        })
    }

    /// Releases one reference; the last one shuts the engine down.
    ///
    /// A close with no matching open is logged and ignored.
    ///
    /// # Errors
    ///
    /// `SessionError::EngineShutdown` if releasing handles, closing the
    /// engine or saving the manifest failed. The session is closed anyway.
    pub fn close(&self) -> SessionResult<()> {
        let mut lifecycle = self.lifecycle();

        match lifecycle.ref_count {
            0 => {
                log_event_with_fields(
                    Severity::Warn,
                    Event::SessionCloseUnmatched,
                    &[("engine", self.driver.name())],
                );
                return Ok(());
            }
            1 => {}
            _ => {
                lifecycle.ref_count -= 1;
                let ref_count = lifecycle.ref_count.to_string();
                log_event_with_fields(
                    Severity::Trace,
                    Event::SessionReleased,
                    &[("ref_count", &ref_count)],
                );
                return Ok(());
            }
        }

        lifecycle.ref_count = 0;
        lifecycle.config_source = None;
        let directory_str = lifecycle
            .directory
            .take()
            .map(|d| d.display().to_string())
            .unwrap_or_default();

        let active = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let scope = ObservationScope::with_fields(SCOPE_SESSION_CLOSE, &[("directory", &directory_str)]);
        let result = match active {
            Some(active) => active.shutdown(),
            None => Ok(()),
        };

        match result {
            Ok(()) => {
                scope.complete();
                Ok(())
            }
            Err(e) => {
                log_event_with_fields(
                    Severity::Error,
                    Event::SessionShutdownFailed,
                    &[("directory", &directory_str), ("error", &e.to_string())],
                );
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Number of outstanding `open` calls
    pub fn ref_count(&self) -> usize {
        self.lifecycle().ref_count
    }

    pub fn is_open(&self) -> bool {
        self.ref_count() > 0
    }

    /// Data directory of the open engine
    pub fn directory(&self) -> Option<PathBuf> {
        self.lifecycle().directory.clone()
    }

    pub fn config_source(&self) -> Option<ConfigSource> {
        self.lifecycle().config_source.clone()
    }

    /// The open engine.
    ///
    /// # Errors
    ///
    /// `SessionError::NotOpen` when no engine is open.
    pub fn active(&self) -> SessionResult<Arc<ActiveEngine>> {
        let active = self.active.read().map_err(|_| SessionError::poisoned())?;
        active.as_ref().map(Arc::clone).ok_or(SessionError::NotOpen)
    }

    /// Operation counters shared by every client of this session
    pub fn metrics(&self) -> Arc<OperationMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// An open engine with its namespace registry
#[derive(Debug)]
pub struct ActiveEngine {
    engine: Box<dyn Engine>,
    directory: PathBuf,
    resolver: OptionsResolver,
    registry: NamespaceRegistry,
    metrics: Arc<OperationMetrics>,
}

impl ActiveEngine {
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn resolver(&self) -> &OptionsResolver {
        &self.resolver
    }

    /// Registered namespace names, sorted
    pub fn namespace_names(&self) -> SessionResult<Vec<String>> {
        self.registry.names()
    }

    /// The namespace for `name`, created on the engine on first use.
    ///
    /// # Errors
    ///
    /// `SessionError::NamespaceCreate` if the engine refuses the creation.
    pub fn namespace(&self, name: &str) -> SessionResult<Arc<Namespace>> {
        self.registry.get_or_create(name, || {
            let resolved = self.resolver.resolve(name);
            let descriptor = ColumnFamilyDescriptor::new(name, resolved.options);
            let handle = self
                .engine
                .create_column_family(&descriptor)
                .map_err(|source| SessionError::NamespaceCreate {
                    name: name.to_string(),
                    source,
                })?;

            self.metrics.record_namespace_created();
            log_event_with_fields(
                Severity::Info,
                Event::NamespaceCreated,
                &[("namespace", name), ("options", resolved.origin.as_str())],
            );
            Ok(Namespace::new(handle, descriptor.options))
        })
    }

    // Release every handle, close the engine, persist the names. Keeps going
    // after a failure and reports all of them.
    fn shutdown(&self) -> SessionResult<()> {
        let mut failures = Vec::new();

        let (namespaces, poisoned) = self.registry.drain();
        if let Some(e) = poisoned {
            failures.push(format!("namespace registry: {}", e));
        }
        let names: Vec<String> = namespaces.iter().map(|ns| ns.name().to_string()).collect();

        for namespace in namespaces {
            match Arc::try_unwrap(namespace) {
                Ok(namespace) => {
                    if let Err(e) = self.engine.release_column_family(namespace.into_handle()) {
                        failures.push(e.to_string());
                    }
                }
                Err(shared) => failures.push(format!(
                    "namespace '{}' still in use at close",
                    shared.name()
                )),
            }
        }

        if let Err(e) = self.engine.close() {
            failures.push(e.to_string());
        }

        match manifest::save(&self.directory, names.iter().map(String::as_str)) {
            Ok(()) => {
                let count = names.len().to_string();
                log_event_with_fields(Severity::Info, Event::ManifestSaved, &[("names", &count)]);
            }
            Err(e) => failures.push(e.to_string()),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SessionError::EngineShutdown(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryDriver;
    use tempfile::TempDir;

    fn memory_session() -> Session {
        Session::new(Arc::new(MemoryDriver))
    }

    #[test]
    fn test_open_close_refcount() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();

        session.open(dir.path(), ConfigSource::Defaults).unwrap();
        session.open("/ignored/by/join", ConfigSource::Defaults).unwrap();
        assert_eq!(session.ref_count(), 2);
        assert_eq!(session.directory().unwrap(), dir.path());

        session.close().unwrap();
        assert!(session.is_open());
        session.close().unwrap();
        assert!(!session.is_open());
        assert!(session.directory().is_none());
        assert!(matches!(session.active(), Err(SessionError::NotOpen)));

        session.close().unwrap();
        assert_eq!(session.ref_count(), 0);
    }

    #[test]
    fn test_defaults_register_default_namespace() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();
        session.open(dir.path(), ConfigSource::Defaults).unwrap();

        let active = session.active().unwrap();
        assert_eq!(active.namespace_names().unwrap(), vec!["default"]);
        let default = active.namespace(DEFAULT_COLUMN_FAMILY).unwrap();
        assert_eq!(default.options(), &ColumnFamilyOptions::baseline());
        drop(default);
        drop(active);

        session.close().unwrap();
    }

    #[test]
    fn test_missing_options_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();
        let err = session
            .open(
                dir.path(),
                ConfigSource::OptionsFile(dir.path().join("missing.json")),
            )
            .unwrap_err();
        assert_eq!(err.code(), "CFB_SESSION_ENGINE_INIT");
        assert_eq!(session.ref_count(), 0);
    }

    #[test]
    fn test_close_writes_manifest() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();
        session.open(dir.path(), ConfigSource::Defaults).unwrap();
        session.active().unwrap().namespace("usertable").unwrap();
        session.close().unwrap();

        assert_eq!(
            manifest::load(dir.path()).unwrap(),
            vec!["default", "usertable"]
        );
    }

    #[test]
    fn test_poisoned_registry_still_shuts_down() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();
        session.open(dir.path(), ConfigSource::Defaults).unwrap();

        let active = session.active().unwrap();
        active.namespace("usertable").unwrap();
        active.registry.poison();

        let err = session.close().unwrap_err();
        assert_eq!(err.code(), "CFB_SESSION_ENGINE_SHUTDOWN");
        assert!(err.to_string().contains("namespace registry"), "{}", err);
        assert_eq!(session.ref_count(), 0);

        // The engine was closed and every name persisted
        assert!(active.engine().column_family_options("default").is_err());
        assert_eq!(
            manifest::load(dir.path()).unwrap(),
            vec!["default", "usertable"]
        );

        drop(active);
        session.open(dir.path(), ConfigSource::Defaults).unwrap();
        session.close().unwrap();
    }

    #[test]
    fn test_namespace_created_counts_once() {
        let dir = TempDir::new().unwrap();
        let session = memory_session();
        session.open(dir.path(), ConfigSource::Defaults).unwrap();
        let active = session.active().unwrap();
        active.namespace("t1").unwrap();
        active.namespace("t1").unwrap();
        assert_eq!(session.metrics().snapshot().namespaces_created, 1);
        drop(active);
        session.close().unwrap();
    }
}
