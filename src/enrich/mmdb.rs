//! MaxMind database handles with atomic reload.
//!
//! # Responsibilities
//! - Open a `.mmdb` file into memory
//! - Hand out immutable reader snapshots to in-flight lookups
//! - Swap in a freshly loaded reader when the file changes on disk
//!
//! A reload never mutates the reader a lookup is using: the new reader is
//! built completely and then installed with a single atomic store.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use maxminddb::{MaxMindDBError, Reader};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;

use crate::enrich::enricher::EnricherError;
use crate::observability::metrics;

/// A named, hot-swappable MaxMind reader.
pub struct MmdbHandle {
    name: &'static str,
    path: PathBuf,
    reader: ArcSwap<Reader<Vec<u8>>>,
}

impl MmdbHandle {
    /// Open the database at `path`. Fails if the file is missing or invalid.
    pub fn open(name: &'static str, path: impl AsRef<Path>) -> Result<Self, MaxMindDBError> {
        let path = path.as_ref().to_path_buf();
        let reader = Reader::open_readfile(&path)?;

        tracing::info!(
            database = name,
            path = %path.display(),
            database_type = %reader.metadata.database_type,
            build_epoch = reader.metadata.build_epoch,
            "MaxMind database opened"
        );

        Ok(Self {
            name,
            path,
            reader: ArcSwap::from_pointee(reader),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the currently installed reader.
    pub fn reader(&self) -> Arc<Reader<Vec<u8>>> {
        self.reader.load_full()
    }

    /// Reload from disk and install the new reader.
    ///
    /// On error the previous reader stays installed.
    pub fn reload(&self) -> Result<(), MaxMindDBError> {
        match Reader::open_readfile(&self.path) {
            Ok(reader) => {
                tracing::info!(
                    database = self.name,
                    build_epoch = reader.metadata.build_epoch,
                    "MaxMind database reloaded"
                );
                self.reader.store(Arc::new(reader));
                metrics::record_database_reload(self.name, true);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    database = self.name,
                    error = %e,
                    "Failed to reload MaxMind database. Keeping current reader."
                );
                metrics::record_database_reload(self.name, false);
                Err(e)
            }
        }
    }

    /// Decode the record for `addr`; `Ok(None)` when the database has none.
    pub fn lookup<T: DeserializeOwned>(&self, addr: IpAddr) -> Result<Option<T>, EnricherError> {
        let reader = self.reader();
        match reader.lookup::<T>(addr) {
            Ok(record) => Ok(Some(record)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(EnricherError::Database(e.to_string())),
        }
    }
}

impl std::fmt::Debug for MmdbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmdbHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Watches database files and reloads their handles on change.
pub struct DatabaseWatcher {
    handles: Vec<Arc<MmdbHandle>>,
}

impl DatabaseWatcher {
    pub fn new(handles: Vec<Arc<MmdbHandle>>) -> Self {
        Self { handles }
    }

    /// Start watching. Reloads happen on notify's thread until the returned
    /// watcher is dropped.
    ///
    /// Parent directories are watched rather than the files, so databases
    /// replaced by rename are still picked up.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let handles = self.handles.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    for handle in &handles {
                        if event.paths.iter().any(|p| same_file_name(p, handle.path())) {
                            tracing::info!(database = handle.name(), "Database change detected, reloading...");
                            let _ = handle.reload();
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for handle in &self.handles {
            let dir = watch_dir(handle.path());
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            tracing::info!(database = handle.name(), dir = %dir.display(), "Database watcher started");
        }

        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn same_file_name(event_path: &Path, db_path: &Path) -> bool {
    event_path.file_name().is_some() && event_path.file_name() == db_path.file_name()
}
