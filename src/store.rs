//! JSON-file store for news records.
//!
//! The whole collection is read once per run and replaced atomically on save:
//! the new content goes to a sibling temp file which is then renamed over the
//! target, so a concurrent reader sees either the old or the new array, never a
//! prefix. Single writer per file is assumed; serializing runs is up to the caller.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::record::Record;

/// What `load` does when the file exists but is not a JSON array of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Fail with `StoreError::CorruptState`.
    #[default]
    Strict,
    /// Log a warning and start from an empty collection.
    TreatAsEmpty,
}

#[derive(Debug, Clone)]
pub struct NewsStore {
    path: PathBuf,
    policy: LoadPolicy,
}

impl NewsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: LoadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Missing file → empty. Individual elements that do not decode as a valid
    /// `Record` are dropped with a warning; a document that is not a JSON array
    /// is corrupt and handled per `LoadPolicy`.
    pub fn load(&self) -> Result<Vec<Record>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "store", path = %self.path.display(), "no store file yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let items: Vec<Value> = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(source) => match self.policy {
                LoadPolicy::Strict => {
                    return Err(StoreError::CorruptState {
                        path: self.path.clone(),
                        source,
                    })
                }
                LoadPolicy::TreatAsEmpty => {
                    warn!(
                        target: "store",
                        path = %self.path.display(),
                        error = %source,
                        "store file is corrupt; starting from an empty collection"
                    );
                    return Ok(Vec::new());
                }
            },
        };

        let total = items.len();
        let mut records = Vec::with_capacity(total);
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Record>(item) {
                Ok(r) => match r.validate() {
                    Ok(()) => records.push(r),
                    Err(e) => {
                        warn!(target: "store", index = idx, id = %r.id, error = %e, "dropping invalid stored record")
                    }
                },
                Err(e) => {
                    warn!(target: "store", index = idx, error = %e, "dropping undecodable stored record")
                }
            }
        }

        debug!(
            target: "store",
            path = %self.path.display(),
            loaded = records.len(),
            dropped = total - records.len(),
            "store loaded"
        );
        Ok(records)
    }

    /// Atomically replace the store file with `records`, in the given order.
    pub fn save(&self, records: &[Record]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(records).map_err(|e| self.persistence(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = write_synced(&tmp, &payload).and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(self.persistence(e));
        }

        metrics::gauge!("store_records_total").set(records.len() as f64);
        debug!(target: "store", path = %self.path.display(), records = records.len(), "store saved");
        Ok(())
    }

    /// Sibling of the target so the rename never crosses filesystems.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.json".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }

    fn persistence(&self, e: impl ToString) -> StoreError {
        StoreError::Persistence {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}
