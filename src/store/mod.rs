//! Persistent record of every cluster's desired and observed state.
//!
//! Records live in a single redb database file keyed by cluster name, with
//! JSON-encoded values. The store holds the file lock for as long as it is
//! open, so only one process can write at a time.

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::files::{self, FileError};
use crate::plan::Plan;

const CLUSTERS_TABLE: TableDefinition<'static, &str, &[u8]> = TableDefinition::new("clusters");

/// Errors raised by the cluster state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Raised when the store directory cannot be created.
    #[error("could not prepare state store location {path}: {message}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the database file cannot be opened or created.
    #[error("could not open state store {path}: {source}")]
    Open {
        /// Database file.
        path: Utf8PathBuf,
        /// redb error.
        #[source]
        source: Box<redb::DatabaseError>,
    },
    /// Raised when a transaction cannot be started.
    #[error("state store transaction error: {0}")]
    Transaction(#[source] Box<redb::TransactionError>),
    /// Raised when the clusters table cannot be opened.
    #[error("state store table error: {0}")]
    Table(#[source] Box<redb::TableError>),
    /// Raised when reading or writing a record fails.
    #[error("state store storage error: {0}")]
    Storage(#[source] Box<redb::StorageError>),
    /// Raised when a write transaction cannot be committed.
    #[error("state store commit error: {0}")]
    Commit(#[source] Box<redb::CommitError>),
    /// Raised when a record cannot be encoded.
    #[error("could not encode state of cluster {name}: {message}")]
    Encode {
        /// Cluster name.
        name: String,
        /// Encoder error message.
        message: String,
    },
    /// Raised when a stored record cannot be decoded.
    #[error("could not decode state of cluster {name}: {message}")]
    Decode {
        /// Cluster name.
        name: String,
        /// Decoder error message.
        message: String,
    },
}

impl From<FileError> for StoreError {
    fn from(err: FileError) -> Self {
        Self::Io {
            path: err.path,
            message: err.message,
        }
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(err))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Table(Box::new(err))
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        Self::Commit(Box::new(err))
    }
}

/// Lifecycle state of a cluster.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterState {
    /// A plan exists and a provider will create the machines.
    Planned,
    /// A plan exists and the machines are managed by hand.
    Unmanaged,
    /// Infrastructure was created successfully.
    Provisioned,
    /// The last provisioning attempt failed.
    ProvisionFailed,
}

impl ClusterState {
    /// Human-readable state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Unmanaged => "unmanaged",
            Self::Provisioned => "provisioned",
            Self::ProvisionFailed => "provisionFailed",
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a cluster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterSpec {
    /// State the cluster should reach.
    pub desired_state: ClusterState,
    /// Plan the cluster is built from.
    pub plan: Plan,
}

/// Observed state of a cluster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterStatus {
    /// State the cluster is in.
    pub current_state: ClusterState,
}

/// Stored record for one cluster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterRecord {
    /// Desired state.
    pub spec: ClusterSpec,
    /// Observed state.
    pub status: ClusterStatus,
}

impl ClusterRecord {
    /// Record whose desired and current state are both `state`.
    #[must_use]
    pub const fn new(plan: Plan, state: ClusterState) -> Self {
        Self {
            spec: ClusterSpec {
                desired_state: state,
                plan,
            },
            status: ClusterStatus {
                current_state: state,
            },
        }
    }

    /// Returns the record with its current state replaced.
    #[must_use]
    pub const fn with_current_state(mut self, state: ClusterState) -> Self {
        self.status.current_state = state;
        self
    }
}

/// File-backed map from cluster name to [`ClusterRecord`].
pub struct ClusterStateStore {
    db: Database,
    path: Utf8PathBuf,
}

impl fmt::Debug for ClusterStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterStateStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ClusterStateStore {
    /// Opens the store at `path`, creating the file and its parent directory
    /// when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened, including
    /// when another handle holds it.
    pub fn open(path: &Utf8Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            files::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(|err| StoreError::Open {
            path: path.to_path_buf(),
            source: Box::new(err),
        })?;
        let txn = db.begin_write()?;
        {
            let _table = txn.open_table(CLUSTERS_TABLE)?;
        }
        txn.commit()?;
        debug!(%path, "opened cluster state store");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Fetches the record for `name`.
    ///
    /// # Errors
    ///
    /// Returns a redb error or [`StoreError::Decode`].
    pub fn get(&self, name: &str) -> Result<Option<ClusterRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CLUSTERS_TABLE)?;
        let Some(raw) = table.get(name)? else {
            return Ok(None);
        };
        decode(name, raw.value()).map(Some)
    }

    /// Stores `record` under `name`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] or a redb error.
    pub fn put(&self, name: &str, record: &ClusterRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|err| StoreError::Encode {
            name: name.to_owned(),
            message: err.to_string(),
        })?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CLUSTERS_TABLE)?;
            table.insert(name, bytes.as_slice())?;
        }
        txn.commit()?;
        debug!(
            cluster = name,
            desired = %record.spec.desired_state,
            current = %record.status.current_state,
            "stored cluster state"
        );
        Ok(())
    }

    /// Removes the record for `name`. Removing a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns a redb error.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CLUSTERS_TABLE)?;
            table.remove(name)?;
        }
        txn.commit()?;
        debug!(cluster = name, "deleted cluster state");
        Ok(())
    }

    /// Returns every record, keyed and ordered by cluster name.
    ///
    /// # Errors
    ///
    /// Returns a redb error or [`StoreError::Decode`].
    pub fn get_all(&self) -> Result<BTreeMap<String, ClusterRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CLUSTERS_TABLE)?;
        let mut records = BTreeMap::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let name = key.value();
            records.insert(name.to_owned(), decode(name, value.value())?);
        }
        Ok(records)
    }

    /// Closes the store and releases the file lock.
    pub fn close(self) {
        debug!(path = %self.path, "closing cluster state store");
        drop(self.db);
    }
}

fn decode(name: &str, bytes: &[u8]) -> Result<ClusterRecord, StoreError> {
    serde_json::from_slice(bytes).map_err(|err| StoreError::Decode {
        name: name.to_owned(),
        message: err.to_string(),
    })
}
