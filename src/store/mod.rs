use std::path::PathBuf;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

mod collections;
pub use collections::Collection;

/// How a collection read was satisfied.
///
/// Reads never fail the caller: a missing file yields the collection's
/// documented default, and an unreadable or unparseable file is logged and
/// replaced by the default as well. The variants exist so callers and tests
/// can tell those paths apart.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    /// Deserialized from persisted content.
    Loaded(T),
    /// File absent; documented default substituted.
    Missing(T),
    /// Read or parse failure, logged and suppressed; default substituted.
    Salvaged(T),
}

impl<T> ReadOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            ReadOutcome::Loaded(v) | ReadOutcome::Missing(v) | ReadOutcome::Salvaged(v) => v,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ReadOutcome::Loaded(_))
    }
}

/// Durable, file-backed JSON collections with serialized read-modify-write.
///
/// Every collection is a single pretty-printed JSON document under the data
/// directory, guarded by its own async mutex. Plain `read`/`write`/`append`
/// take the lock internally; callers that must hold it across a full
/// read-mutate-write cycle use [`FileStore::lock`].
pub struct FileStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; Collection::ALL.len()],
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    /// Create the data directory and seed every missing collection with its
    /// default document. Idempotent; existing files are never touched.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("create data dir {}", self.data_dir.display()))?;

        for collection in Collection::ALL {
            let path = self.path(collection);
            match fs::try_exists(&path).await {
                Ok(true) => continue,
                Ok(false) => {}
                // Unanswerable stat: the file may exist, never overwrite.
                Err(e) => {
                    warn!(%collection, error = %e, "existence check failed, leaving collection untouched");
                    continue;
                }
            }
            let body = serde_json::to_vec_pretty(&collection.default_value())
                .context("serialize collection default")?;
            fs::write(&path, body)
                .await
                .with_context(|| format!("seed {}", collection))?;
            debug!(%collection, "seeded collection with default");
        }
        Ok(())
    }

    /// Take the collection's lock for a read-modify-write cycle.
    pub async fn lock(&self, collection: Collection) -> CollectionGuard<'_> {
        let held = self.locks[collection.index()].lock().await;
        CollectionGuard {
            store: self,
            collection,
            _held: held,
        }
    }

    pub async fn read<T>(&self, collection: Collection) -> ReadOutcome<T>
    where
        T: DeserializeOwned + Default,
    {
        self.lock(collection).await.read().await
    }

    /// Persist `value` as the collection's full content. Failure is logged
    /// and reported as `false`, never raised.
    pub async fn write<T: Serialize>(&self, collection: Collection, value: &T) -> bool {
        self.lock(collection).await.write(value).await
    }

    /// Append a timestamp-stamped copy of `entry` to a sequence collection.
    ///
    /// Reports success but does nothing if the collection holds a mapping
    /// rather than a sequence.
    pub async fn append<E: Serialize>(&self, collection: Collection, entry: &E) -> bool {
        let guard = self.lock(collection).await;
        match guard.read_value().await.into_inner() {
            Value::Array(mut items) => {
                items.push(stamped(entry));
                guard.write(&Value::Array(items)).await
            }
            _ => {
                warn!(%collection, "append skipped: collection is not a sequence");
                true
            }
        }
    }

    async fn read_value_raw(&self, collection: Collection) -> ReadOutcome<Value> {
        let path = self.path(collection);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ReadOutcome::Missing(collection.default_value());
            }
            Err(e) => {
                warn!(%collection, error = %e, "read failed, substituting default");
                return ReadOutcome::Salvaged(collection.default_value());
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => ReadOutcome::Loaded(v),
            Err(e) => {
                warn!(%collection, error = %e, "parse failed, substituting default");
                ReadOutcome::Salvaged(collection.default_value())
            }
        }
    }

    async fn write_value_raw<T: Serialize>(&self, collection: Collection, value: &T) -> bool {
        let body = match serde_json::to_vec_pretty(value) {
            Ok(b) => b,
            Err(e) => {
                error!(%collection, error = %e, "serialize failed");
                return false;
            }
        };
        match fs::write(self.path(collection), body).await {
            Ok(()) => true,
            Err(e) => {
                error!(%collection, error = %e, "write failed");
                false
            }
        }
    }
}

/// Exclusive access to one collection; read/write here do not re-lock.
pub struct CollectionGuard<'a> {
    store: &'a FileStore,
    collection: Collection,
    _held: MutexGuard<'a, ()>,
}

impl CollectionGuard<'_> {
    pub async fn read_value(&self) -> ReadOutcome<Value> {
        self.store.read_value_raw(self.collection).await
    }

    pub async fn read<T>(&self) -> ReadOutcome<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.read_value().await {
            ReadOutcome::Loaded(v) => match serde_json::from_value(v) {
                Ok(t) => ReadOutcome::Loaded(t),
                Err(e) => {
                    warn!(collection = %self.collection, error = %e,
                        "deserialize failed, substituting default");
                    ReadOutcome::Salvaged(T::default())
                }
            },
            ReadOutcome::Missing(_) => ReadOutcome::Missing(T::default()),
            ReadOutcome::Salvaged(_) => ReadOutcome::Salvaged(T::default()),
        }
    }

    pub async fn write<T: Serialize>(&self, value: &T) -> bool {
        self.store.write_value_raw(self.collection, value).await
    }
}

fn stamped<E: Serialize>(entry: &E) -> Value {
    let mut value = serde_json::to_value(entry).unwrap_or(Value::Null);
    if let Value::Object(ref mut fields) = value {
        if !fields.contains_key("timestamp") {
            if let Ok(now) = OffsetDateTime::now_utc().format(&Rfc3339) {
                fields.insert("timestamp".into(), Value::String(now));
            }
        }
    }
    value
}
