//! File-backed store holding all keys in one JSON document.

use crate::store::KeyValueStore;
use async_trait::async_trait;
use common::{StorageError, StorageResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Key-value store backed by a single JSON object on disk.
///
/// The whole document is rewritten on every `set`, which is acceptable
/// for the coordinator's small key set (a counter, two flags, and the
/// whitelist map). The in-memory copy is authoritative between writes;
/// the mutex serializes writers so concurrent `set` calls cannot
/// interleave partial documents.
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading the existing document if the
    /// file is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is
    /// not a JSON object.
    pub async fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                other => {
                    return Err(StorageError::unavailable(format!(
                        "store file {} holds {} instead of an object",
                        path.display(),
                        json_type_name(&other)
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = document.len(), "Opened JSON store");

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    async fn flush(&self, document: &Map<String, Value>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(&Value::Object(document.clone()))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let document = self.document.lock().await;
        Ok(document.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut document = self.document.lock().await;
        document.insert(key.to_string(), value);
        self.flush(&document).await
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
