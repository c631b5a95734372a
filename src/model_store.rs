use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Serialized model state keyed by model name ("nlp", "tfidf", ...).
const MODEL_STATE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("model_state");

/// Persisted tokenizer, vectorizer and embedder state.
pub struct ModelStore {
    db: Database,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore").finish_non_exhaustive()
    }
}

impl ModelStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(MODEL_STATE)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Load the state stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored and
    /// [`Error::ModelState`] if the stored bytes no longer decode.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(MODEL_STATE)?;
        let Some(guard) = table.get(key)? else {
            return Ok(None);
        };
        serde_json::from_slice(guard.value()).map(Some).map_err(|e| {
            Error::ModelState {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
    }

    pub fn store<T: Serialize>(&self, key: &str, state: &T) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(MODEL_STATE)?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Store raw bytes under `key`, bypassing serialization.
    pub fn store_raw(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(MODEL_STATE)?;
            table.insert(key, bytes)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(MODEL_STATE)?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }
}
