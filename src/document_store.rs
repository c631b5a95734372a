use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    document::Document,
    error::{Error, Result},
    text_util::contains_ignore_ascii_case,
};

/// Document rows by id, serialized as JSON.
const DOCUMENTS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("documents");
/// Unique document name to id.
const NAMES: TableDefinition<&str, u64> = TableDefinition::new("names");
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const NEXT_DOCUMENT_ID: &str = "next_document_id";

/// Result of [`DocumentStore::insert_or_get`].
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    pub document: Document,
    /// False when an identical document was already stored.
    pub created: bool,
}

/// The record store: document rows keyed by a store-assigned id.
///
/// Ids start at 1 and come from a persisted counter, so an id freed by
/// [`delete_by_id`](Self::delete_by_id) is never handed out again.
pub struct DocumentStore {
    db: Database,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

fn decode(bytes: &[u8]) -> Result<Document> {
    Ok(serde_json::from_slice(bytes)?)
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(DOCUMENTS)?;
        txn.open_table(NAMES)?;
        txn.open_table(COUNTERS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a document unless one with the same name exists.
    ///
    /// Re-inserting the same name and text returns the stored row. The same
    /// name with different text is rejected.
    pub fn insert_or_get(&self, name: &str, text: &str) -> Result<Insertion> {
        let txn = self.db.begin_write()?;
        let insertion = {
            let mut names = txn.open_table(NAMES)?;
            let mut documents = txn.open_table(DOCUMENTS)?;

            let existing = names.get(name)?.map(|g| g.value());
            if let Some(id) = existing {
                let bytes = documents
                    .get(id)?
                    .map(|g| g.value().to_vec())
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "name '{name}' points at missing document {id}"
                        ))
                    })?;
                let document = decode(&bytes)?;
                if document.text != text {
                    return Err(Error::Validation(format!(
                        "a different document named '{name}' already exists"
                    )));
                }
                Insertion {
                    document,
                    created: false,
                }
            } else {
                let mut counters = txn.open_table(COUNTERS)?;
                let id = counters
                    .get(NEXT_DOCUMENT_ID)?
                    .map(|g| g.value())
                    .unwrap_or(1);
                counters.insert(NEXT_DOCUMENT_ID, id + 1)?;

                let document = Document::new(id, name, text);
                let bytes = serde_json::to_vec(&document)?;
                documents.insert(id, bytes.as_slice())?;
                names.insert(name, id)?;
                Insertion {
                    document,
                    created: true,
                }
            }
        };
        txn.commit()?;
        Ok(insertion)
    }

    pub fn get(&self, id: u64) -> Result<Option<Document>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Every document, by ascending id.
    pub fn get_all(&self) -> Result<Vec<Document>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_, v) = entry?;
            result.push(decode(v.value())?);
        }
        Ok(result)
    }

    /// The documents with the given ids, in the order asked for. Unknown ids
    /// are skipped.
    pub fn get_by_ids(&self, ids: &[u64]) -> Result<Vec<Document>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(guard) = table.get(*id)? {
                result.push(decode(guard.value())?);
            }
        }
        Ok(result)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Document>> {
        let txn = self.db.begin_read()?;
        let names = txn.open_table(NAMES)?;
        let Some(id) = names.get(name)?.map(|g| g.value()) else {
            return Ok(None);
        };
        let documents = txn.open_table(DOCUMENTS)?;
        match documents.get(id)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a document row. Returns false if there was no such row.
    pub fn delete_by_id(&self, id: u64) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut documents = txn.open_table(DOCUMENTS)?;
            let bytes = documents.remove(id)?.map(|g| g.value().to_vec());
            match bytes {
                Some(bytes) => {
                    let document = decode(&bytes)?;
                    let mut names = txn.open_table(NAMES)?;
                    names.remove(document.name.as_str())?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Record the remote index id of a document. Returns false if the
    /// document does not exist.
    pub fn set_remote_id(
        &self,
        id: u64,
        remote_id: Option<&str>,
    ) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut documents = txn.open_table(DOCUMENTS)?;
            let bytes = documents.get(id)?.map(|g| g.value().to_vec());
            match bytes {
                Some(bytes) => {
                    let mut document = decode(&bytes)?;
                    document.remote_id = remote_id
                        .filter(|r| !r.is_empty())
                        .map(str::to_string);
                    let bytes = serde_json::to_vec(&document)?;
                    documents.insert(id, bytes.as_slice())?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(updated)
    }

    /// The remote index id of a document, if it has one.
    pub fn get_remote_id(&self, id: u64) -> Result<Option<String>> {
        Ok(self
            .get(id)?
            .and_then(|d| d.remote_id)
            .filter(|r| !r.is_empty()))
    }

    pub fn count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        Ok(table.first()?.is_none())
    }

    /// Documents whose text contains `needle`, ignoring ASCII case, by
    /// ascending id. An empty needle matches nothing.
    pub fn search_text(&self, needle: &str) -> Result<Vec<Document>> {
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|d| contains_ignore_ascii_case(&d.text, needle))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, DocumentStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            DocumentStore::open(&tmp.path().join("documents.redb")).unwrap();
        (tmp, store)
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let (_tmp, store) = test_store();
        let a = store.insert_or_get("a.txt", "the cat sat").unwrap();
        let b = store.insert_or_get("b.txt", "the dog ran").unwrap();

        assert!(a.created && b.created);
        assert_eq!(a.document.id, 1);
        assert_eq!(b.document.id, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn insert_is_idempotent() {
        let (_tmp, store) = test_store();
        let first = store.insert_or_get("a.txt", "the cat sat").unwrap();
        let second = store.insert_or_get("a.txt", "the cat sat").unwrap();

        assert!(!second.created);
        assert_eq!(first.document.id, second.document.id);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn same_name_different_text_is_rejected() {
        let (_tmp, store) = test_store();
        store.insert_or_get("a.txt", "the cat sat").unwrap();
        let err = store.insert_or_get("a.txt", "something else").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let (_tmp, store) = test_store();
        let a = store.insert_or_get("a.txt", "one").unwrap().document;
        assert!(store.delete_by_id(a.id).unwrap());

        let again = store.insert_or_get("a.txt", "one").unwrap();
        assert!(again.created);
        assert_ne!(again.document.id, a.id);
    }

    #[test]
    fn delete_missing_returns_false() {
        let (_tmp, store) = test_store();
        assert!(!store.delete_by_id(42).unwrap());
    }

    #[test]
    fn delete_frees_the_name() {
        let (_tmp, store) = test_store();
        let a = store.insert_or_get("a.txt", "one").unwrap().document;
        store.delete_by_id(a.id).unwrap();
        assert!(store.find_by_name("a.txt").unwrap().is_none());
        assert!(store.insert_or_get("a.txt", "two").is_ok());
    }

    #[test]
    fn remote_id_roundtrip() {
        let (_tmp, store) = test_store();
        let a = store.insert_or_get("a.txt", "one").unwrap().document;
        assert_eq!(store.get_remote_id(a.id).unwrap(), None);

        assert!(store.set_remote_id(a.id, Some("r-1")).unwrap());
        assert_eq!(store.get_remote_id(a.id).unwrap().as_deref(), Some("r-1"));
        assert!(!store.get(a.id).unwrap().unwrap().is_local_only());

        store.set_remote_id(a.id, None).unwrap();
        assert_eq!(store.get_remote_id(a.id).unwrap(), None);
        assert!(!store.set_remote_id(99, Some("r-2")).unwrap());
    }

    #[test]
    fn get_by_ids_keeps_requested_order() {
        let (_tmp, store) = test_store();
        store.insert_or_get("a.txt", "one").unwrap();
        store.insert_or_get("b.txt", "two").unwrap();
        store.insert_or_get("c.txt", "three").unwrap();

        let docs = store.get_by_ids(&[3, 99, 1]).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c.txt", "a.txt"]);
    }

    #[test]
    fn search_text_is_substring_and_case_insensitive() {
        let (_tmp, store) = test_store();
        store.insert_or_get("a.txt", "The Cat sat").unwrap();
        store.insert_or_get("b.txt", "the dog ran").unwrap();

        let hits = store.search_text("cat").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a.txt");

        assert_eq!(store.search_text("THE").unwrap().len(), 2);
        assert!(store.search_text("").unwrap().is_empty());
        assert!(store.search_text("bird").unwrap().is_empty());
    }

    #[test]
    fn is_empty_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("documents.redb");
        {
            let store = DocumentStore::open(&path).unwrap();
            assert!(store.is_empty().unwrap());
            store.insert_or_get("a.txt", "one").unwrap();
        }
        let store = DocumentStore::open(&path).unwrap();
        assert!(!store.is_empty().unwrap());
        let b = store.insert_or_get("b.txt", "two").unwrap();
        assert_eq!(b.document.id, 2);
    }
}
