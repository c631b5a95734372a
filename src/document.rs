use serde::{Deserialize, Serialize};

/// A document as held by the record store.
///
/// `id` is assigned once by [`DocumentStore`](crate::DocumentStore) and never
/// handed out again by the same store. `remote_id` is set once the document
/// has been mirrored to the remote index; `vector` is the dense embedding and
/// is only populated on values returned from the engine, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip)]
    pub vector: Option<Vec<f32>>,
}

impl Document {
    pub fn new(id: u64, name: &str, text: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            text: text.to_string(),
            remote_id: None,
            vector: None,
        }
    }

    /// Whether the document only exists locally.
    pub fn is_local_only(&self) -> bool {
        self.remote_id.as_deref().is_none_or(str::is_empty)
    }
}

/// A document that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub text: String,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}
