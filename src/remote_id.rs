use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Identifier of a document inside the remote index, derived from the local
/// document id and name.
///
/// The local id is part of the string, so two live documents never share a
/// remote id even if their names hash alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(document_id: u64, name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        document_id.hash(&mut hasher);
        name.hash(&mut hasher);
        let digest = format!("{:016x}", hasher.finish());
        Self(format!("{document_id}-{}", &digest[..10]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(RemoteId::new(1, "a.txt"), RemoteId::new(1, "a.txt"));
    }

    #[test]
    fn differs_by_id_and_name() {
        assert_ne!(RemoteId::new(1, "a.txt"), RemoteId::new(2, "a.txt"));
        assert_ne!(RemoteId::new(1, "a.txt"), RemoteId::new(1, "b.txt"));
    }

    #[test]
    fn starts_with_local_id() {
        let id = RemoteId::new(42, "a.txt");
        assert!(id.as_str().starts_with("42-"));
        assert_eq!(id.as_str().len(), "42-".len() + 10);
        assert_eq!(id.to_string(), id.clone().into_string());
    }
}
