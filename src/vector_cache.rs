use std::collections::HashMap;

/// Dense vectors of the stored documents, keyed by document id.
///
/// Entries are only valid for the embedder that produced them; the engine
/// replaces the whole cache when the embedder is retrained.
#[derive(Debug, Clone, Default)]
pub struct VectorCache {
    vectors: HashMap<u64, Vec<f32>>,
}

impl VectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.vectors.get(&id).map(Vec::as_slice)
    }

    /// Insert or overwrite the vector of `id`.
    pub fn put(&mut self, id: u64, vector: Vec<f32>) {
        self.vectors.insert(id, vector);
    }

    pub fn remove(&mut self, id: u64) -> Option<Vec<f32>> {
        self.vectors.remove(&id)
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    pub fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl FromIterator<(u64, Vec<f32>)> for VectorCache {
    fn from_iter<I: IntoIterator<Item = (u64, Vec<f32>)>>(iter: I) -> Self {
        Self {
            vectors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let mut cache = VectorCache::new();
        cache.put(1, vec![1.0, 0.0]);
        assert_eq!(cache.get(1), Some(&[1.0, 0.0][..]));
        assert!(cache.contains(1));

        cache.put(1, vec![0.0, 1.0]);
        assert_eq!(cache.get(1), Some(&[0.0, 1.0][..]));
        assert_eq!(cache.len(), 1);

        assert!(cache.remove(1).is_some());
        assert!(cache.get(1).is_none());
        assert!(cache.remove(1).is_none());
    }

    #[test]
    fn clear_and_collect() {
        let mut cache: VectorCache =
            [(1, vec![1.0]), (2, vec![2.0])].into_iter().collect();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
