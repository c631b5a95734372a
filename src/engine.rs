//! The ranking engine.
//!
//! [`SearchEngine`] owns the record store, the trained models, the vector
//! cache and the optional remote index, and keeps them consistent across
//! adds and removes. Writers are serialized by one mutex. Models and cache
//! sit behind read/write locks; a bulk rebuild computes the new cache first
//! and swaps it in under both write guards, so a search sees either the old
//! state or the new one.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{EngineConfig, RemoteConfig, UploadPolicy},
    corpus::CorpusSource,
    data_dir::DataDir,
    document::Document,
    document_store::{DocumentStore, Insertion},
    embedding::{EmbeddingProvider, cosine_similarity},
    error::{Error, Result},
    model_store::ModelStore,
    models::{ModelOutcomes, ModelSource, TFIDF_KEY, TextModels},
    pipeline::Pipeline,
    ranking::{RankedDocument, SearchMode, rank},
    remote::{self, RemoteHit, RemoteIndex},
    vector_cache::VectorCache,
};

/// Which path startup took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupState {
    /// The store was empty and the default corpus was loaded.
    EmptyCorpus,
    /// The store already held documents.
    ExistingCorpus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    pub state: StartupState,
    pub models: ModelOutcomes,
    /// Documents in the store once startup finished.
    pub documents: usize,
    /// Documents mirrored to the remote index during startup.
    pub mirrored: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub documents: usize,
    pub cached_vectors: usize,
    pub mirrored: usize,
    pub local_only: usize,
    pub remote_backend: Option<&'static str>,
    pub upload_policy: UploadPolicy,
    pub dimension: usize,
    pub startup: StartupReport,
}

pub struct SearchEngine {
    config: EngineConfig,
    store: DocumentStore,
    model_store: ModelStore,
    models: RwLock<TextModels>,
    cache: RwLock<VectorCache>,
    remote: Option<Arc<dyn RemoteIndex>>,
    writer: Mutex<()>,
    startup: StartupReport,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("startup", &self.startup)
            .field("remote", &self.remote.as_ref().map(|r| r.name()))
            .finish_non_exhaustive()
    }
}

/// Run a remote call, logging and swallowing any failure.
fn remote_call<T>(
    remote: Option<&dyn RemoteIndex>,
    action: &'static str,
    f: impl FnOnce(&dyn RemoteIndex) -> Result<T>,
) -> Option<T> {
    let remote = remote?;
    match f(remote) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                backend = remote.name(),
                action,
                error = %e,
                "remote index call failed"
            );
            None
        }
    }
}

/// Mirror `document` and record its remote id. Returns whether it is now
/// mirrored.
fn mirror(
    store: &DocumentStore,
    remote: Option<&dyn RemoteIndex>,
    document: &mut Document,
) -> Result<bool> {
    let Some(remote_id) =
        remote_call(remote, "index document", |r| r.index_document(document))
            .flatten()
    else {
        return Ok(false);
    };
    store.set_remote_id(document.id, Some(&remote_id))?;
    debug!(id = document.id, %remote_id, "mirrored document");
    document.remote_id = Some(remote_id);
    Ok(true)
}

/// Send the cached vector of every mirrored document to the remote index.
fn push_vectors(
    remote: Option<&dyn RemoteIndex>,
    cache: &VectorCache,
    documents: &[Document],
) {
    if remote.is_none() {
        return;
    }
    for document in documents.iter().filter(|d| !d.is_local_only()) {
        let mut with_vector = document.clone();
        with_vector.vector = cache.get(document.id).map(<[f32]>::to_vec);
        remote_call(remote, "update document", |r| {
            r.update_document(&with_vector)
        });
    }
}

fn build_cache(models: &TextModels, documents: &[Document]) -> VectorCache {
    documents
        .par_iter()
        .map(|d| (d.id, models.embed(&d.text)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

impl SearchEngine {
    /// Open the engine over the stores in `data_dir`, connecting the remote
    /// index described by `remote_config`.
    pub fn open_data_dir(
        data_dir: &DataDir,
        config: EngineConfig,
        remote_config: &RemoteConfig,
        corpus: &dyn CorpusSource,
    ) -> Result<Self> {
        let store = DocumentStore::open(&data_dir.documents_db())?;
        let model_store = ModelStore::open(&data_dir.models_db())?;
        let remote =
            remote::connect(remote_config, Some(data_dir), config.dimension);
        Self::open(config, store, model_store, remote, corpus)
    }

    /// Bring the engine up.
    ///
    /// An empty store is filled from `corpus`, mirrored to the remote index
    /// and used to train every model from scratch. A non-empty store loads
    /// persisted model state, training only what cannot be loaded. Either
    /// way the vector cache is built for every stored document.
    ///
    /// Fails with [`Error::EmptyCorpus`] if the store is empty and `corpus`
    /// yields no usable document.
    pub fn open(
        config: EngineConfig,
        store: DocumentStore,
        model_store: ModelStore,
        remote: Option<Arc<dyn RemoteIndex>>,
        corpus: &dyn CorpusSource,
    ) -> Result<Self> {
        config.validate()?;

        let (models, cache, startup) = if store.is_empty()? {
            Self::bootstrap_empty(
                &config,
                &store,
                &model_store,
                remote.as_deref(),
                corpus,
            )?
        } else {
            Self::bootstrap_existing(
                &config,
                &store,
                &model_store,
                remote.as_deref(),
            )?
        };

        info!(
            state = ?startup.state,
            documents = startup.documents,
            cached = cache.len(),
            "engine ready"
        );

        Ok(Self {
            config,
            store,
            model_store,
            models: RwLock::new(models),
            cache: RwLock::new(cache),
            remote,
            writer: Mutex::new(()),
            startup,
        })
    }

    fn bootstrap_empty(
        config: &EngineConfig,
        store: &DocumentStore,
        model_store: &ModelStore,
        remote: Option<&dyn RemoteIndex>,
        corpus: &dyn CorpusSource,
    ) -> Result<(TextModels, VectorCache, StartupReport)> {
        let incoming = corpus.load()?;
        info!(
            source = %corpus.describe(),
            count = incoming.len(),
            "loading default corpus"
        );

        remote_call(remote, "reset", |r| r.reset());

        let mut documents = Vec::with_capacity(incoming.len());
        let mut seen = HashSet::new();
        for new in incoming {
            if new.text.trim().is_empty() || new.name.trim().is_empty() {
                warn!(name = %new.name, "skipping empty document");
                continue;
            }
            match store.insert_or_get(&new.name, &new.text) {
                Ok(Insertion { document, .. }) => {
                    if seen.insert(document.id) {
                        documents.push(document);
                    }
                }
                Err(Error::Validation(reason)) => {
                    warn!(name = %new.name, %reason, "skipping document");
                }
                Err(e) => return Err(e),
            }
        }

        if documents.is_empty() {
            return Err(Error::EmptyCorpus(corpus.describe()));
        }

        let mut mirrored = 0;
        for document in &mut documents {
            if mirror(store, remote, document)? {
                mirrored += 1;
            }
        }

        let texts: Vec<&str> =
            documents.iter().map(|d| d.text.as_str()).collect();
        let models =
            TextModels::train_and_store(
                model_store,
                config,
                Pipeline::default(),
                &texts,
            )?;
        let cache = build_cache(&models, &documents);
        push_vectors(remote, &cache, &documents);

        let startup = StartupReport {
            state: StartupState::EmptyCorpus,
            models: ModelOutcomes::all(ModelSource::TrainedFresh),
            documents: documents.len(),
            mirrored,
        };
        Ok((models, cache, startup))
    }

    /// Reload models for a populated store. A freshly trained embedder
    /// produces vectors the remote index has never seen, so they are pushed
    /// again for every mirrored document.
    fn bootstrap_existing(
        config: &EngineConfig,
        store: &DocumentStore,
        model_store: &ModelStore,
        remote: Option<&dyn RemoteIndex>,
    ) -> Result<(TextModels, VectorCache, StartupReport)> {
        let documents = store.get_all()?;
        let texts: Vec<&str> =
            documents.iter().map(|d| d.text.as_str()).collect();
        let (models, outcomes) =
            TextModels::load_or_train(model_store, config, &texts)?;
        let cache = build_cache(&models, &documents);

        let fresh_embedder = outcomes.embedding == ModelSource::TrainedFresh;
        if remote.is_some() && fresh_embedder {
            info!(
                documents = documents.len(),
                "embedder retrained, refreshing remote vectors"
            );
            push_vectors(remote, &cache, &documents);
        }

        let startup = StartupReport {
            state: StartupState::ExistingCorpus,
            models: outcomes,
            documents: documents.len(),
            mirrored: 0,
        };
        Ok((models, cache, startup))
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(|_| Error::LockPoisoned("writer"))
    }

    fn read_models(&self) -> Result<RwLockReadGuard<'_, TextModels>> {
        self.models.read().map_err(|_| Error::LockPoisoned("models"))
    }

    fn write_models(&self) -> Result<RwLockWriteGuard<'_, TextModels>> {
        self.models.write().map_err(|_| Error::LockPoisoned("models"))
    }

    fn read_cache(&self) -> Result<RwLockReadGuard<'_, VectorCache>> {
        self.cache.read().map_err(|_| Error::LockPoisoned("vector cache"))
    }

    fn write_cache(&self) -> Result<RwLockWriteGuard<'_, VectorCache>> {
        self.cache.write().map_err(|_| Error::LockPoisoned("vector cache"))
    }

    fn remote(&self) -> Option<&dyn RemoteIndex> {
        self.remote.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn startup(&self) -> &StartupReport {
        &self.startup
    }

    // -- Lifecycle --

    /// Add a document, or return the stored one if the same name and text
    /// were added before.
    ///
    /// The returned document carries its dense vector.
    pub fn add_document(&self, name: &str, text: &str) -> Result<Document> {
        if name.trim().is_empty() {
            return Err(Error::Validation("document name is empty".into()));
        }
        if text.trim().is_empty() {
            return Err(Error::Validation(format!(
                "document '{name}' has no text"
            )));
        }

        let _writer = self.lock_writer()?;
        let Insertion {
            mut document,
            created,
        } = self.store.insert_or_get(name, text)?;

        if document.is_local_only() {
            mirror(&self.store, self.remote(), &mut document)?;
        }

        let retrained =
            created && self.config.upload_policy == UploadPolicy::Retrain;
        if retrained {
            self.retrain_locked()?;
        } else if created {
            let mut models = self.write_models()?;
            models.observe(&document.text);
            self.model_store.store(TFIDF_KEY, models.tfidf())?;
        }

        let vector = if retrained {
            self.read_cache()?.get(document.id).map(<[f32]>::to_vec)
        } else {
            None
        };
        let vector = match vector {
            Some(vector) => vector,
            None => {
                let vector = self.read_models()?.embed(&document.text);
                self.write_cache()?.put(document.id, vector.clone());
                vector
            }
        };
        document.vector = Some(vector);

        if !retrained && !document.is_local_only() {
            remote_call(self.remote(), "update document", |r| {
                r.update_document(&document)
            });
        }

        info!(
            id = document.id,
            name = %document.name,
            created,
            "added document"
        );
        Ok(document)
    }

    /// Remove a document from every store. Returns false if no document has
    /// this id.
    ///
    /// A failed remote delete is logged and does not undo the local removal.
    pub fn remove_document(&self, id: u64) -> Result<bool> {
        let _writer = self.lock_writer()?;

        let remote_id = self.store.get_remote_id(id)?;
        let removed = self.store.delete_by_id(id)?;
        self.write_cache()?.remove(id);
        if !removed {
            return Ok(false);
        }

        if let Some(remote_id) = remote_id {
            remote_call(self.remote(), "delete document", |r| {
                r.delete_document(&remote_id)
            });
        }

        info!(id, "removed document");
        Ok(true)
    }

    /// Mirror every local-only document to the remote index and push its
    /// vector. Returns how many documents were mirrored.
    pub fn resync(&self) -> Result<usize> {
        let _writer = self.lock_writer()?;
        if self.remote.is_none() {
            return Ok(0);
        }

        let mut mirrored = Vec::new();
        for mut document in self.store.get_all()? {
            if !document.is_local_only() {
                continue;
            }
            if mirror(&self.store, self.remote(), &mut document)? {
                mirrored.push(document);
            }
        }

        let cache = self.read_cache()?;
        push_vectors(self.remote(), &cache, &mirrored);
        info!(count = mirrored.len(), "resynced local-only documents");
        Ok(mirrored.len())
    }

    /// Retrain every model on the current corpus and rebuild the cache.
    pub fn retrain(&self) -> Result<usize> {
        let _writer = self.lock_writer()?;
        self.retrain_locked()
    }

    fn retrain_locked(&self) -> Result<usize> {
        let documents = self.store.get_all()?;
        let texts: Vec<&str> =
            documents.iter().map(|d| d.text.as_str()).collect();
        let pipeline = self.read_models()?.analyzer().pipeline().clone();

        let models =
            TextModels::train_and_store(
                &self.model_store,
                &self.config,
                pipeline,
                &texts,
            )?;
        let cache = build_cache(&models, &documents);

        {
            let mut current_models = self.write_models()?;
            let mut current_cache = self.write_cache()?;
            *current_models = models;
            *current_cache = cache;
        }

        let cache = self.read_cache()?;
        push_vectors(self.remote(), &cache, &documents);
        info!(documents = documents.len(), "retrained models");
        Ok(documents.len())
    }

    // -- Queries --

    /// Search with the given strategy.
    ///
    /// An empty query is rejected. An absent or out-of-range `limit` falls
    /// back to the configured default.
    pub fn search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: Option<usize>,
    ) -> Result<Vec<RankedDocument>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query is empty".into()));
        }
        let limit = self.config.clamp_limit(limit);
        debug!(%mode, limit, "search");

        match mode {
            SearchMode::Lexical => self.search_lexical(query, limit),
            SearchMode::Tfidf => self.search_tfidf(query, limit),
            SearchMode::Dense => self.search_dense(query, limit),
            SearchMode::Bm25 => self.search_remote_bm25(query, limit),
            SearchMode::Knn => self.search_remote_knn(query, limit),
        }
    }

    /// Documents containing `query`, ignoring ASCII case, in id order. Every
    /// match scores 1.
    pub fn search_lexical(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        let mut results: Vec<RankedDocument> = self
            .store
            .search_text(query)?
            .into_iter()
            .map(|document| RankedDocument {
                document,
                score: 1.0,
            })
            .collect();
        crate::ranking::truncate(&mut results, limit);
        Ok(results)
    }

    /// Rank every document by cosine similarity of tf-idf vectors,
    /// recomputed per query.
    pub fn search_tfidf(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        let models = self.read_models()?;
        let query_vector = models.tfidf_vector(query);
        let documents = self.store.get_all()?;

        let results = documents
            .into_par_iter()
            .map(|document| {
                let vector = models.tfidf_vector(&document.text);
                let score = cosine_similarity(&query_vector, &vector);
                RankedDocument { document, score }
            })
            .collect();
        Ok(rank(results, limit))
    }

    /// Rank cached documents by cosine similarity of dense vectors.
    /// Documents without a cached vector are left out.
    pub fn search_dense(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        let models = self.read_models()?;
        let query_vector = models.embed(query);
        let cache = self.read_cache()?;
        let documents = self.store.get_all()?;

        let results = documents
            .into_par_iter()
            .filter_map(|document| {
                let vector = cache.get(document.id)?;
                let score = cosine_similarity(&query_vector, vector);
                Some(RankedDocument { document, score })
            })
            .collect();
        Ok(rank(results, limit))
    }

    /// BM25 phrase search in the remote index. Empty if there is no remote
    /// index or it cannot be reached.
    pub fn search_remote_bm25(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        let limit = if limit == 0 { self.config.default_limit } else { limit };
        let hits = remote_call(self.remote(), "text search", |r| {
            r.search_text(query, limit)
        })
        .unwrap_or_default();
        self.hydrate(hits, limit)
    }

    /// Nearest-neighbour search in the remote index. Empty if there is no
    /// remote index or it cannot be reached.
    pub fn search_remote_knn(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        if self.remote.is_none() {
            return Ok(Vec::new());
        }
        let limit = if limit == 0 { self.config.default_limit } else { limit };
        let query_vector = self.read_models()?.embed(query);
        let hits = remote_call(self.remote(), "vector search", |r| {
            r.search_vector(&query_vector, limit)
        })
        .unwrap_or_default();
        self.hydrate(hits, limit)
    }

    /// Map remote hits back to stored documents, dropping hits whose
    /// document no longer exists locally.
    fn hydrate(
        &self,
        hits: Vec<RemoteHit>,
        limit: usize,
    ) -> Result<Vec<RankedDocument>> {
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<u64> = hits.iter().map(|h| h.document_id).collect();
        let mut documents: HashMap<u64, Document> = self
            .store
            .get_by_ids(&ids)?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let results = hits
            .into_iter()
            .filter_map(|hit| {
                let document = documents.remove(&hit.document_id)?;
                Some(RankedDocument {
                    document,
                    score: hit.score,
                })
            })
            .collect();
        Ok(rank(results, limit))
    }

    // -- Lookups --

    /// Every stored document, by ascending id.
    pub fn list(&self) -> Result<Vec<Document>> {
        self.store.get_all()
    }

    /// A stored document with its cached vector.
    pub fn get(&self, id: u64) -> Result<Option<Document>> {
        let Some(mut document) = self.store.get(id)? else {
            return Ok(None);
        };
        document.vector = self.cached_vector(id)?;
        Ok(Some(document))
    }

    pub fn document_by_name(&self, name: &str) -> Result<Option<Document>> {
        let Some(mut document) = self.store.find_by_name(name)? else {
            return Ok(None);
        };
        document.vector = self.cached_vector(document.id)?;
        Ok(Some(document))
    }

    /// The text of the document called `name`.
    pub fn content_by_name(&self, name: &str) -> Result<Option<String>> {
        Ok(self.store.find_by_name(name)?.map(|d| d.text))
    }

    pub fn cached_vector(&self, id: u64) -> Result<Option<Vec<f32>>> {
        Ok(self.read_cache()?.get(id).map(<[f32]>::to_vec))
    }

    pub fn status(&self) -> Result<EngineStatus> {
        let documents = self.store.get_all()?;
        let mirrored = documents.iter().filter(|d| !d.is_local_only()).count();
        Ok(EngineStatus {
            documents: documents.len(),
            cached_vectors: self.read_cache()?.len(),
            mirrored,
            local_only: documents.len() - mirrored,
            remote_backend: self.remote.as_ref().map(|r| r.name()),
            upload_policy: self.config.upload_policy,
            dimension: self.config.dimension,
            startup: self.startup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{corpus::StaticCorpus, remote::EmbeddedIndex};

    struct Fixture {
        _tmp: tempfile::TempDir,
        engine: SearchEngine,
    }

    fn open_with(
        config: EngineConfig,
        remote: Option<Arc<dyn RemoteIndex>>,
        corpus: &StaticCorpus,
    ) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            DocumentStore::open(&tmp.path().join("documents.redb")).unwrap();
        let model_store =
            ModelStore::open(&tmp.path().join("models.redb")).unwrap();
        let engine =
            SearchEngine::open(config, store, model_store, remote, corpus)
                .unwrap();
        Fixture { _tmp: tmp, engine }
    }

    fn corpus() -> StaticCorpus {
        StaticCorpus::from_pairs([
            ("a.txt", "the cat sat"),
            ("b.txt", "the dog ran"),
        ])
    }

    fn names(results: &[RankedDocument]) -> Vec<&str> {
        results.iter().map(|r| r.document.name.as_str()).collect()
    }

    #[test]
    fn empty_store_loads_default_corpus() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        let startup = f.engine.startup();
        assert_eq!(startup.state, StartupState::EmptyCorpus);
        assert_eq!(startup.documents, 2);
        assert_eq!(
            startup.models,
            ModelOutcomes::all(ModelSource::TrainedFresh)
        );
        assert_eq!(f.engine.status().unwrap().cached_vectors, 2);
    }

    #[test]
    fn empty_store_without_corpus_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            DocumentStore::open(&tmp.path().join("documents.redb")).unwrap();
        let model_store =
            ModelStore::open(&tmp.path().join("models.redb")).unwrap();
        let err = SearchEngine::open(
            EngineConfig::default(),
            store,
            model_store,
            None,
            &StaticCorpus::from_pairs([("blank.txt", "   ")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus(_)));
    }

    #[test]
    fn scenario_cat_query() {
        let f = open_with(EngineConfig::default(), None, &corpus());

        let lexical =
            f.engine.search("cat", SearchMode::Lexical, None).unwrap();
        assert_eq!(names(&lexical), vec!["a.txt"]);

        let dense = f.engine.search("cat", SearchMode::Dense, None).unwrap();
        assert_eq!(names(&dense), vec!["a.txt", "b.txt"]);
        assert!(dense[0].score > dense[1].score);
    }

    #[test]
    fn empty_query_is_rejected_but_mode_functions_return_empty() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        assert!(matches!(
            f.engine.search("  ", SearchMode::Dense, None),
            Err(Error::Validation(_))
        ));
        assert!(f.engine.search_lexical("", 5).unwrap().is_empty());
    }

    #[test]
    fn remote_modes_without_remote_are_empty() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        let bm25 = f.engine.search("cat", SearchMode::Bm25, None).unwrap();
        assert!(bm25.is_empty());
        let knn = f.engine.search("cat", SearchMode::Knn, None).unwrap();
        assert!(knn.is_empty());
    }

    #[test]
    fn add_rejects_blank_text() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        assert!(matches!(
            f.engine.add_document("c.txt", " \n"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            f.engine.add_document("", "text"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn incremental_add_updates_tfidf_only() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        let before = f.engine.read_models().unwrap().embedder().clone();

        let doc = f.engine.add_document("c.txt", "a bird sang").unwrap();
        let models = f.engine.read_models().unwrap();
        assert_eq!(models.tfidf().documents(), 3);
        assert_eq!(models.embedder(), &before);
        let cached = f.engine.cached_vector(doc.id).unwrap();
        assert_eq!(doc.vector.as_deref(), cached.as_deref());
    }

    #[test]
    fn retrain_policy_refits_embedder() {
        let config = EngineConfig {
            upload_policy: UploadPolicy::Retrain,
            ..Default::default()
        };
        let f = open_with(config, None, &corpus());
        let doc = f.engine.add_document("c.txt", "a bird sang").unwrap();

        let models = f.engine.read_models().unwrap();
        assert_eq!(models.embedder().documents(), 3);
        assert_eq!(f.engine.status().unwrap().cached_vectors, 3);
        assert!(doc.vector.is_some());
    }

    #[test]
    fn embedded_remote_mirrors_and_searches() {
        let remote: Arc<dyn RemoteIndex> =
            Arc::new(EmbeddedIndex::open_in_ram().unwrap());
        let f = open_with(EngineConfig::default(), Some(remote), &corpus());
        assert_eq!(f.engine.startup().mirrored, 2);
        assert!(f.engine.list().unwrap().iter().all(|d| !d.is_local_only()));

        let bm25 = f.engine.search("cat", SearchMode::Bm25, None).unwrap();
        assert_eq!(names(&bm25), vec!["a.txt"]);

        let knn = f.engine.search("cat", SearchMode::Knn, None).unwrap();
        assert_eq!(knn[0].document.name, "a.txt");

        let a = bm25[0].document.id;
        assert!(f.engine.remove_document(a).unwrap());
        let bm25 = f.engine.search("cat", SearchMode::Bm25, None).unwrap();
        assert!(bm25.is_empty());
    }

    #[test]
    fn resync_without_remote_is_noop() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        assert_eq!(f.engine.resync().unwrap(), 0);
        assert_eq!(f.engine.status().unwrap().local_only, 2);
    }

    #[test]
    fn lookups() {
        let f = open_with(EngineConfig::default(), None, &corpus());
        let a = f.engine.list().unwrap().remove(0);
        let fetched = f.engine.get(a.id).unwrap().unwrap();
        assert_eq!(fetched.name, "a.txt");
        assert_eq!(fetched.vector.map(|v| v.len()), Some(256));

        assert_eq!(
            f.engine.content_by_name("b.txt").unwrap().as_deref(),
            Some("the dog ran")
        );
        assert!(f.engine.content_by_name("missing.txt").unwrap().is_none());
        assert!(f.engine.get(999).unwrap().is_none());
    }
}
