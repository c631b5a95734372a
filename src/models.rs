//! The trained text models and their persistence.
//!
//! Three pieces of state are persisted in the [`ModelStore`]: the tokenizer
//! pipeline settings (`nlp`), the tf-idf table (`tfidf`) and the dense
//! embedder (`embedding`). [`load_or_train`] returns a [`LoadOutcome`] telling
//! the caller whether the stored state was used or a fresh one was trained.

use serde::{Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use crate::{
    config::EngineConfig,
    embedding::{EmbeddingProvider, HashedEmbedder, normalize},
    error::{Error, Result},
    model_store::ModelStore,
    pipeline::Pipeline,
    sanitizer::Sanitizer,
    tfidf::TfIdf,
};

pub const PIPELINE_KEY: &str = "nlp";
pub const TFIDF_KEY: &str = "tfidf";
pub const EMBEDDING_KEY: &str = "embedding";

/// Model state that can be stored under a fixed key.
pub trait PersistedModel: Serialize + DeserializeOwned {
    const KEY: &'static str;

    /// Check loaded state against the running configuration.
    fn check(&self, _config: &EngineConfig) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl PersistedModel for Pipeline {
    const KEY: &'static str = PIPELINE_KEY;
}

impl PersistedModel for TfIdf {
    const KEY: &'static str = TFIDF_KEY;
}

impl PersistedModel for HashedEmbedder {
    const KEY: &'static str = EMBEDDING_KEY;

    fn check(&self, config: &EngineConfig) -> std::result::Result<(), String> {
        if self.dimension() == config.dimension {
            Ok(())
        } else {
            Err(format!(
                "stored dimension {} does not match configured {}",
                self.dimension(),
                config.dimension
            ))
        }
    }
}

/// Where a piece of model state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Loaded,
    TrainedFresh,
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => f.write_str("loaded"),
            Self::TrainedFresh => f.write_str("trained fresh"),
        }
    }
}

/// Result of [`load_or_train`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    Loaded(T),
    TrainedFresh(T),
}

impl<T> LoadOutcome<T> {
    pub fn source(&self) -> ModelSource {
        match self {
            Self::Loaded(_) => ModelSource::Loaded,
            Self::TrainedFresh(_) => ModelSource::TrainedFresh,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Loaded(value) | Self::TrainedFresh(value) => value,
        }
    }
}

/// Load `T` from the store, or train and store a fresh one if the stored
/// state is missing, corrupt, or incompatible with `config`.
///
/// Database failures other than undecodable state are returned as errors.
pub fn load_or_train<T, F>(
    store: &ModelStore,
    config: &EngineConfig,
    train: F,
) -> Result<LoadOutcome<T>>
where
    T: PersistedModel,
    F: FnOnce() -> T,
{
    match store.load::<T>(T::KEY) {
        Ok(Some(model)) => match model.check(config) {
            Ok(()) => {
                info!(key = T::KEY, "loaded model state");
                return Ok(LoadOutcome::Loaded(model));
            }
            Err(reason) => {
                warn!(
                    key = T::KEY,
                    %reason,
                    "stored model state incompatible, training fresh"
                );
            }
        },
        Ok(None) => {
            info!(key = T::KEY, "no stored model state, training fresh");
        }
        Err(Error::ModelState { reason, .. }) => {
            warn!(
                key = T::KEY,
                %reason,
                "stored model state unreadable, training fresh"
            );
        }
        Err(e) => return Err(e),
    }

    let model = train();
    store.store(T::KEY, &model)?;
    Ok(LoadOutcome::TrainedFresh(model))
}

/// Tokenizer pipeline plus stop-word filter.
#[derive(Debug, Clone)]
pub struct Analyzer {
    pipeline: Pipeline,
    sanitizer: Sanitizer,
}

impl Analyzer {
    pub fn new(pipeline: Pipeline, sanitizer: Sanitizer) -> Self {
        Self {
            pipeline,
            sanitizer,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Tokenize, lemmatize and sanitize `text`.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.pipeline.tokenize_lemmatize(text);
        self.sanitizer.sanitize(&tokens).map(str::to_string).collect()
    }

    pub fn corpus_terms<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<String>> {
        texts.iter().map(|t| self.terms(t.as_ref())).collect()
    }
}

/// Which model state came from the store at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOutcomes {
    pub pipeline: ModelSource,
    pub tfidf: ModelSource,
    pub embedding: ModelSource,
}

impl ModelOutcomes {
    pub fn all(source: ModelSource) -> Self {
        Self {
            pipeline: source,
            tfidf: source,
            embedding: source,
        }
    }
}

/// Everything needed to turn text into vectors.
#[derive(Debug, Clone)]
pub struct TextModels {
    analyzer: Analyzer,
    tfidf: TfIdf,
    embedder: HashedEmbedder,
    tfidf_dimension: usize,
}

impl TextModels {
    pub fn new(
        analyzer: Analyzer,
        tfidf: TfIdf,
        embedder: HashedEmbedder,
        tfidf_dimension: usize,
    ) -> Self {
        Self {
            analyzer,
            tfidf,
            embedder,
            tfidf_dimension,
        }
    }

    /// Fit fresh models on `texts` without touching any store.
    pub fn train<S: AsRef<str>>(
        config: &EngineConfig,
        pipeline: Pipeline,
        texts: &[S],
    ) -> Self {
        let analyzer = Analyzer::new(pipeline, config.sanitizer());
        let corpus = analyzer.corpus_terms(texts);
        let tfidf = TfIdf::fit(&corpus);
        let embedder = HashedEmbedder::train(config.dimension, &corpus);
        Self::new(analyzer, tfidf, embedder, config.tfidf_dimension)
    }

    /// Fit fresh models on `texts` and persist all of them.
    pub fn train_and_store<S: AsRef<str>>(
        store: &ModelStore,
        config: &EngineConfig,
        pipeline: Pipeline,
        texts: &[S],
    ) -> Result<Self> {
        let models = Self::train(config, pipeline, texts);
        models.store_all(store)?;
        Ok(models)
    }

    /// Load each piece of model state, training whichever is unusable from
    /// `texts`.
    pub fn load_or_train<S: AsRef<str>>(
        store: &ModelStore,
        config: &EngineConfig,
        texts: &[S],
    ) -> Result<(Self, ModelOutcomes)> {
        let pipeline = load_or_train(store, config, Pipeline::default)?;
        let pipeline_source = pipeline.source();
        let analyzer = Analyzer::new(pipeline.into_inner(), config.sanitizer());

        let mut corpus: Option<Vec<Vec<String>>> = None;
        let mut corpus_terms = || {
            corpus.get_or_insert_with(|| analyzer.corpus_terms(texts)).clone()
        };

        let tfidf =
            load_or_train(store, config, || TfIdf::fit(corpus_terms()))?;
        let embedding = load_or_train(store, config, || {
            HashedEmbedder::train(config.dimension, corpus_terms())
        })?;

        let outcomes = ModelOutcomes {
            pipeline: pipeline_source,
            tfidf: tfidf.source(),
            embedding: embedding.source(),
        };
        let models = Self::new(
            analyzer,
            tfidf.into_inner(),
            embedding.into_inner(),
            config.tfidf_dimension,
        );
        Ok((models, outcomes))
    }

    pub fn store_all(&self, store: &ModelStore) -> Result<()> {
        store.store(PIPELINE_KEY, self.analyzer.pipeline())?;
        store.store(TFIDF_KEY, &self.tfidf)?;
        store.store(EMBEDDING_KEY, &self.embedder)?;
        Ok(())
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn tfidf(&self) -> &TfIdf {
        &self.tfidf
    }

    pub fn embedder(&self) -> &HashedEmbedder {
        &self.embedder
    }

    /// Fold one more document into the tf-idf table.
    pub fn observe(&mut self, text: &str) {
        self.tfidf.observe(self.analyzer.terms(text));
    }

    /// The lexical frequency vector of `text` at the fixed tf-idf length.
    pub fn tfidf_vector(&self, text: &str) -> Vec<f32> {
        normalize(&self.lexical_frequency_vector(text), self.tfidf_dimension)
    }
}

impl EmbeddingProvider for TextModels {
    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let terms = self.analyzer.terms(text);
        let refs: Vec<&str> = terms.iter().map(String::as_str).collect();
        self.embedder.embed_terms(&refs)
    }

    fn lexical_frequency_vector(&self, text: &str) -> Vec<f32> {
        let terms = self.analyzer.terms(text);
        let refs: Vec<&str> = terms.iter().map(String::as_str).collect();
        self.tfidf.weights(&refs)
    }
}
