//! docsift - a small document search engine.
//!
//! Documents live in a [redb](https://github.com/cberner/redb) store and are
//! ranked per query by one of five strategies: substring match, TF-IDF
//! cosine, dense-embedding cosine, or BM25 and nearest-neighbour search in
//! an optional remote index (embedded
//! [Tantivy](https://github.com/quickwit-oss/tantivy) or Elasticsearch).
//! Trained model state is persisted and reloaded on the next start.
//!
//! # Quick start
//!
//! ```no_run
//! use docsift::{
//!     DataDir, EngineConfig, RemoteConfig, SearchEngine, SearchMode,
//!     corpus::DirectoryCorpus,
//! };
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let engine = SearchEngine::open_data_dir(
//!     &data_dir,
//!     EngineConfig::default(),
//!     &RemoteConfig::default(),
//!     &DirectoryCorpus::new("articles"),
//! )
//! .unwrap();
//!
//! engine.add_document("cats.txt", "the cat sat on the mat").unwrap();
//! for r in engine.search("cat", SearchMode::Dense, Some(10)).unwrap() {
//!     println!("{} (score: {:.3})", r.document.name, r.score);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod data_dir;
pub mod document;
pub mod document_store;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod mcp;
pub mod model_store;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod remote;
pub mod remote_id;
pub mod sanitizer;
pub mod text_util;
pub mod tfidf;
pub mod vector_cache;

pub use config::{EngineConfig, RemoteConfig, UploadPolicy};
pub use data_dir::{DataDir, DataDirOrigin};
pub use document::{Document, NewDocument};
pub use document_store::DocumentStore;
pub use embedding::{EmbeddingProvider, HashedEmbedder};
pub use engine::{SearchEngine, StartupState};
pub use error::{Error, Result};
pub use model_store::ModelStore;
pub use models::{LoadOutcome, ModelSource, load_or_train};
pub use ranking::{RankedDocument, SearchMode};
pub use remote::RemoteIndex;
