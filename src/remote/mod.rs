//! The optional remote full-text and vector index.
//!
//! Every backend implements [`RemoteIndex`]. The engine treats every error
//! from a backend as "remote unavailable": it logs and carries on with local
//! state only.

pub mod elastic;
pub mod embedded;

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::{RemoteBackend, RemoteConfig},
    data_dir::DataDir,
    document::Document,
    error::Result,
};

pub use elastic::ElasticIndex;
pub use embedded::EmbeddedIndex;

/// One search hit from the remote index.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteHit {
    pub remote_id: String,
    /// Local id the document was mirrored from.
    pub document_id: u64,
    pub score: f32,
}

pub trait RemoteIndex: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Make sure the index and its mapping exist.
    fn create_schema(&self) -> Result<()>;

    /// Drop every document and recreate the index.
    fn reset(&self) -> Result<()>;

    /// Mirror a document. Returns the remote id, or `None` if the backend
    /// accepted the call without assigning one.
    fn index_document(&self, document: &Document) -> Result<Option<String>>;

    fn delete_document(&self, remote_id: &str) -> Result<()>;

    /// Replace the stored text and vector of an already mirrored document.
    fn update_document(&self, document: &Document) -> Result<()>;

    /// BM25 phrase search over document text.
    fn search_text(&self, query: &str, limit: usize) -> Result<Vec<RemoteHit>>;

    /// Nearest neighbours of `vector` by cosine similarity.
    fn search_vector(&self, vector: &[f32], k: usize) -> Result<Vec<RemoteHit>>;
}

/// Build the configured remote index.
///
/// Returns `None` when no backend is configured or the configured one cannot
/// be constructed; the rest of the system runs local-only in that case. A
/// backend that is built but unreachable is still returned so later calls
/// can succeed once it comes up.
pub fn connect(
    config: &RemoteConfig,
    data_dir: Option<&DataDir>,
    dimension: usize,
) -> Option<Arc<dyn RemoteIndex>> {
    let built: Result<Arc<dyn RemoteIndex>> = match config.backend {
        RemoteBackend::None => {
            info!("no remote index configured, running local-only");
            return None;
        }
        RemoteBackend::Embedded => match data_dir {
            Some(dir) => dir
                .index_dir()
                .and_then(|path| EmbeddedIndex::open(&path))
                .map(|index| Arc::new(index) as Arc<dyn RemoteIndex>),
            None => EmbeddedIndex::open_in_ram()
                .map(|index| Arc::new(index) as Arc<dyn RemoteIndex>),
        },
        RemoteBackend::Elastic => ElasticIndex::connect(config, dimension)
            .map(|index| Arc::new(index) as Arc<dyn RemoteIndex>),
    };

    let index = match built {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "remote index disabled");
            return None;
        }
    };

    if let Err(e) = index.create_schema() {
        warn!(
            backend = index.name(),
            error = %e,
            "remote index not reachable yet"
        );
    } else {
        info!(backend = index.name(), "remote index ready");
    }
    Some(index)
}
