//! In-process remote index backed by tantivy.
//!
//! Text search is BM25 over a stemmed text field. Vectors are stored as raw
//! little-endian `f32` bytes and searched by brute-force cosine similarity.

use std::{path::Path, sync::Mutex};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    Term,
    collector::TopDocs,
    doc,
    query::{AllQuery, QueryParser},
    schema::*,
    tokenizer::{
        Language,
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use super::{RemoteHit, RemoteIndex};
use crate::{
    document::Document,
    embedding::cosine_similarity,
    error::{Error, Result},
    remote_id::RemoteId,
};

/// Field names used in the schema.
pub mod fields {
    pub const REMOTE_ID: &str = "remote_id";
    pub const DOCUMENT_ID: &str = "document_id";
    pub const NAME: &str = "name";
    pub const TEXT: &str = "text";
    pub const VECTOR: &str = "vector";
}

const WRITER_MEMORY_BUDGET: usize = 15_000_000;

#[derive(Clone, Copy)]
struct SchemaFields {
    remote_id: Field,
    document_id: Field,
    name: Field,
    text: Field,
    vector: Field,
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let remote_id = builder.add_text_field(fields::REMOTE_ID, STRING | STORED);
    let document_id =
        builder.add_u64_field(fields::DOCUMENT_ID, INDEXED | STORED | FAST);
    let name = builder.add_text_field(fields::NAME, STRING | STORED);

    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    let text = builder.add_text_field(fields::TEXT, text_opts);
    let vector = builder.add_bytes_field(fields::VECTOR, STORED);

    let schema = builder.build();
    let fields = SchemaFields {
        remote_id,
        document_id,
        name,
        text,
        vector,
    };

    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

/// A tantivy index standing in for the remote search service.
pub struct EmbeddedIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: SchemaFields,
}

impl std::fmt::Debug for EmbeddedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedIndex").finish_non_exhaustive()
    }
}

impl EmbeddedIndex {
    /// Open or create an index at the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())?
        };

        Self::from_index(index, fields)
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        let (schema, fields) = build_schema();
        Self::from_index(Index::create_in_ram(schema), fields)
    }

    fn from_index(index: Index, fields: SchemaFields) -> Result<Self> {
        register_tokenizers(&index);
        let reader = index.reader()?;
        let writer = index.writer(WRITER_MEMORY_BUDGET)?;
        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    fn with_writer<T>(
        &self,
        f: impl FnOnce(&mut IndexWriter) -> Result<T>,
    ) -> Result<T> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::LockPoisoned("index writer"))?;
        let value = f(&mut writer)?;
        writer.commit()?;
        Ok(value)
    }

    fn add(
        &self,
        writer: &IndexWriter,
        remote_id: &str,
        document: &Document,
    ) -> Result<()> {
        let f = self.fields;
        let vector: Vec<u8> = document
            .vector
            .as_deref()
            .map(|v| bytemuck::cast_slice::<f32, u8>(v).to_vec())
            .unwrap_or_default();

        writer.delete_term(Term::from_field_text(f.remote_id, remote_id));
        writer.add_document(doc!(
            f.remote_id => remote_id,
            f.document_id => document.id,
            f.name => document.name.as_str(),
            f.text => document.text.as_str(),
            f.vector => vector,
        ))?;
        Ok(())
    }

    fn hit(&self, doc: &TantivyDocument, score: f32) -> RemoteHit {
        RemoteHit {
            remote_id: extract_text(doc, self.fields.remote_id),
            document_id: extract_u64(doc, self.fields.document_id),
            score,
        }
    }
}

impl RemoteIndex for EmbeddedIndex {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn create_schema(&self) -> Result<()> {
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.with_writer(|writer| {
            writer.delete_all_documents()?;
            Ok(())
        })
    }

    fn index_document(&self, document: &Document) -> Result<Option<String>> {
        let remote_id =
            RemoteId::new(document.id, &document.name).into_string();
        self.with_writer(|writer| self.add(writer, &remote_id, document))?;
        Ok(Some(remote_id))
    }

    fn delete_document(&self, remote_id: &str) -> Result<()> {
        self.with_writer(|writer| {
            let term = Term::from_field_text(self.fields.remote_id, remote_id);
            writer.delete_term(term);
            Ok(())
        })
    }

    fn update_document(&self, document: &Document) -> Result<()> {
        let remote_id = document.remote_id.as_deref().ok_or_else(|| {
            Error::Validation(format!(
                "document {} has not been mirrored",
                document.id
            ))
        })?;
        self.with_writer(|writer| self.add(writer, remote_id, document))
    }

    fn search_text(&self, query: &str, limit: usize) -> Result<Vec<RemoteHit>> {
        let phrase = query.replace('"', " ");
        if limit == 0 || phrase.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let parser =
            QueryParser::for_index(&self.index, vec![self.fields.text]);
        let (query, _errors) =
            parser.parse_query_lenient(&format!("\"{}\"", phrase.trim()));
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            hits.push(self.hit(&doc, score));
        }
        Ok(hits)
    }

    fn search_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RemoteHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let total = searcher.num_docs() as usize;
        if total == 0 {
            return Ok(Vec::new());
        }

        let all = searcher.search(&AllQuery, &TopDocs::with_limit(total))?;
        let mut hits = Vec::new();
        for (_, address) in all {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some(stored) = extract_vector(&doc, self.fields.vector) else {
                continue;
            };
            let score = cosine_similarity(vector, &stored);
            hits.push(self.hit(&doc, score));
        }

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn extract_vector(doc: &TantivyDocument, field: Field) -> Option<Vec<f32>> {
    let bytes = doc.get_first(field).and_then(|v| v.as_bytes())?;
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(bytemuck::pod_collect_to_vec::<u8, f32>(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: u64, name: &str, text: &str, vector: Vec<f32>) -> Document {
        let mut doc = Document::new(id, name, text);
        doc.vector = Some(vector);
        doc
    }

    #[test]
    fn index_and_search_text() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        let cat = document(1, "a.txt", "the cat sat", vec![1.0, 0.0]);
        let a = idx.index_document(&cat).unwrap().unwrap();
        idx.index_document(&document(2, "b.txt", "the dog ran", vec![0.0, 1.0]))
            .unwrap();

        let hits = idx.search_text("cats", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 1);
        assert_eq!(hits[0].remote_id, a);
    }

    #[test]
    fn phrase_search_requires_adjacent_terms() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        let mat = document(1, "a.txt", "the cat sat on the mat", vec![]);
        idx.index_document(&mat).unwrap();
        idx.index_document(&document(2, "b.txt", "the sat cat", vec![]))
            .unwrap();

        let hits = idx.search_text("cat sat", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 1);
    }

    #[test]
    fn zero_limit_and_blank_query_are_empty() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        idx.index_document(&document(1, "a.txt", "the cat sat", vec![]))
            .unwrap();
        assert!(idx.search_text("cat", 0).unwrap().is_empty());
        assert!(idx.search_text("  \"\" ", 5).unwrap().is_empty());
    }

    #[test]
    fn vector_search_orders_by_similarity() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        idx.index_document(&document(1, "a.txt", "one", vec![1.0, 0.0]))
            .unwrap();
        idx.index_document(&document(2, "b.txt", "two", vec![0.6, 0.8]))
            .unwrap();
        idx.index_document(&document(3, "c.txt", "three", vec![]))
            .unwrap();

        let hits = idx.search_vector(&[0.0, 1.0], 5).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.document_id).collect();
        assert_eq!(ids, vec![2, 1]);

        let top = idx.search_vector(&[1.0, 0.0], 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].document_id, 1);
        assert!((top[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn update_replaces_vector() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        let mut doc = document(1, "a.txt", "one", vec![]);
        doc.remote_id = idx.index_document(&doc).unwrap();
        assert!(idx.search_vector(&[1.0, 0.0], 5).unwrap().is_empty());

        doc.vector = Some(vec![1.0, 0.0]);
        idx.update_document(&doc).unwrap();
        let hits = idx.search_vector(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(idx.search_text("one", 5).unwrap().len(), 1);
    }

    #[test]
    fn update_without_remote_id_is_rejected() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        let doc = document(1, "a.txt", "one", vec![]);
        assert!(matches!(idx.update_document(&doc), Err(Error::Validation(_))));
    }

    #[test]
    fn delete_and_reset() {
        let idx = EmbeddedIndex::open_in_ram().unwrap();
        let a = idx
            .index_document(&document(1, "a.txt", "hello world", vec![]))
            .unwrap()
            .unwrap();
        idx.index_document(&document(2, "b.txt", "hello there", vec![]))
            .unwrap();

        idx.delete_document(&a).unwrap();
        let hits = idx.search_text("hello", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, 2);

        idx.reset().unwrap();
        assert!(idx.search_text("hello", 10).unwrap().is_empty());
    }

    #[test]
    fn reopen_keeps_documents() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let idx = EmbeddedIndex::open(tmp.path()).unwrap();
            idx.index_document(&document(1, "a.txt", "persistent text", vec![]))
                .unwrap();
        }
        let idx = EmbeddedIndex::open(tmp.path()).unwrap();
        assert_eq!(idx.search_text("persistent", 10).unwrap().len(), 1);
    }
}
