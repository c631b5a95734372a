//! Elasticsearch backend over its REST API.

use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{
    StatusCode,
    blocking::{Client as HttpClient, RequestBuilder, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{RemoteHit, RemoteIndex};
use crate::{
    config::RemoteConfig,
    document::Document,
    error::{Error, Result},
};

/// Candidates examined per requested neighbour in a kNN query.
const KNN_CANDIDATE_FACTOR: usize = 10;
const KNN_MIN_CANDIDATES: usize = 100;

pub struct ElasticIndex {
    http: HttpClient,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
    dimension: usize,
}

impl std::fmt::Debug for ElasticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticIndex")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct IndexResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Option<SourceId>,
}

#[derive(Deserialize)]
struct SourceId {
    id: u64,
}

impl ElasticIndex {
    /// Build a client from the remote settings. Fails if no URL is set or
    /// the settings are inconsistent; does not contact the server.
    pub fn connect(config: &RemoteConfig, dimension: usize) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| {
                Error::Config("DOCSIFT_ELASTIC_URL is not set".into())
            })?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "elastic username and password must be set together".into(),
                ));
            }
        };

        let mut builder = HttpClient::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout().min(Duration::from_secs(5)));
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                Error::Config(format!(
                    "cannot read CA certificate {}: {e}",
                    path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                Error::Config(format!("invalid CA certificate: {e}"))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| {
                Error::Config(format!("cannot build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            credentials,
            dimension,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", self.base_url, self.index)
        } else {
            format!("{}/{}/{}", self.base_url, self.index, path)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    fn source(&self, document: &Document) -> Value {
        let mut source = json!({
            "id": document.id,
            "name": document.name,
            "text": document.text,
        });
        // Elasticsearch rejects zero-magnitude vectors for cosine similarity.
        if let Some(vector) = document.vector.as_deref().filter(|v| {
            v.len() == self.dimension && v.iter().any(|x| *x != 0.0)
        }) {
            source["vector"] = json!(vector);
        }
        source
    }

    fn search(&self, body: Value) -> Result<Vec<RemoteHit>> {
        let response = self
            .authorize(self.http.post(self.url("_search")))
            .json(&body)
            .send()?;
        let response = expect_success(response, "search")?;
        let parsed: SearchResponse = response.json()?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .filter_map(|entry| {
                let document_id = entry.source?.id;
                Some(RemoteHit {
                    remote_id: entry.id,
                    document_id,
                    score: entry.score.unwrap_or(0.0),
                })
            })
            .collect())
    }
}

fn encode_id(remote_id: &str) -> String {
    utf8_percent_encode(remote_id, NON_ALPHANUMERIC).to_string()
}

fn expect_success(response: Response, action: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().unwrap_or_default();
    Err(Error::RemoteUnavailable(format!(
        "elastic {action} failed ({status}): {body}"
    )))
}

impl RemoteIndex for ElasticIndex {
    fn name(&self) -> &'static str {
        "elastic"
    }

    fn create_schema(&self) -> Result<()> {
        let body = json!({
            "mappings": {
                "properties": {
                    "id": { "type": "long" },
                    "name": { "type": "keyword" },
                    "text": { "type": "text" },
                    "vector": {
                        "type": "dense_vector",
                        "dims": self.dimension,
                        "index": true,
                        "similarity": "cosine"
                    }
                }
            }
        });
        let response = self
            .authorize(self.http.put(self.url("")))
            .json(&body)
            .send()?;
        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().unwrap_or_default();
            if text.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(Error::RemoteUnavailable(format!(
                "elastic create index failed: {text}"
            )));
        }
        expect_success(response, "create index")?;
        debug!(index = %self.index, "created elastic index");
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let response = self.authorize(self.http.delete(self.url(""))).send()?;
        if response.status() != StatusCode::NOT_FOUND {
            expect_success(response, "delete index")?;
        }
        self.create_schema()
    }

    fn index_document(&self, document: &Document) -> Result<Option<String>> {
        let response = self
            .authorize(self.http.post(self.url("_doc")))
            .query(&[("refresh", "wait_for")])
            .json(&self.source(document))
            .send()?;
        let response = expect_success(response, "index document")?;
        let parsed: IndexResponse = response.json()?;
        Ok(Some(parsed.id).filter(|id| !id.is_empty()))
    }

    fn delete_document(&self, remote_id: &str) -> Result<()> {
        let path = format!("_doc/{}", encode_id(remote_id));
        let response = self
            .authorize(self.http.delete(self.url(&path)))
            .query(&[("refresh", "wait_for")])
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response, "delete document")?;
        Ok(())
    }

    fn update_document(&self, document: &Document) -> Result<()> {
        let remote_id = document.remote_id.as_deref().ok_or_else(|| {
            Error::Validation(format!(
                "document {} has not been mirrored",
                document.id
            ))
        })?;
        let path = format!("_update/{}", encode_id(remote_id));
        let response = self
            .authorize(self.http.post(self.url(&path)))
            .query(&[("refresh", "wait_for")])
            .json(&json!({ "doc": self.source(document) }))
            .send()?;
        expect_success(response, "update document")?;
        Ok(())
    }

    fn search_text(&self, query: &str, limit: usize) -> Result<Vec<RemoteHit>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.search(json!({
            "size": limit,
            "query": { "match_phrase": { "text": query } },
            "_source": ["id"]
        }))
    }

    fn search_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RemoteHit>> {
        if k == 0 || vector.iter().all(|x| *x == 0.0) {
            return Ok(Vec::new());
        }
        let candidates = (k * KNN_CANDIDATE_FACTOR).max(KNN_MIN_CANDIDATES);
        self.search(json!({
            "size": k,
            "knn": {
                "field": "vector",
                "query_vector": vector,
                "k": k,
                "num_candidates": candidates
            },
            "_source": ["id"]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> RemoteConfig {
        RemoteConfig {
            url: Some(url.to_string()),
            timeout_ms: 200,
            ..Default::default()
        }
    }

    #[test]
    fn requires_url() {
        let err =
            ElasticIndex::connect(&RemoteConfig::default(), 8).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn username_without_password_is_rejected() {
        let mut cfg = config("http://localhost:9200");
        cfg.username = Some("elastic".into());
        let err = ElasticIndex::connect(&cfg, 8).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_ca_cert_is_config_error() {
        let mut cfg = config("http://localhost:9200");
        cfg.ca_cert = Some("/nonexistent/ca.pem".into());
        let err = ElasticIndex::connect(&cfg, 8).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn urls_are_built_under_the_index() {
        let cfg = config("http://localhost:9200/");
        let idx = ElasticIndex::connect(&cfg, 8).unwrap();
        assert_eq!(idx.url(""), "http://localhost:9200/article-index");
        assert_eq!(
            idx.url("_search"),
            "http://localhost:9200/article-index/_search"
        );
    }

    #[test]
    fn zero_vector_is_left_out_of_source() {
        let idx =
            ElasticIndex::connect(&config("http://localhost:9200"), 2).unwrap();
        let mut doc = Document::new(1, "a.txt", "text");
        doc.vector = Some(vec![0.0, 0.0]);
        assert!(idx.source(&doc).get("vector").is_none());

        doc.vector = Some(vec![0.6, 0.8]);
        assert!(idx.source(&doc).get("vector").is_some());

        doc.vector = Some(vec![1.0, 0.0, 0.0]);
        assert!(idx.source(&doc).get("vector").is_none());
    }

    #[test]
    fn unreachable_server_is_remote_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let idx =
            ElasticIndex::connect(&config("http://127.0.0.1:9"), 2).unwrap();
        let err = idx.search_text("cat", 5).unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable(_)));
    }

    #[test]
    fn empty_requests_skip_the_network() {
        let idx =
            ElasticIndex::connect(&config("http://127.0.0.1:9"), 2).unwrap();
        assert!(idx.search_text("cat", 0).unwrap().is_empty());
        assert!(idx.search_vector(&[0.0, 0.0], 5).unwrap().is_empty());
    }
}
