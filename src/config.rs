//! Engine and remote-index settings.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{Error, Result},
    sanitizer::{DEFAULT_STOP_WORDS, Sanitizer},
};

pub const DEFAULT_INDEX_NAME: &str = "article-index";
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5000;

/// What a single runtime upload does to the trained models.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum UploadPolicy {
    /// Fold the new document into the tf-idf table; keep the embedder.
    #[default]
    Incremental,
    /// Retrain every model on the whole corpus and rebuild the cache.
    Retrain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of dense vectors.
    pub dimension: usize,
    /// Length tf-idf vectors are normalized to before comparison.
    pub tfidf_dimension: usize,
    pub case_sensitive: bool,
    pub stop_words: Vec<String>,
    pub upload_policy: UploadPolicy,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: 256,
            tfidf_dimension: 200,
            case_sensitive: false,
            stop_words: DEFAULT_STOP_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            upload_policy: UploadPolicy::default(),
            default_limit: 5,
            max_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Replace the stop-word table with the contents of `path`.
    pub fn load_stop_words(&mut self, path: &Path) -> Result<()> {
        let table = Sanitizer::from_file(path, true)?;
        let mut words = table.words();
        words.sort();
        self.stop_words = words;
        Ok(())
    }

    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new(&self.stop_words, self.case_sensitive)
    }

    /// Bring a caller-supplied limit into range. Absent, zero, or anything
    /// above `max_limit` falls back to `default_limit`.
    pub fn clamp_limit(&self, limit: Option<usize>) -> usize {
        match limit {
            Some(n) if (1..=self.max_limit).contains(&n) => n,
            _ => self.default_limit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::Config("dimension must be at least 1".into()));
        }
        if self.tfidf_dimension == 0 {
            return Err(Error::Config(
                "tfidf_dimension must be at least 1".into(),
            ));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(Error::Config(format!(
                "default_limit must be between 1 and {}",
                self.max_limit
            )));
        }
        Ok(())
    }
}

/// Which remote index implementation to use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    None,
    Embedded,
    Elastic,
}

impl std::str::FromStr for RemoteBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "embedded" => Ok(Self::Embedded),
            "elastic" | "elasticsearch" => Ok(Self::Elastic),
            other => Err(Error::Config(format!(
                "unknown index backend '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub backend: RemoteBackend,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: String,
    pub ca_cert: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::None,
            url: None,
            username: None,
            password: None,
            index: DEFAULT_INDEX_NAME.to_string(),
            ca_cert: None,
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl RemoteConfig {
    /// Read the remote settings from `DOCSIFT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RemoteConfig::from_env`], but invalid settings are logged and
    /// replaced by the local-only default so startup can continue.
    pub fn from_env_or_local() -> Self {
        Self::from_lookup_or_local(|key| std::env::var(key).ok())
    }

    pub fn from_lookup_or_local<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(lookup).unwrap_or_else(|e| {
            warn!(
                error = %e,
                "ignoring remote index settings, running local-only"
            );
            Self::default()
        })
    }

    /// Build the settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("DOCSIFT_ELASTIC_URL");
        let backend = match get("DOCSIFT_INDEX_BACKEND") {
            Some(value) => value.parse()?,
            None if url.is_some() => RemoteBackend::Elastic,
            None => RemoteBackend::None,
        };
        let timeout_ms = match get("DOCSIFT_REMOTE_TIMEOUT_MS") {
            Some(value) => value.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "DOCSIFT_REMOTE_TIMEOUT_MS is not a number: {value}"
                ))
            })?,
            None => DEFAULT_REMOTE_TIMEOUT_MS,
        };

        Ok(Self {
            backend,
            url,
            username: get("DOCSIFT_ELASTIC_USERNAME"),
            password: get("DOCSIFT_ELASTIC_PASSWORD"),
            index: get("DOCSIFT_ELASTIC_INDEX")
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            ca_cert: get("DOCSIFT_ELASTIC_CA_CERT").map(PathBuf::from),
            timeout_ms,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn clamp_limit_defaults_out_of_range_values() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_limit(None), 5);
        assert_eq!(config.clamp_limit(Some(0)), 5);
        assert_eq!(config.clamp_limit(Some(101)), 5);
        assert_eq!(config.clamp_limit(Some(1)), 1);
        assert_eq!(config.clamp_limit(Some(100)), 100);
    }

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let config = EngineConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let json = r#"{"upload_policy":"retrain","dimension":64}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.upload_policy, UploadPolicy::Retrain);
        assert_eq!(config.dimension, 64);
        assert_eq!(config.default_limit, 5);
    }

    #[test]
    fn stop_words_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stop.txt");
        std::fs::write(&path, "zebra\napple\n").unwrap();

        let mut config = EngineConfig::default();
        config.load_stop_words(&path).unwrap();
        assert_eq!(config.stop_words, vec!["apple", "zebra"]);
        assert!(config.sanitizer().is_stop_word("Apple"));
    }

    #[test]
    fn remote_defaults_to_none_without_url() {
        let config = RemoteConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, RemoteBackend::None);
        assert_eq!(config.index, DEFAULT_INDEX_NAME);
        assert_eq!(config.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn remote_defaults_to_elastic_with_url() {
        let config = RemoteConfig::from_lookup(lookup(&[
            ("DOCSIFT_ELASTIC_URL", "https://localhost:9200"),
            ("DOCSIFT_ELASTIC_USERNAME", "elastic"),
            ("DOCSIFT_REMOTE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.backend, RemoteBackend::Elastic);
        assert_eq!(config.username.as_deref(), Some("elastic"));
        assert_eq!(config.timeout_ms, 250);
    }

    #[test]
    fn explicit_backend_wins() {
        let config = RemoteConfig::from_lookup(lookup(&[
            ("DOCSIFT_ELASTIC_URL", "https://localhost:9200"),
            ("DOCSIFT_INDEX_BACKEND", "embedded"),
        ]))
        .unwrap();
        assert_eq!(config.backend, RemoteBackend::Embedded);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = RemoteConfig::from_lookup(lookup(&[(
            "DOCSIFT_INDEX_BACKEND",
            "solr",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = RemoteConfig::from_lookup(lookup(&[(
            "DOCSIFT_REMOTE_TIMEOUT_MS",
            "soon",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn bad_values_fall_back_to_local_only() {
        let config = RemoteConfig::from_lookup_or_local(lookup(&[
            ("DOCSIFT_ELASTIC_URL", "https://localhost:9200"),
            ("DOCSIFT_INDEX_BACKEND", "solr"),
        ]));
        assert_eq!(config.backend, RemoteBackend::None);
        assert_eq!(config.url, None);

        let config = RemoteConfig::from_lookup_or_local(lookup(&[
            ("DOCSIFT_ELASTIC_URL", "https://localhost:9200"),
            ("DOCSIFT_REMOTE_TIMEOUT_MS", "soon"),
        ]));
        assert_eq!(config.backend, RemoteBackend::None);
        assert_eq!(config.timeout_ms, DEFAULT_REMOTE_TIMEOUT_MS);
    }

    #[test]
    fn valid_values_survive_the_fallback() {
        let config = RemoteConfig::from_lookup_or_local(lookup(&[(
            "DOCSIFT_INDEX_BACKEND",
            "embedded",
        )]));
        assert_eq!(config.backend, RemoteBackend::Embedded);
    }
}
