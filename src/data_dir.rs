//! On-disk home of the document store, the model store and the embedded
//! index.

use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub const DATA_DIR_ENV: &str = "DOCSIFT_DATA_DIR";

const DOCUMENTS_FILE: &str = "documents.redb";
const MODELS_FILE: &str = "models.redb";
const INDEX_DIR: &str = "index";

/// Where the data directory setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDirOrigin {
    /// `--data-dir` on the command line.
    Flag,
    /// The `DOCSIFT_DATA_DIR` variable.
    Environment,
    /// `$XDG_DATA_HOME/docsift`.
    Xdg,
}

impl fmt::Display for DataDirOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "--data-dir",
            Self::Environment => DATA_DIR_ENV,
            Self::Xdg => "xdg",
        })
    }
}

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    origin: DataDirOrigin,
}

impl DataDir {
    /// Pick the data directory and make sure it exists. `explicit` beats
    /// `DOCSIFT_DATA_DIR`, which beats the XDG data home.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_with(explicit, |key| std::env::var_os(key))
    }

    /// [`DataDir::resolve`] with the environment read through `lookup`.
    pub fn resolve_with<F>(explicit: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let from_env = lookup(DATA_DIR_ENV).filter(|value| !value.is_empty());
        let (root, origin) = match (explicit, from_env) {
            (Some(path), _) => (path.to_path_buf(), DataDirOrigin::Flag),
            (None, Some(value)) => {
                (PathBuf::from(value), DataDirOrigin::Environment)
            }
            (None, None) => (xdg_data_home()?, DataDirOrigin::Xdg),
        };

        ensure_dir(&root)?;
        debug!(root = %root.display(), %origin, "using data directory");
        Ok(Self { root, origin })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> DataDirOrigin {
        self.origin
    }

    pub fn documents_db(&self) -> PathBuf {
        self.root.join(DOCUMENTS_FILE)
    }

    pub fn models_db(&self) -> PathBuf {
        self.root.join(MODELS_FILE)
    }

    /// Directory of the embedded remote index, created on demand.
    pub fn index_dir(&self) -> Result<PathBuf> {
        let path = self.root.join(INDEX_DIR);
        ensure_dir(&path)?;
        Ok(path)
    }
}

fn xdg_data_home() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix("docsift")
        .get_data_home()
        .ok_or_else(|| {
            Error::Config("could not determine XDG data home directory".into())
        })
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|_| Error::DataDir(path.to_path_buf()))
}
