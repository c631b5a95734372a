//! Sources of the default corpus loaded into an empty store.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{document::NewDocument, error::Result};

/// Where the engine gets documents from when the store is empty.
pub trait CorpusSource: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<NewDocument>>;
}

/// Supported file extensions for document discovery.
const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// A directory of `.txt` and `.md` files.
///
/// Walked recursively, skipping hidden files and directories, in sorted
/// order. Each document is named by its path relative to the root, using
/// `/` as separator.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CorpusSource for DirectoryCorpus {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn load(&self) -> Result<Vec<NewDocument>> {
        let root = self.root.canonicalize()?;
        let mut files = Vec::new();
        walk_dir(&root, &root, &mut files)?;
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for relative in files {
            let path = root.join(&relative);
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable file"
                    );
                    continue;
                }
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            documents.push(NewDocument::new(name, text));
        }
        Ok(documents)
    }
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();

        // Skip hidden files and directories.
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_dir(root, &path, results)?;
        } else if (file_type.is_file() || path.is_file()) && is_supported(&path)
        {
            let relative =
                path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            results.push(relative);
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

/// A fixed list of documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    documents: Vec<NewDocument>,
}

impl StaticCorpus {
    pub fn new(documents: Vec<NewDocument>) -> Self {
        Self { documents }
    }

    pub fn from_pairs<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, text)| NewDocument::new(name, text))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl CorpusSource for StaticCorpus {
    fn describe(&self) -> String {
        format!("{} built-in documents", self.documents.len())
    }

    fn load(&self) -> Result<Vec<NewDocument>> {
        Ok(self.documents.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn discovers_md_and_txt_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "the dog ran").unwrap();
        fs::write(tmp.path().join("a.md"), "# cats").unwrap();
        fs::write(tmp.path().join("image.png"), "binary").unwrap();

        let docs = DirectoryCorpus::new(tmp.path()).load().unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
        assert_eq!(docs[1].text, "the dog ran");
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join(".git/notes.txt"), "hidden").unwrap();
        fs::write(tmp.path().join(".secret.txt"), "hidden").unwrap();
        fs::write(tmp.path().join("visible.txt"), "shown").unwrap();

        let docs = DirectoryCorpus::new(tmp.path()).load().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "visible.txt");
    }

    #[test]
    fn nested_files_use_relative_names() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
        fs::write(tmp.path().join("sub/deeper/c.txt"), "nested").unwrap();

        let docs = DirectoryCorpus::new(tmp.path()).load().unwrap();
        assert_eq!(docs[0].name, "sub/deeper/c.txt");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let corpus = DirectoryCorpus::new("/nonexistent/corpus");
        assert!(corpus.load().is_err());
    }

    #[test]
    fn static_corpus_returns_its_documents() {
        let corpus = StaticCorpus::from_pairs([("a.txt", "the cat sat")]);
        let docs = corpus.load().unwrap();
        assert_eq!(docs, vec![NewDocument::new("a.txt", "the cat sat")]);
        assert!(StaticCorpus::empty().load().unwrap().is_empty());
    }
}
