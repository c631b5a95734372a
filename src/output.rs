//! Terminal output for the CLI.

use serde::Serialize;

use crate::{
    data_dir::DataDir,
    document::Document,
    engine::EngineStatus,
    error::Result,
    ranking::{RankedDocument, SearchMode},
    text_util::truncate_chars,
};

const PREVIEW_CHARS: usize = 80;

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    mode: SearchMode,
    result_count: usize,
    results: Vec<SearchItem<'a>>,
}

#[derive(Serialize)]
struct SearchItem<'a> {
    rank: usize,
    score: f32,
    id: u64,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_id: Option<&'a str>,
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&flat, PREVIEW_CHARS)
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[RankedDocument]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "{:>3}. [{:.3}] {} #{}",
            i + 1,
            r.score,
            r.document.name,
            r.document.id
        );
        println!("     {}", preview(&r.document.text));
    }
    println!("\n{} result(s)", results.len());
}

/// Format results as JSON output.
pub fn format_json(
    results: &[RankedDocument],
    query: &str,
    mode: SearchMode,
) -> Result<()> {
    let output = SearchOutput {
        query,
        mode,
        result_count: results.len(),
        results: results
            .iter()
            .enumerate()
            .map(|(i, r)| SearchItem {
                rank: i + 1,
                score: r.score,
                id: r.document.id,
                name: &r.document.name,
                remote_id: r.document.remote_id.as_deref(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

pub fn format_documents(documents: &[Document], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(documents)?);
        return Ok(());
    }
    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for d in documents {
        let remote = d.remote_id.as_deref().unwrap_or("-");
        println!("{:>5}  {}  [{remote}]", d.id, d.name);
    }
    println!("\n{} document(s)", documents.len());
    Ok(())
}

pub fn format_document(document: &Document, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(document)?);
    } else {
        println!("{}", document.text);
    }
    Ok(())
}

pub fn format_status(
    status: &EngineStatus,
    data_dir: &DataDir,
    json: bool,
) -> Result<()> {
    let root = data_dir.root().display().to_string();
    if json {
        let mut value = serde_json::to_value(status)?;
        value["data_dir"] = serde_json::Value::String(root);
        value["data_dir_origin"] = serde_json::to_value(data_dir.origin())?;
        println!("{value}");
        return Ok(());
    }

    println!("Data directory: {root} (from {})", data_dir.origin());
    println!("Documents: {}", status.documents);
    println!("Cached vectors: {}", status.cached_vectors);
    println!(
        "Remote index: {}",
        status.remote_backend.unwrap_or("none")
    );
    println!("  mirrored: {}", status.mirrored);
    println!("  local-only: {}", status.local_only);
    println!("Upload policy: {:?}", status.upload_policy);
    println!("Dimension: {}", status.dimension);
    println!(
        "Models: nlp {}, tfidf {}, embedding {}",
        status.startup.models.pipeline,
        status.startup.models.tfidf,
        status.startup.models.embedding
    );
    Ok(())
}
