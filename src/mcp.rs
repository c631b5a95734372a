use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    document::Document,
    engine::SearchEngine,
    error::{self, Error},
    ranking::SearchMode,
    text_util::{add_line_numbers, extract_snippet},
};

#[derive(Clone)]
pub struct DocsiftMcpServer {
    engine: Arc<SearchEngine>,
    tool_router: ToolRouter<Self>,
}

impl DocsiftMcpServer {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    /// Run `f` against the engine on the blocking pool. The engine does
    /// synchronous I/O, including HTTP calls to a remote index.
    async fn with_engine<T, F>(
        &self,
        action: &str,
        f: F,
    ) -> Result<T, rmcp::ErrorData>
    where
        T: Send + 'static,
        F: FnOnce(&SearchEngine) -> error::Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| mcp_error("engine task failed", e))?
            .map_err(|e| engine_error(action, e))
    }
}

#[tool_router(router = tool_router)]
impl DocsiftMcpServer {
    #[tool(
        name = "docsift_search",
        description = "Search documents. Modes: lexical (substring), tfidf, dense (default), bm25 and knn (remote index)."
    )]
    pub async fn docsift_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let mode = params.mode.unwrap_or_default();
        let query = params.query.clone();
        let limit = params.limit;

        let results = self
            .with_engine("search failed", move |engine| {
                engine.search(&query, mode, limit)
            })
            .await?;

        let include_snippet = params.include_snippet.unwrap_or(true);
        let items: Vec<SearchResultItem> = results
            .into_iter()
            .map(|r| {
                let snippet = if include_snippet {
                    extract_snippet(&r.document.text, &params.query).map(
                        |(snippet, start_line)| {
                            add_line_numbers(&snippet, start_line)
                        },
                    )
                } else {
                    None
                };
                SearchResultItem {
                    id: r.document.id,
                    name: r.document.name,
                    remote_id: r.document.remote_id,
                    score: r.score,
                    snippet,
                }
            })
            .collect();

        let summary = format_search_summary(&items, &params.query);
        let structured = serde_json::to_value(SearchResponse {
            query: params.query,
            mode,
            result_count: items.len(),
            results: items,
        })
        .map_err(|e| mcp_error("failed to serialize search results", e))?;

        Ok(structured_result(summary, structured))
    }

    #[tool(
        name = "docsift_get",
        description = "Fetch the text of a document by numeric id or by name."
    )]
    pub async fn docsift_get(
        &self,
        params: Parameters<GetParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let reference = params.reference.clone();

        let document = self
            .with_engine("lookup failed", move |engine| {
                if let Ok(id) = reference.parse::<u64>()
                    && let Some(document) = engine.get(id)?
                {
                    return Ok(Some(document));
                }
                engine.document_by_name(&reference)
            })
            .await?
            .ok_or_else(|| {
                rmcp::ErrorData::invalid_params(
                    format!("document not found: {}", params.reference),
                    None,
                )
            })?;

        let text = if params.line_numbers.unwrap_or(false) {
            add_line_numbers(&document.text, 1)
        } else {
            document.text.clone()
        };
        let structured = serde_json::to_value(DocumentItem::from(&document))
            .map_err(|e| mcp_error("failed to serialize document", e))?;

        Ok(structured_result(text, structured))
    }

    #[tool(
        name = "docsift_add",
        description = "Add a document. Adding the same name and text again returns the stored document."
    )]
    pub async fn docsift_add(
        &self,
        params: Parameters<AddParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let AddParams { name, text } = params.0;

        let document = self
            .with_engine("add failed", move |engine| {
                engine.add_document(&name, &text)
            })
            .await?;

        let summary = format!("Added '{}' as #{}", document.name, document.id);
        let structured = serde_json::to_value(DocumentItem::from(&document))
            .map_err(|e| mcp_error("failed to serialize document", e))?;

        Ok(structured_result(summary, structured))
    }

    #[tool(
        name = "docsift_remove",
        description = "Remove a document by id from the store, the vector cache and the remote index."
    )]
    pub async fn docsift_remove(
        &self,
        params: Parameters<RemoveParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let id = params.0.id;

        let removed = self
            .with_engine("remove failed", move |engine| {
                engine.remove_document(id)
            })
            .await?;

        let summary = if removed {
            format!("Removed document #{id}")
        } else {
            format!("No document #{id}")
        };
        Ok(structured_result(
            summary,
            json!({ "id": id, "removed": removed }),
        ))
    }

    #[tool(
        name = "docsift_list",
        description = "List every stored document with its id, name and remote id."
    )]
    pub async fn docsift_list(
        &self,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let documents = self
            .with_engine("list failed", |engine| engine.list())
            .await?;

        let items: Vec<DocumentItem> =
            documents.iter().map(DocumentItem::from).collect();
        let summary = items
            .iter()
            .map(|d| format!("#{} {}", d.id, d.name))
            .collect::<Vec<_>>()
            .join("\n");
        let structured = serde_json::to_value(&items)
            .map_err(|e| mcp_error("failed to serialize documents", e))?;

        Ok(structured_result(
            summary,
            json!({ "documentCount": items.len(), "documents": structured }),
        ))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for DocsiftMcpServer {
    fn get_info(&self) -> ServerInfo {
        let server_info =
            Implementation::new("docsift", env!("CARGO_PKG_VERSION"))
                .with_title("docsift MCP");
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(server_info)
            .with_instructions(
                "Use docsift_search to find documents. Dense mode ranks by \
                 meaning, lexical mode by exact substring.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Search query string.
    pub query: String,
    /// Ranking strategy (default: dense).
    pub mode: Option<SearchMode>,
    /// Maximum number of results, 1 to 100 (default: 5).
    pub limit: Option<usize>,
    /// Include a snippet preview (default: true).
    pub include_snippet: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    /// Document id or name.
    pub reference: String,
    /// Prefix each line with its number.
    pub line_numbers: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddParams {
    /// Unique document name.
    pub name: String,
    /// Document text.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RemoveParams {
    /// Document id.
    pub id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    query: String,
    mode: SearchMode,
    result_count: usize,
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultItem {
    id: u64,
    name: String,
    remote_id: Option<String>,
    score: f32,
    snippet: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentItem {
    id: u64,
    name: String,
    remote_id: Option<String>,
}

impl From<&Document> for DocumentItem {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            name: document.name.clone(),
            remote_id: document.remote_id.clone(),
        }
    }
}

fn structured_result(
    summary: String,
    structured: serde_json::Value,
) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(summary)]);
    result.structured_content = Some(structured);
    result
}

fn format_search_summary(results: &[SearchResultItem], query: &str) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut lines = Vec::with_capacity(results.len() + 1);
    let suffix = if results.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} result{} for \"{query}\":",
        results.len(),
        suffix
    ));

    for item in results {
        lines.push(format!("#{} {:.3} {}", item.id, item.score, item.name));
    }

    lines.join("\n")
}

fn engine_error(action: &str, error: Error) -> rmcp::ErrorData {
    match error {
        Error::Validation(_) | Error::NotFound { .. } => {
            rmcp::ErrorData::invalid_params(error.to_string(), None)
        }
        other => mcp_error(action, other),
    }
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

/// Serve the engine over MCP on stdio until the client disconnects.
pub fn run_mcp(engine: Arc<SearchEngine>) -> error::Result<()> {
    let server = DocsiftMcpServer::new(Arc::clone(&engine));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    let served = runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            Error::Config(format!("MCP server initialization failed: {e}"))
        })?;
        running
            .waiting()
            .await
            .map_err(|e| Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    });

    // The engine may own a blocking HTTP client, which must not be dropped
    // on a runtime thread.
    drop(runtime);
    drop(engine);
    served
}
