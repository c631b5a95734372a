use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{config::UploadPolicy, ranking::SearchMode};

#[derive(Debug, Parser)]
#[command(
    name = "docsift",
    about = "Search a small document corpus with lexical, tf-idf, dense and remote-index ranking"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory of .txt/.md files loaded when the store is empty
    #[arg(long, global = true)]
    pub corpus: Option<PathBuf>,

    /// Stop-word file, one word per line
    #[arg(long, global = true)]
    pub stop_words: Option<PathBuf>,

    /// What a single upload does to the trained models
    #[arg(long, global = true, value_enum)]
    pub upload_policy: Option<UploadPolicy>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search the corpus
    Search(SearchArgs),
    /// Add a document from a file
    Add(AddArgs),
    /// Remove a document by id
    Remove {
        /// Document id
        id: u64,
    },
    /// List all documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a document by id or name
    Get(GetArgs),
    /// Show system status and statistics
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mirror local-only documents to the remote index
    Resync,
    /// Retrain all models on the current corpus
    Retrain,
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Ranking strategy
    #[arg(short, long, value_enum, default_value_t = SearchMode::Dense)]
    pub mode: SearchMode,

    /// Number of results to return (1-100, otherwise the default)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Add --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// File to read the document text from
    pub path: PathBuf,

    /// Document name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
}

// -- Get --

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// Document id, or a document name
    pub reference: String,

    /// Output as JSON with metadata
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docsift",
            &mut std::io::stdout(),
        );
    }
}
