use std::{path::Path, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docsift::{
    cli::{AddArgs, Cli, Command, GetArgs, SearchArgs},
    config::{EngineConfig, RemoteConfig},
    corpus::{CorpusSource, DirectoryCorpus, StaticCorpus},
    data_dir::DataDir,
    engine::SearchEngine,
    error::{self, Error},
    mcp,
    output,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCSIFT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config = engine_config(&cli)?;
    let corpus = corpus_source(&cli);
    let remote_config = RemoteConfig::from_env_or_local();
    let engine = SearchEngine::open_data_dir(
        &data_dir,
        config,
        &remote_config,
        corpus.as_ref(),
    )?;

    match cli.command {
        Command::Search(args) => cmd_search(&engine, &args)?,
        Command::Add(args) => cmd_add(&engine, &args)?,
        Command::Remove { id } => {
            if !engine.remove_document(id)? {
                return Err(Error::NotFound {
                    kind: "document",
                    name: id.to_string(),
                });
            }
            println!("Removed document #{id}");
        }
        Command::List { json } => {
            output::format_documents(&engine.list()?, json)?;
        }
        Command::Get(args) => cmd_get(&engine, &args)?,
        Command::Status { json } => {
            output::format_status(&engine.status()?, &data_dir, json)?;
        }
        Command::Resync => {
            let count = engine.resync()?;
            println!("Mirrored {count} document(s) to the remote index");
        }
        Command::Retrain => {
            let count = engine.retrain()?;
            println!("Retrained models on {count} document(s)");
        }
        Command::Mcp => mcp::run_mcp(Arc::new(engine))?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn engine_config(cli: &Cli) -> error::Result<EngineConfig> {
    let mut config = EngineConfig::default();

    let stop_words = cli
        .stop_words
        .clone()
        .or_else(|| std::env::var_os("DOCSIFT_STOP_WORDS").map(Into::into));
    if let Some(path) = stop_words {
        config.load_stop_words(&path)?;
    }
    if let Some(policy) = cli.upload_policy {
        config.upload_policy = policy;
    }

    Ok(config)
}

fn corpus_source(cli: &Cli) -> Box<dyn CorpusSource> {
    let root = cli
        .corpus
        .clone()
        .or_else(|| std::env::var_os("DOCSIFT_CORPUS").map(Into::into));
    match root {
        Some(root) => Box::new(DirectoryCorpus::new(root)),
        None => Box::new(StaticCorpus::empty()),
    }
}

fn cmd_search(engine: &SearchEngine, args: &SearchArgs) -> error::Result<()> {
    let results = engine.search(&args.query, args.mode, args.count)?;
    if args.json {
        output::format_json(&results, &args.query, args.mode)?;
    } else {
        output::format_human(&results);
    }
    Ok(())
}

fn cmd_add(engine: &SearchEngine, args: &AddArgs) -> error::Result<()> {
    let text = std::fs::read_to_string(&args.path)?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => file_name(&args.path)?,
    };

    let document = engine.add_document(&name, &text)?;
    match &document.remote_id {
        Some(remote_id) => println!(
            "Added '{}' as #{} (remote {remote_id})",
            document.name, document.id
        ),
        None => println!("Added '{}' as #{}", document.name, document.id),
    }
    Ok(())
}

fn file_name(path: &Path) -> error::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::Validation(format!("'{}' has no file name", path.display()))
        })
}

fn cmd_get(engine: &SearchEngine, args: &GetArgs) -> error::Result<()> {
    let document = match args.reference.parse::<u64>() {
        Ok(id) => engine.get(id)?,
        Err(_) => None,
    };
    let document = match document {
        Some(document) => document,
        None => engine.document_by_name(&args.reference)?.ok_or_else(|| {
            Error::NotFound {
                kind: "document",
                name: args.reference.clone(),
            }
        })?,
    };

    output::format_document(&document, args.json)
}
