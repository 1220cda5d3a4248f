use clap::{ArgAction, Parser, Subcommand};
use docbridge_core::{
    BridgeConfig, EventBridge, Message, MessageStatus, ModelRegistry, ResponseCallback,
};
use docbridge_schema::SchemaRegistry;
use docbridge_store::{Document, MemoryDocumentStore};
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const MODELS_ENV: &str = "DOCBRIDGE_MODELS";

#[derive(Parser, Debug)]
#[command(name = "docbridge-cli")]
#[command(about = "Runs event messages through the document bridge")]
struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run(RunArgs),
    CheckModels(CheckModelsArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Models definition file; falls back to $DOCBRIDGE_MODELS.
    #[arg(long)]
    models: Option<PathBuf>,
    /// JSON-lines message file; reads stdin when omitted.
    #[arg(long)]
    messages: Option<PathBuf>,
    /// JSON object of `collection -> [documents]` loaded before processing.
    #[arg(long)]
    seed: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    concurrent: bool,
}

#[derive(clap::Args, Debug)]
struct CheckModelsArgs {
    #[arg(long)]
    models: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::CheckModels(args) => check_models_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run_command(args: RunArgs) -> Result<ExitCode, String> {
    let models_path = resolve_models_path(args.models)?;
    let definitions = read_json(&models_path)?;
    let store = match args.seed.as_deref() {
        Some(path) => seeded_store(path)?,
        None => MemoryDocumentStore::new(),
    };
    let config = BridgeConfig::new()
        .with_store(Arc::new(store))
        .with_model_definitions(&definitions)
        .map_err(|error| error.to_string())?;

    let messages = load_messages(args.messages.as_deref())?;
    let failures = Arc::new(AtomicUsize::new(0));
    let bound = EventBridge::new(config)
        .bind(Some(printing_callback(Arc::clone(&failures))))
        .map_err(|error| error.to_string())?;

    if args.concurrent {
        join_all(messages.into_iter().map(|message| bound.process(message))).await;
    } else {
        for message in messages {
            bound.process(message).await;
        }
    }

    if failures.load(Ordering::SeqCst) > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn check_models_command(args: CheckModelsArgs) -> Result<ExitCode, String> {
    let models_path = resolve_models_path(args.models)?;
    let definitions = read_json(&models_path)?;
    let schemas = SchemaRegistry::new();
    let registry =
        ModelRegistry::from_value(&definitions, &schemas).map_err(|error| error.to_string())?;

    for name in registry.names() {
        let Some(model) = registry.get(name) else {
            continue;
        };
        let actions = match &model.allowed_actions {
            Some(actions) => actions
                .iter()
                .map(|action| action.as_str())
                .collect::<Vec<_>>()
                .join(","),
            None => "all".to_string(),
        };
        println!(
            "model: {name} private={} schema={} actions={actions}",
            model.private,
            model.schema_id.as_deref().unwrap_or("<none>")
        );
    }
    let schema_ids = schemas.ids().map_err(|error| error.to_string())?;
    println!("schemas: {}", schema_ids.join(", "));
    Ok(ExitCode::SUCCESS)
}

fn printing_callback(failures: Arc<AtomicUsize>) -> ResponseCallback {
    Arc::new(move |response: Message| {
        if response.status == MessageStatus::Fail {
            failures.fetch_add(1, Ordering::SeqCst);
        }
        match serde_json::to_string(&response) {
            Ok(line) => println!("{line}"),
            Err(error) => eprintln!("error: failed encoding response: {error}"),
        }
    })
}

fn resolve_models_path(flag: Option<PathBuf>) -> Result<PathBuf, String> {
    match flag {
        Some(path) => Ok(path),
        None => std::env::var_os(MODELS_ENV)
            .map(PathBuf::from)
            .ok_or_else(|| format!("one of --models or ${MODELS_ENV} is required")),
    }
}

fn read_json(path: &Path) -> Result<Value, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed reading '{}': {e}", path.display()))?;
    serde_json::from_str(&source).map_err(|e| format!("invalid JSON in '{}': {e}", path.display()))
}

fn seeded_store(path: &Path) -> Result<MemoryDocumentStore, String> {
    let seed = read_json(path)?;
    let collections: BTreeMap<String, Vec<Document>> = serde_json::from_value(seed)
        .map_err(|e| format!("seed '{}' must map collections to documents: {e}", path.display()))?;
    Ok(MemoryDocumentStore::with_collections(collections))
}

fn load_messages(path: Option<&Path>) -> Result<Vec<Value>, String> {
    let source = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed reading messages '{}': {e}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("failed reading stdin: {e}"))?;
            buffer
        }
    };
    parse_message_lines(&source)
}

fn parse_message_lines(source: &str) -> Result<Vec<Value>, String> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| format!("invalid message on line {}: {e}", index + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_lines_skips_blank_lines() {
        let messages = parse_message_lines("{\"id\":1}\n\n  \n{\"id\":2}\n")
            .expect("lines should parse");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["id"], 2);
    }

    #[test]
    fn parse_message_lines_bad_json_expected_line_number() {
        let error = parse_message_lines("{\"id\":1}\nnot json\n").expect_err("bad line should fail");
        assert!(error.starts_with("invalid message on line 2"), "{error}");
    }
}
