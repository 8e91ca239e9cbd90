//! Binary entrypoint for the `dialogue` CLI.
//!
//! Commands:
//! - `validate [nodes.json]` - check an engine JSON file, or the store when no file is given
//! - `export <out.json>` - flatten the store, validate, write engine JSON
//! - `import <file>` - load interactions from a script (or engine JSON) into the store
//! - `render <id>` - print one interaction as script text
//! - `path <id> [--depth N]` - print the reconstructed path leading to an interaction
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use dialogue_graph::codec::json::{self, NodeSchema};
use dialogue_graph::codec::script;
use dialogue_graph::{EngineConfig, FileStore, GraphError, InteractionService, ValidationResult};

#[derive(Parser)]
#[command(name = "dialogue")]
#[command(about = "Validate, import and export branching dialogue graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (missing file means defaults)
    #[arg(short, long, default_value = "dialogue.toml", global = true)]
    config: PathBuf,

    /// Interaction directory, overriding `storage.data_dir`
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an engine JSON file, or the stored graph
    Validate {
        /// Engine JSON node array
        nodes: Option<PathBuf>,
    },
    /// Export the stored graph as engine JSON
    Export {
        /// Output file
        out: PathBuf,
    },
    /// Import interactions from a script or engine JSON file
    Import {
        /// Script file, or a `.json` node array
        file: PathBuf,
    },
    /// Print an interaction as script text
    Render {
        /// Interaction id
        id: String,
    },
    /// Print the path that leads to an interaction
    Path {
        /// Interaction id
        id: String,
        /// Maximum backward steps (defaults to `paths.max_depth`)
        #[arg(short, long)]
        depth: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Validate { nodes: Some(file) } => {
            let nodes = json::from_file(&file).with_context(|| format!("reading {}", file.display()))?;
            let result = json::validate_nodes_with(&nodes, &NodeSchema::from_config(&config.export));
            report(&result, nodes.len())
        }
        Commands::Validate { nodes: None } => {
            let service = open_service(config)?;
            let result = service.validate()?;
            report(&result, service.list_all()?.len())
        }
        Commands::Export { out } => {
            let service = open_service(config)?;
            match service.export_json(&out) {
                Ok(count) => {
                    println!("Exported {} nodes to {}", count, out.display());
                    Ok(())
                }
                Err(GraphError::InvalidExport { errors }) => {
                    for issue in &errors {
                        eprintln!("error: {}", issue);
                    }
                    bail!("export refused: {} validation error(s)", errors.len())
                }
                Err(err) => Err(anyhow::Error::from(err).context(format!("exporting to {}", out.display()))),
            }
        }
        Commands::Import { file } => {
            let mut service = open_service(config)?;
            let interactions = read_interactions(&file)?;
            if interactions.is_empty() {
                bail!("no interactions found in {}", file.display());
            }
            for interaction in &interactions {
                service.save(interaction)?;
            }
            println!("Imported {} interactions from {}", interactions.len(), file.display());
            Ok(())
        }
        Commands::Render { id } => {
            let service = open_service(config)?;
            let interaction = service.get(&id)?.ok_or(GraphError::NotFound(id))?;
            print!("{}", script::render(&interaction));
            Ok(())
        }
        Commands::Path { id, depth } => {
            let service = open_service(config)?;
            let depth = depth.unwrap_or(service.config().paths.max_depth);
            let path = service.get_dialogue_path(&id, depth)?;
            if path.is_empty() {
                return Err(GraphError::NotFound(id).into());
            }

            println!("{}", path[0].id);
            for pair in path.windows(2) {
                let via = service
                    .get_choice_text_for_transition(&pair[0].id, &pair[1].id)?
                    .map(|text| format!("\"{}\"", text))
                    .unwrap_or_else(|| "(continue)".to_string());
                println!("  -> {} via {}", pair[1].id, via);
            }
            Ok(())
        }
    }
}

fn open_service(config: EngineConfig) -> Result<InteractionService<FileStore>> {
    let dir = config.storage.data_dir.clone();
    let store = FileStore::open(&dir).with_context(|| format!("opening store {}", dir.display()))?;
    let service = InteractionService::with_config(store, config)?;
    info!("opened store {}", dir.display());
    Ok(service)
}

fn read_interactions(file: &Path) -> Result<Vec<dialogue_model::Interaction>> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    if file.extension().and_then(|ext| ext.to_str()) == Some("json") {
        Ok(json::from_nodes(&json::from_str(&content)?))
    } else {
        Ok(script::parse_all(&content))
    }
}

fn report(result: &ValidationResult, node_count: usize) -> Result<()> {
    for issue in &result.errors {
        println!("error: {}", issue);
    }
    for issue in &result.warnings {
        println!("warning: {}", issue);
    }
    println!(
        "{} nodes: {} errors, {} warnings",
        node_count,
        result.errors.len(),
        result.warnings.len()
    );
    if !result.is_valid() {
        bail!("graph is invalid");
    }
    Ok(())
}

fn init_logging(config: &EngineConfig, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.logging.level);
    match verbosity {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
        }
    }
    builder.parse_env("RUST_LOG");
    builder.init();
}
