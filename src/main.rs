//! CLI interface for the face match engine

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use facematch::{
    import_directory, load_config, ClassificationResult, Embedding, EmbeddingExtractor,
    EmbeddingStore, FileEmbeddingStore, FlatIndex, IndexKind, JsonEmbeddingExtractor, KdTree,
    KnownSet, MatchEngine, NearestNeighborIndex,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "facematch")]
#[command(about = "Classify faces as known or wild against an enrolled set", long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./facematch.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the embedding store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Nearest-neighbor index to build
    #[arg(long, value_enum, global = true)]
    index: Option<IndexType>,

    /// Match threshold; distances strictly below it are a match
    #[arg(long, global = true)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum IndexType {
    KdTree,
    Flat,
}

impl From<IndexType> for IndexKind {
    fn from(index: IndexType) -> Self {
        match index {
            IndexType::KdTree => IndexKind::KdTree,
            IndexType::Flat => IndexKind::Flat,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty embedding store
    Init {
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },
    /// Seed the store from a directory of embedding files, one per identity
    Import {
        /// Directory of JSON embedding files; each file stem is a label
        dir: PathBuf,
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Engine(EngineCommand),
}

/// Commands that run against an opened engine.
#[derive(Subcommand)]
enum EngineCommand {
    /// Enroll a face under a label
    Enroll {
        /// Identity label
        label: String,
        /// Embedding as comma-separated values (e.g., "0.1,0.2,0.3")
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        vector: Option<String>,
        /// JSON embedding file; its first face is enrolled
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Classify one or more faces as "wild" or "not wild"
    Classify {
        /// Face embedding as comma-separated values; repeat for several faces
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        vector: Vec<String>,
        /// JSON embedding file with every face found in an image
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the closest enrolled faces regardless of threshold
    Search {
        /// Query embedding as comma-separated values
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        vector: Option<String>,
        /// JSON embedding file; its first face is the query
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Number of results to return
        #[arg(short, long, default_value = "5")]
        k: usize,
    },
    /// List enrolled labels
    List,
}

fn read_faces(
    extractor: &JsonEmbeddingExtractor,
    vectors: &[String],
    file: Option<&Path>,
) -> Result<Vec<Embedding>> {
    match file {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(extractor.extract(&bytes)?)
        }
        None => vectors
            .iter()
            .map(|v| Embedding::from_str(v).map_err(Into::into))
            .collect(),
    }
}

fn first_face(
    extractor: &JsonEmbeddingExtractor,
    vector: Option<String>,
    file: Option<&Path>,
) -> Result<Embedding> {
    let vectors: Vec<String> = vector.into_iter().collect();
    read_faces(extractor, &vectors, file)?
        .into_iter()
        .next()
        .context("no face found in input")
}

fn print_classification(result: &ClassificationResult, json: bool) -> Result<()> {
    if json {
        let details = serde_json::to_value(result)?;
        let report = serde_json::json!({
            "status": result.status(),
            "message": result.message(),
            "result": details,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{}", result.status());
    println!("{}", result.message());
    if let ClassificationResult::NotWild { distance, .. } = result {
        println!("distance: {:.4}", distance);
    }
    Ok(())
}

fn run<I: NearestNeighborIndex>(
    engine: MatchEngine<FileEmbeddingStore, I>,
    extractor: &JsonEmbeddingExtractor,
    command: EngineCommand,
) -> Result<()> {
    match command {
        EngineCommand::Enroll {
            label,
            vector,
            file,
        } => {
            let face = first_face(extractor, vector, file.as_deref())?;
            let result = engine.enroll(&label, face)?;
            println!("{}", result.message());
        }
        EngineCommand::Classify { vector, file, json } => {
            let faces = read_faces(extractor, &vector, file.as_deref())?;
            let result = engine.classify(&faces)?;
            print_classification(&result, json)?;
        }
        EngineCommand::Search { vector, file, k } => {
            let query = first_face(extractor, vector, file.as_deref())?;
            let hits = engine.search(&query, k)?;

            if hits.is_empty() {
                println!("No results found (no known faces)");
            } else {
                println!("Top {} results:", hits.len());
                for (i, hit) in hits.iter().enumerate() {
                    let marker = if hit.is_match { " *" } else { "" };
                    println!(
                        "{}. {} (distance: {:.4}){}",
                        i + 1,
                        hit.identity,
                        hit.distance,
                        marker
                    );
                }
            }
        }
        EngineCommand::List => {
            let labels = engine.labels()?;
            if labels.is_empty() {
                println!("No known faces");
            } else {
                println!("Known faces ({} total):", labels.len());
                for label in labels {
                    println!("  - {}", label);
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(index) = cli.index {
        config.index = index.into();
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    config.validate()?;

    let store = FileEmbeddingStore::new(&config.data_dir);
    let extractor = match config.dimension {
        Some(dimension) => JsonEmbeddingExtractor::with_dimension(dimension),
        None => JsonEmbeddingExtractor::new(),
    };

    // Store setup commands never open the engine.
    let command = match cli.command {
        Commands::Init { force } => {
            if store.exists() && !force {
                bail!(
                    "a store already exists in {} (use --force to replace it)",
                    store.dir().display()
                );
            }
            store.save(&KnownSet::new())?;
            println!("Initialized empty store in {}", store.dir().display());
            return Ok(());
        }
        Commands::Import { dir, force } => {
            if store.exists() && !force {
                bail!(
                    "a store already exists in {} (use --force to replace it)",
                    store.dir().display()
                );
            }
            let report = import_directory(&dir, &extractor, config.duplicate_policy)?;
            store.save(&report.known)?;
            info!(data_dir = %store.dir().display(), "store seeded");

            println!(
                "Imported {} known faces ({} skipped)",
                report.known.len(),
                report.skipped.len()
            );
            for (path, reason) in &report.skipped {
                println!("  - {}: {}", path.display(), reason);
            }
            return Ok(());
        }
        Commands::Engine(command) => command,
    };

    let match_config = config.match_config();
    match config.index {
        IndexKind::KdTree => {
            let engine = MatchEngine::<_, KdTree>::open(store, match_config)
                .context("opening store (run `facematch init` first?)")?;
            run(engine, &extractor, command)
        }
        IndexKind::Flat => {
            let engine = MatchEngine::<_, FlatIndex>::open(store, match_config)
                .context("opening store (run `facematch init` first?)")?;
            run(engine, &extractor, command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_setup_and_engine_commands_are_distinct() {
        let cli = Cli::try_parse_from(["facematch", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { force: true }));

        let cli = Cli::try_parse_from(["facematch", "import", "faces"]).unwrap();
        assert!(matches!(cli.command, Commands::Import { force: false, .. }));

        let cli = Cli::try_parse_from([
            "facematch",
            "--index",
            "flat",
            "classify",
            "--vector",
            "0.1,0.2",
            "--vector",
            "0.3,0.4",
        ])
        .unwrap();
        match cli.command {
            Commands::Engine(EngineCommand::Classify { vector, file, json }) => {
                assert_eq!(vector.len(), 2);
                assert!(file.is_none());
                assert!(!json);
            }
            _ => panic!("classify should parse as an engine command"),
        }
        assert!(matches!(cli.index, Some(IndexType::Flat)));

        let cli = Cli::try_parse_from(["facematch", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::Engine(EngineCommand::List)));
    }

    #[test]
    fn test_face_input_is_required_once() {
        assert!(Cli::try_parse_from(["facematch", "enroll", "alice"]).is_err());
        assert!(Cli::try_parse_from([
            "facematch", "enroll", "alice", "--vector", "1,2", "--file", "a.json"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["facematch", "search", "-f", "q.json", "-k", "3"]).is_ok());
    }
}
