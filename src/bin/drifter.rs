//! Drifter CLI
//!
//! Records dataset schemas and reports drift between runs.
//!
//! Usage:
//!   drifter register users schema.json
//!   cat schema.json | drifter register users -
//!   drifter history users
//!   drifter diff users 0 3
//!   drifter --help

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use drifter::{DrifterConfig, Schema, SchemaChanges, SchemaRegistry, SchemaSnapshot};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drifter")]
#[command(about = "Track schema drift across pipeline runs")]
struct Cli {
    /// Directory holding schema histories (overrides config)
    #[arg(short, long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Config file (default: drifter.toml, .drifter.toml, XDG config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a schema and report drift against the previous one
    Register {
        /// Dataset name
        name: String,
        /// JSON file with a column list, or "-" for stdin
        schema: PathBuf,
        /// Exit with status 2 when drift is detected
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Show the latest recorded schema
    Latest {
        /// Dataset name
        name: String,
    },

    /// Show every recorded schema, oldest first
    History {
        /// Dataset name
        name: String,
    },

    /// Compare two recorded versions
    Diff {
        /// Dataset name
        name: String,
        /// Older version index
        from: usize,
        /// Newer version index
        to: usize,
    },

    /// List tracked datasets
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = DrifterConfig::load_from(cli.config.as_deref())?;
    if let Some(dir) = cli.schema_dir {
        config.registry.schema_dir = dir;
    }
    let registry = SchemaRegistry::new(&config);

    match cli.command {
        Commands::Register {
            name,
            schema,
            fail_on_drift,
        } => {
            let schema = read_schema(&schema)?;
            let changes = registry.register(schema, &name)?;
            print_changes(&name, &changes, cli.format)?;

            if fail_on_drift && changes.has_changes() {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::Latest { name } => {
            let Some(snapshot) = registry.latest(&name)? else {
                return Err(unknown_dataset(&registry, &name));
            };
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                Format::Text => print_snapshot(&snapshot),
            }
        }

        Commands::History { name } => {
            let history = registry.history(&name)?;
            if history.is_empty() {
                return Err(unknown_dataset(&registry, &name));
            }
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                Format::Text => {
                    println!("📚 {} ({} versions)", name, history.len());
                    for snapshot in &history {
                        print_snapshot(snapshot);
                    }
                }
            }
        }

        Commands::Diff { name, from, to } => {
            let changes = registry.diff_versions(&name, from, to)?;
            print_changes(&name, &changes, cli.format)?;
        }

        Commands::List => {
            let names = registry.datasets()?;
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                Format::Text if names.is_empty() => println!("No datasets registered yet."),
                Format::Text => {
                    for name in names {
                        println!("{}", name);
                    }
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_schema(path: &Path) -> anyhow::Result<Schema> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&content)
        .with_context(|| format!("parsing schema from {}", path.display()))
}

fn print_changes(name: &str, changes: &SchemaChanges, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(changes)?),
        Format::Text if changes.is_empty() => println!("✅ {}: no drift", name),
        Format::Text => {
            println!("⚠️  {}: {} changes", name, changes.len());
            println!("{}", changes);
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &SchemaSnapshot) {
    println!(
        "v{}  {}",
        snapshot.version(),
        snapshot.timestamp().format("%Y-%m-%d %H:%M:%S")
    );
    for column in snapshot.schema().columns() {
        let null = if column.nullable { "" } else { " not null" };
        println!("  {}: {}{}", column.name, column.data_type, null);
    }
}

/// Error for a dataset without history, with close matches among the tracked ones
fn unknown_dataset(registry: &SchemaRegistry, name: &str) -> anyhow::Error {
    let candidates = match registry.datasets() {
        Ok(candidates) => candidates,
        Err(e) => return e.into(),
    };

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, String)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(&candidate, name)
                .map(|score| (score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    if scored.is_empty() {
        return anyhow!("no history for dataset '{}'", name);
    }
    let suggestions: Vec<String> = scored.into_iter().take(3).map(|(_, n)| n).collect();
    anyhow!(
        "no history for dataset '{}' (did you mean: {}?)",
        name,
        suggestions.join(", ")
    )
}
