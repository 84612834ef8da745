//! TestForge synthesis CLI
//!
//! # Usage
//!
//! ```bash
//! # Synthesize inputs for one function, full coverage
//! testforge-synth synth --unit build/ast/motor.json --function clamp_speed
//!
//! # Every function, 80% coverage, thorough preset
//! testforge-synth synth --unit motor.json --target 0.8 --preset thorough
//!
//! # Complexity and call graph summary
//! testforge-synth analyze --unit motor.json --function clamp_speed
//! ```
//!
//! Logging follows `RUST_LOG` (default `info`) and goes to stderr; reports
//! are JSON on stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testforge_core::adapters::{AstProvider, JsonAstProvider, TranslationUnit};
use testforge_core::config::{EngineConfig, Preset};
use testforge_core::{AnalysisSession, EngineError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "testforge-synth")]
#[command(about = "Constraint-based test input synthesis for C functions", long_about = None)]
struct Cli {
    /// Engine configuration (YAML); overrides the preset
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// fast | balanced | thorough
    #[arg(short, long, global = true, default_value = "balanced")]
    preset: String,

    /// Persisted typedef mappings (JSON) to load before analysis
    #[arg(long, global = true)]
    typedefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize test inputs
    Synth {
        /// Serialized translation unit (JSON)
        #[arg(short, long)]
        unit: PathBuf,

        /// Function to synthesize for (all functions when omitted)
        #[arg(short, long)]
        function: Option<String>,

        /// Target coverage in (0, 1]
        #[arg(short, long)]
        target: Option<f64>,
    },

    /// Complexity, branches and call graph of one function
    Analyze {
        #[arg(short, long)]
        unit: PathBuf,

        #[arg(short, long)]
        function: String,
    },

    /// Report entity model issues
    Validate {
        #[arg(short, long)]
        unit: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), EngineError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml(path)?,
        None => EngineConfig::preset(Preset::from_str(&cli.preset)?),
    };

    let unit_path = match &cli.command {
        Commands::Synth { unit, .. } | Commands::Analyze { unit, .. } | Commands::Validate { unit } => unit,
    };
    let unit = load(unit_path).await?;
    let session = AnalysisSession::open(unit, config)?;
    if let Some(path) = &cli.typedefs {
        session.registry().load_json(path)?;
    }

    match cli.command {
        Commands::Synth { function, target, .. } => match function {
            Some(name) => print(&session.synthesize_for_coverage(&name, target)?)?,
            None => {
                let reports: Vec<_> = session
                    .synthesize_all(target)
                    .into_iter()
                    .collect::<Result<_, _>>()?;
                print(&reports)?;
            }
        },
        Commands::Analyze { function, .. } => {
            let analysis = session.analyze_function(&function)?;
            let call_graph = session.build_call_graph(&function, None)?;
            print(&serde_json::json!({
                "function": function,
                "complexity": analysis.complexity,
                "branches": analysis.branches,
                "parameters": analysis.parameters,
                "paths": analysis.paths.len(),
                "call_graph": call_graph.summary(),
            }))?;
        }
        Commands::Validate { .. } => print(&session.validate())?,
    }
    Ok(())
}

async fn load(path: &PathBuf) -> Result<TranslationUnit, EngineError> {
    let provider = JsonAstProvider::new(path.parent().map(PathBuf::from).unwrap_or_default());
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .ok_or_else(|| EngineError::source_not_found(path.display().to_string()))?;
    provider.load(&file).await
}

fn print<T: serde::Serialize>(value: &T) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
