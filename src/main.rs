use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rankface::config;
use rankface::dataset;
use rankface::pipeline::{MethodSelection, Pipeline, ProtocolSelection};
use rankface::storage::DirectoryStore;
use rankface::ComparisonMethod;
use rankface_engine::StandardizationMethod;

#[derive(Parser)]
#[command(name = "rankface")]
#[command(
    version,
    about = "Cohort-based face comparison: rank-list and standardization similarity benchmark"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate comparison methods over distance protocols
    Run {
        /// Comparison method, or `all`
        #[arg(short = 'c', long, default_value = "all")]
        method: MethodSelection,
        /// Distance protocol (close, medium, far), or `all`
        #[arg(short, long, default_value = "all")]
        protocol: ProtocolSelection,
        /// Write per-pair scores and the rates table to the output directory
        #[arg(short, long)]
        record_output: bool,
        /// Standardization applied to cohort distances
        #[arg(short, long)]
        standardization: Option<StandardizationMethod>,
        /// Config file (defaults to the compiled-in path)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the available comparison methods
    Methods,
    /// Import a JSON map of feature vectors into the feature store
    Import {
        /// JSON file of the form {"key": [number, ...]}, stored as f64
        #[arg(short, long)]
        input: PathBuf,
        /// Config file (defaults to the compiled-in path)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            method,
            protocol,
            record_output,
            standardization,
            config: config_file,
        } => {
            let mut cfg = config::load_config(config_file.as_deref())?;
            if record_output {
                cfg.record_output = true;
            }
            if let Some(s) = standardization {
                cfg.standardization = s;
            }
            run(&cfg, &method.0, &protocol.0)
        }
        Commands::Methods => {
            for m in ComparisonMethod::ALL {
                println!("{:<20} {}", m.as_str(), m.category());
            }
            Ok(())
        }
        Commands::Import {
            input,
            config: config_file,
        } => {
            let cfg = config::load_config(config_file.as_deref())?;
            import(&cfg, &input)
        }
        Commands::Config => open_config(),
    }
}

fn run(
    cfg: &config::Config,
    methods: &[ComparisonMethod],
    protocols: &[rankface::Protocol],
) -> Result<()> {
    let manifest = dataset::load_manifest(&cfg.manifest).context("Failed to load dataset")?;
    let store = DirectoryStore::new(&cfg.features_dir);
    info!(
        "{} sample(s) in manifest, features from {}",
        manifest.samples.len(),
        store.root().display()
    );

    let pipeline = Pipeline::new(cfg, &manifest, &store)?;
    let results = pipeline.run(methods, protocols)?;

    if cfg.record_output {
        info!("Results written to {}", cfg.output_dir.display());
    }
    info!("✓ {} run(s) completed", results.len());
    Ok(())
}

fn import(cfg: &config::Config, input: &std::path::Path) -> Result<()> {
    let store = DirectoryStore::new(&cfg.features_dir);
    let count = store
        .import_json(input)
        .context("Failed to import feature vectors")?;
    info!(
        "✓ Imported {} feature vector(s) into {}",
        count,
        store.root().display()
    );
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = *config::CONFIG_PATH;
    if !config_path.exists() {
        config::save_config(&config::Config::default(), None)
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
