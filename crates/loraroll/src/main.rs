//! loraroll - Random LoRA selection and prompt injection

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loraroll_core::{LoraStore, RollConfig, RollRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loraroll",
    version,
    about = "Random LoRA selection and prompt injection",
    long_about = "Picks a random LoRA from a folder of model files and injects its\n\
                  reference token and activation text into a generation prompt.\n\
                  \n\
                  Folders are labelled relative to the parent of the LoRA root, so a\n\
                  tree at models/Lora yields labels like 'Lora' and 'Lora/style'.\n\
                  Selecting a parent folder draws from its whole subtree.\n\
                  \n\
                  Examples:\n\
                    loraroll folders                          # List selectable folders\n\
                    loraroll cache Lora/style                 # Build the folder cache\n\
                    loraroll cache Lora/style --force         # Force a recache\n\
                    loraroll pick Lora/style --seed 42        # Reproducible pick\n\
                    loraroll inject Lora/style \\\n\
                      --prompt \"masterpiece, scenery\" --seed 42\n\
                    loraroll clear-cache                      # Drop all cache files\n\
                  \n\
                  Environment Variables:\n\
                    LORAROLL_DIR                              # Override the LoRA root\n\
                    LORAROLL_CACHE_DIR                        # Override the cache directory\n\
                    LORAROLL_NO_COLOR                         # Disable ANSI colors"
)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Path to the config file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the LoRA model tree
    #[arg(long, env = "LORAROLL_DIR")]
    lora_dir: Option<PathBuf>,

    /// Directory for per-folder cache files
    #[arg(long, env = "LORAROLL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "LORAROLL_NO_COLOR")]
    no_color: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// List selectable folders with file counts
    Folders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build or refresh the cache for a folder
    Cache {
        /// Folder label (see `loraroll folders`)
        folder: String,
        /// Rebuild even when a cache file exists
        #[arg(long)]
        force: bool,
    },
    /// Delete all cache files and exit
    ClearCache,
    /// Pick one random LoRA from a folder
    Pick {
        /// Folder label (see `loraroll folders`)
        folder: String,
        /// Generation seed for a reproducible pick
        #[arg(long, short = 's')]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inject a random LoRA into a prompt
    Inject {
        /// Folder label (see `loraroll folders`)
        folder: String,
        /// Positive prompt to mutate
        #[arg(long, short = 'p', default_value = "")]
        prompt: String,
        /// Negative prompt to mutate
        #[arg(long, short = 'n', default_value = "")]
        negative: String,
        /// Generation seed for a reproducible pick
        #[arg(long, short = 's')]
        seed: Option<u64>,
        /// Weight override (0 = sidecar preferred weight, then default multiplier)
        #[arg(long, short = 'w')]
        weight: Option<f64>,
        /// Prompts to produce (batch size × iterations)
        #[arg(long, default_value = "1")]
        count: usize,
        /// Print the chosen LoRA name alongside the prompt
        #[arg(long)]
        show_name: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print configuration and cache status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.mode {
        Mode::Folders { json } => run_folders(config, json, cli.no_color),
        Mode::Cache { folder, force } => run_cache(config, &folder, force),
        Mode::ClearCache => run_clear_cache(config),
        Mode::Pick { folder, seed, json } => run_pick(config, &folder, seed, json),
        Mode::Inject {
            folder,
            prompt,
            negative,
            seed,
            weight,
            count,
            show_name,
            json,
        } => run_inject(
            config, &folder, prompt, negative, seed, weight, count, show_name, json,
        ),
        Mode::Status => run_status(config),
    }
}

/// Load the config file and apply CLI overrides
fn load_config(cli: &Cli) -> Result<RollConfig> {
    let mut config = match &cli.config {
        Some(path) => RollConfig::load(path),
        None => RollConfig::load_default(),
    };

    if let Some(ref dir) = cli.lora_dir {
        config.lora_dir = dir.clone();
    }
    if let Some(ref dir) = cli.cache_dir {
        config.cache_dir = dir.clone();
    }

    Ok(config)
}

fn run_folders(config: RollConfig, json: bool, no_color: bool) -> Result<()> {
    let (store, report) = LoraStore::new(config);

    if store.folders().is_empty() {
        if !json {
            eprintln!("No LoRA folders found under {}", store.config().lora_dir.display());
            for error in report.warnings() {
                eprintln!("  - {}: {}", error.source, error.message);
            }
        } else {
            println!("[]");
        }
        return Ok(());
    }

    println!("{}", cli::format_folder_table(&store, json, no_color));
    Ok(())
}

fn run_cache(config: RollConfig, folder: &str, force: bool) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let (store, _) = LoraStore::new(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(format!("Caching {}...", folder));

    let outcome = match store.populate(folder, force) {
        Ok(outcome) => {
            spinner.finish_and_clear();
            outcome
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    println!("{}", store.status());

    let (warnings, errors) = outcome.report.error_count();
    if warnings + errors > 0 {
        println!();
        println!("Warnings:");
        for error in outcome.report.errors.iter() {
            println!("  - {}: {}", error.source, error.message);
        }
    }
    if outcome.report.skipped_no_activation > 0 {
        println!(
            "Skipped {} files without activation text",
            outcome.report.skipped_no_activation
        );
    }

    Ok(())
}

fn run_clear_cache(config: RollConfig) -> Result<()> {
    let cache_dir = config.cache_dir.clone();
    let (store, _) = LoraStore::new(config);

    let outcome = store.cache().clear().context("Failed to clear cache")?;

    if outcome.files_removed == 0 {
        println!("No cache files found under {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache cleared");
    println!("  Location: {}", cache_dir.display());
    println!(
        "  Removed:  {} files ({})",
        outcome.files_removed,
        cli::format_size(outcome.bytes_freed)
    );
    Ok(())
}

fn run_pick(config: RollConfig, folder: &str, seed: Option<u64>, json: bool) -> Result<()> {
    let (store, _) = LoraStore::new(config);

    let request = RollRequest {
        seed,
        ..Default::default()
    };
    let outcome = store.roll(folder, &request).map_err(cli::CliError::from)?;

    match outcome {
        Some(rolled) => {
            println!("{}", cli::format_entry(&rolled.entry, json));
            Ok(())
        }
        None => Err(cli::CliError::NoLoraFound {
            folder: folder.to_string(),
        }
        .into()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_inject(
    config: RollConfig,
    folder: &str,
    prompt: String,
    negative: String,
    seed: Option<u64>,
    weight: Option<f64>,
    count: usize,
    show_name: bool,
    json: bool,
) -> Result<()> {
    let show_name = show_name || config.show_lora_name;
    let (store, _) = LoraStore::new(config);

    let request = RollRequest {
        prompt: prompt.clone(),
        negative_prompt: negative.clone(),
        seed,
        weight_override: weight,
        batch_count: count,
    };

    match store.roll(folder, &request)? {
        Some(outcome) => {
            println!("{}", cli::format_outcome(&outcome, show_name, json));
        }
        None => {
            // No LoRA found: the run proceeds with its prompt untouched
            eprintln!(
                "No valid LoRA files found in cache for folder: {}",
                folder
            );
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "batches": [{ "prompt": prompt, "negative_prompt": negative }]
                    })
                );
            } else {
                println!("{}", prompt);
            }
        }
    }

    Ok(())
}

fn run_status(config: RollConfig) -> Result<()> {
    let (store, report) = LoraStore::new(config);
    let config = store.config();

    println!("loraroll - Status");
    println!("=================");
    println!();
    println!("LoRA root:        {}", config.lora_dir.display());
    println!("Cache dir:        {}", config.cache_dir.display());
    println!("Folders indexed:  {}", store.folders().len());
    println!("Files indexed:    {}", report.files_seen);
    println!("Weight override:  {}", config.weight_override);
    println!("Default weight:   {}", config.default_multiplier);
    println!("Strict mode:      {}", config.require_activation_text);
    println!();
    println!("Store status:     {}", store.status());

    let cached: Vec<_> = std::fs::read_dir(&config.cache_dir)
        .map(|rd| {
            rd.flatten()
                .filter(|e| {
                    e.file_name()
                        .to_string_lossy()
                        .ends_with("_cache.json")
                })
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    if cached.is_empty() {
        println!("Cache files:      none");
    } else {
        println!("Cache files:");
        for name in cached {
            println!("  - {}", name);
        }
    }

    if report.has_errors() {
        println!();
        println!("Warnings:");
        for error in report.warnings() {
            println!("  - {}: {}", error.source, error.message);
        }
    }

    Ok(())
}
