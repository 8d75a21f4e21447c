mod config;
mod demo_cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use logforge::{load_config, LogOptions, Logger, LoggerConfig, LoggerSettings, Severity};

use config::Config;

#[derive(Parser)]
#[command(name = "logforge")]
#[command(about = "Write, rotate and bundle logforge log files")]
#[command(version)]
struct Cli {
    /// YAML logger config (defaults to $LOGFORGE_CONFIG or ./logforge.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the file sink, shared by every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
struct FileArgs {
    /// Log directory; enables the file sink
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Rotate once a file would grow past this many bytes (0 = never)
    #[arg(long)]
    max_size: Option<u64>,

    /// Number of rotated files to keep
    #[arg(long)]
    max_files: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log one message
    Write {
        #[command(flatten)]
        file: FileArgs,

        /// Severity: verbose, debug, info, warn, error, assert (or V/D/I/W/E/A)
        #[arg(short, long, default_value = "info")]
        level: Severity,

        /// Tag for the line; the CLI call site is used when omitted
        #[arg(short, long)]
        tag: Option<String>,

        message: String,
    },
    /// Write many lines from several threads to exercise rotation
    Demo {
        #[command(flatten)]
        file: FileArgs,

        /// Lines written by each thread
        #[arg(long, default_value_t = 1000)]
        lines: usize,

        #[arg(long, default_value_t = 4)]
        threads: usize,
    },
    /// Zip every log file in the directory
    Bundle {
        #[command(flatten)]
        file: FileArgs,

        /// Output archive path
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or(config.config_path);

    match cli.command {
        Commands::Write {
            file,
            level,
            tag,
            message,
        } => {
            let logger = open_logger(&config_path, &file)?;
            let mut options = LogOptions::new();
            if let Some(tag) = tag.as_deref() {
                options = options.tag(tag);
            }
            logger.log(level, &message, options);
            logger.destroy();
        }
        Commands::Demo {
            file,
            lines,
            threads,
        } => {
            let logger = open_logger(&config_path, &file)?;
            demo_cmd::run(&logger, threads, lines)?;
            logger.destroy();
        }
        Commands::Bundle { file, out } => {
            let logger = open_logger(&config_path, &file)?;
            let count = logger
                .bundle(&out)
                .with_context(|| format!("Failed to bundle logs into {}", out.display()))?;
            info!(files = count, out = %out.display(), "Bundle written");
            println!("Wrote {count} file(s) to {}", out.display());
            logger.destroy();
        }
    }

    Ok(())
}

/// Config file, then environment, then command-line overrides.
fn open_logger(config_path: &Path, args: &FileArgs) -> Result<Logger> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load logger config: {}", config_path.display()))?
        .apply_env()
        .context("Invalid logger environment override")?;
    let config = apply_file_args(config, args);
    Logger::from_config(&config).context("Failed to create logger")
}

fn apply_file_args(mut config: LoggerConfig, args: &FileArgs) -> LoggerConfig {
    if let Some(dir) = &args.dir {
        let settings = config.file.take().unwrap_or_else(|| LoggerSettings::new(dir));
        config.file = Some(LoggerSettings {
            logs_dir: dir.clone(),
            ..settings
        });
    }
    if let Some(file) = config.file.as_mut() {
        if let Some(max_size) = args.max_size {
            file.max_file_size = max_size;
        }
        if let Some(max_files) = args.max_files {
            file.max_file_count = max_files;
        }
    }
    config
}
