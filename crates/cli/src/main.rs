//! ManualQA CLI
//!
//! Main entry point for the `manualqa` command-line tool: build the manual
//! index, inspect the machine list, and ask grounded questions.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, BuildCommand, ChatCommand, DetectCommand, MachinesCommand, StatsCommand,
};
use manualqa_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Question answering over equipment manuals
#[derive(Parser, Debug)]
#[command(name = "manualqa")]
#[command(about = "Question answering over equipment manuals", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MANUALQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MANUALQA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the PDF manuals
    #[arg(long, global = true, env = "MANUALQA_PDF_DIR")]
    pdf_dir: Option<PathBuf>,

    /// Directory holding persisted indexes
    #[arg(long, global = true, env = "MANUALQA_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index, or load it if already persisted
    Build(BuildCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Interactive question loop on stdin
    Chat(ChatCommand),

    /// Show which machines a query refers to
    Detect(DetectCommand),

    /// List the machines the corpus covers
    Machines(MachinesCommand),

    /// Show persisted index statistics
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Build(_) => "build",
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Detect(_) => "detect",
            Commands::Machines(_) => "machines",
            Commands::Stats(_) => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.pdf_dir,
        cli.index_dir,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("ManualQA CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("PDF directory: {:?}", config.pdf_dir());
    tracing::debug!("Index: {:?}", config.index_path());

    config.validate()?;
    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Build(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Detect(cmd) => cmd.execute(&config).await,
        Commands::Machines(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) if e.is_unavailable() => {
            tracing::error!("Command failed: {}", e);
            eprintln!("Service unavailable: {}", e);
        }
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
