use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use lotmap::cli::{regions_cmd, run_cmd};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lotmap", version, about = "Map parking lots and charging stations by region")]
struct Cli {
    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress progress and summary output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show info-level logs and extra detail.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Write logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, reduce, and export every configured region.
    Run(run_cmd::RunArgs),

    /// List the configured regions.
    Regions {
        /// Region table JSON (default: ~/.lotmap/regions.json or built-in cities).
        #[arg(long)]
        regions: Option<PathBuf>,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool, log_json: bool) {
    let default_level = if verbose { "lotmap=info" } else { "lotmap=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json {
        std::env::set_var("LOTMAP_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("LOTMAP_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("LOTMAP_VERBOSE", "1");
    }
    if cli.no_color {
        std::env::set_var("LOTMAP_NO_COLOR", "1");
    }

    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Command::Run(args) => run_cmd::run(args).await,
        Command::Regions { regions } => regions_cmd::run(regions.as_deref()),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lotmap", &mut std::io::stdout());
            Ok(())
        }
    }
}
