use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use lore::commands::ask::{self, AskArgs};
use lore::commands::build::{self, BuildArgs, DEFAULT_OUTPUT};
use lore::commands::common::SourceSpec;
use lore::commands::completions::{generate_completions, Shell};
use lore::commands::files;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "lore")]
#[command(about = "Build a knowledge document for a codebase and ask questions about it", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./lore.toml, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a codebase and write its knowledge document
    Build {
        /// Local directory to analyze
        #[arg(long, conflicts_with_all = ["repo", "example"])]
        dir: Option<PathBuf>,

        /// Git repository URL to clone and analyze
        #[arg(long, conflicts_with = "example")]
        repo: Option<String>,

        /// Analyze the built-in three-file example application
        #[arg(long)]
        example: bool,

        /// Output file
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Only include files matching this glob (repeatable)
        #[arg(long, value_name = "GLOB")]
        include: Vec<String>,

        /// Exclude files matching this glob (repeatable)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// Skip files larger than this many bytes
        #[arg(long, value_name = "BYTES")]
        max_file_bytes: Option<u64>,

        /// Upper bound on the number of abstractions
        #[arg(long, value_name = "N")]
        max_abstractions: Option<usize>,
    },

    /// Ask questions about a codebase (interactive unless --question is given)
    Ask {
        /// Knowledge document produced by 'lore build'
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        knowledge: PathBuf,

        /// Local directory to read source files from
        #[arg(long, conflicts_with_all = ["repo", "example"])]
        dir: Option<PathBuf>,

        /// Git repository URL to read source files from
        #[arg(long, conflicts_with = "example")]
        repo: Option<String>,

        /// Read source files from the built-in example application
        #[arg(long)]
        example: bool,

        /// Ask a single question and exit
        #[arg(short, long)]
        question: Option<String>,

        /// Maximum file requests per question
        #[arg(long, value_name = "N")]
        max_rounds: Option<usize>,
    },

    /// List the files the source filters admit, with their indices
    Files {
        /// Local directory to list
        #[arg(long, conflicts_with_all = ["repo", "example"])]
        dir: Option<PathBuf>,

        /// Git repository URL to clone and list
        #[arg(long, conflicts_with = "example")]
        repo: Option<String>,

        /// List the built-in example application
        #[arg(long)]
        example: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell: bash, zsh, fish or powershell
        shell: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "lore=debug" } else { "lore=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // stdout carries documents and answers only
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Build {
            dir,
            repo,
            example,
            output,
            include,
            exclude,
            max_file_bytes,
            max_abstractions,
        } => build::execute(
            BuildArgs {
                source: SourceSpec::from_flags(dir, repo, example)?,
                output,
                include,
                exclude,
                max_file_bytes,
                max_abstractions,
            },
            config,
        ),
        Commands::Ask {
            knowledge,
            dir,
            repo,
            example,
            question,
            max_rounds,
        } => ask::execute(
            AskArgs {
                knowledge,
                source: SourceSpec::from_flags(dir, repo, example)?,
                question,
                max_rounds,
            },
            config,
        ),
        Commands::Files { dir, repo, example } => {
            files::execute(SourceSpec::from_flags(dir, repo, example)?, config)
        }
        Commands::Completions { shell } => {
            let shell = Shell::from_str(&shell)?;
            let mut cmd = Cli::command();
            generate_completions(&mut cmd, shell, &mut std::io::stdout());
            Ok(())
        }
    }
}
