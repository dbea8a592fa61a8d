mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use vaultdex_core::config::{ConfigLoader, ResolvedConfig};

#[derive(Debug, Parser)]
#[command(name = "vdx", version, about = "Index and query markdown vaults")]
struct Cli {
    /// Path to config file (default: ~/.config/vaultdex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vault to operate on (default: the config's default_vault)
    #[arg(long, global = true)]
    vault: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration and initialize every configured vault
    Doctor,

    /// Scan the vault and refresh its page cache
    Reindex(ReindexArgs),

    /// List indexed pages
    List(ListArgs),

    /// Run a structured query or filter collection against the vault
    Query(QueryArgs),

    /// Show tags with their page counts
    Tags(FormatArgs),

    /// Show outgoing links and backlinks of a page
    Links(LinksArgs),

    /// Show index statistics and per-file indexing errors
    Stats(FormatArgs),

    /// Watch the vault and print index events as files change
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,

    /// Shorthand for --output quiet
    #[arg(long, short)]
    pub quiet: bool,
}

impl FormatArgs {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.quiet {
            OutputFormat::Quiet
        } else {
            self.output
        }
    }
}

#[derive(Debug, Args)]
pub struct ReindexArgs {
    /// Print every file as it is indexed
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only pages carrying this tag (frontmatter or inline)
    #[arg(long)]
    pub tag: Option<String>,

    /// Only pages under this folder, relative to the vault root
    #[arg(long)]
    pub folder: Option<String>,

    /// Maximum number of pages to show
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub format: FormatArgs,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Query in text syntax (`fm:status=draft #tag word`) or as a JSON object
    pub query: Option<String>,

    /// Filter collection as JSON (`{"logic": "and", "conditions": [...]}`)
    #[arg(long, conflicts_with = "query")]
    pub filters: Option<String>,

    /// Maximum number of pages to show
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub format: FormatArgs,
}

#[derive(Debug, Args)]
pub struct LinksArgs {
    /// Page path relative to the vault root
    pub note: String,

    /// Show only backlinks
    #[arg(long, short = 'b')]
    pub backlinks: bool,

    /// Show only outgoing links
    #[arg(long = "outgoing", short = 'o')]
    pub outlinks: bool,

    #[command(flatten)]
    pub format: FormatArgs,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds instead of running until interrupted
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Debounce window in milliseconds (overrides the vault setting)
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Doctor => {
            cmd::doctor::run(cli.config.as_deref(), cli.vault.as_deref());
            return;
        }
        command => command,
    };

    let rc = match ConfigLoader::load(cli.config.as_deref(), cli.vault.as_deref()) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&rc);

    dispatch(&rc, command);
}

fn dispatch(rc: &ResolvedConfig, command: Commands) {
    match command {
        Commands::Doctor => {}
        Commands::Reindex(args) => cmd::reindex::run(rc, args),
        Commands::List(args) => cmd::list::run(rc, args),
        Commands::Query(args) => cmd::query::run(rc, args),
        Commands::Tags(args) => cmd::tags::run(rc, args),
        Commands::Links(args) => cmd::links::run(rc, args),
        Commands::Stats(args) => cmd::stats::run(rc, args),
        Commands::Watch(args) => cmd::watch::run(rc, args),
    }
}
