use anyhow::Result;
use clap::Parser;
use lootsmith::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose raises the default from warn to debug
    let default_level = if cli.verbose { "lootsmith=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Generate(args) => lootsmith::generate_run(args, &ctx),
        Commands::Facets(args) => lootsmith::facets_run(args, &ctx),
        Commands::Init(args) => lootsmith::infra::config::init(args, &ctx),
        Commands::Completions(args) => lootsmith::completion::run(args, &ctx),
    }
}
