use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::{
    facet::Facet,
    policy::{AmountMode, QuantityMode},
};

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "lootsmith")]
#[command(
    about = "Filter a game item catalog by facets, sample a subset, and assemble a loot merchant record"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log pipeline details to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a merchant from catalog items matching the given criteria
    Generate(GenerateArgs),

    /// List every value each facet takes in the catalog
    Facets(FacetsArgs),

    /// Initialize a lootsmith.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Parse `facet=value`, e.g. `type=weapon` or `level=3`.
fn parse_facet_pair(raw: &str) -> Result<(Facet, String), String> {
    let (facet, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FACET=VALUE, got `{raw}`"))?;
    let facet: Facet = facet.parse().map_err(|e| format!("{e}"))?;
    if value.is_empty() {
        return Err(format!("empty value for facet `{facet}`"));
    }
    Ok((facet, value.to_string()))
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Catalog file (JSON array or JSON Lines); defaults to `catalog` in config
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Merchant form file (.json or .toml); CLI flags are layered on top
    #[arg(long)]
    pub form: Option<PathBuf>,

    /// Merchant name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Require a facet value (repeatable; values of one facet are OR-ed)
    #[arg(short, long, value_name = "FACET=VALUE", value_parser = parse_facet_pair)]
    pub include: Vec<(Facet, String)>,

    /// Reject items with a facet value (repeatable)
    #[arg(short = 'x', long, value_name = "FACET=VALUE", value_parser = parse_facet_pair)]
    pub exclude: Vec<(Facet, String)>,

    /// Quantity mode: one fixed stack size, or a random size per item
    #[arg(long, value_enum)]
    pub quantity_mode: Option<QuantityMode>,

    /// Stack size for `--quantity-mode set` (1-99)
    #[arg(long)]
    pub set_quantity: Option<String>,

    /// Lower bound for `--quantity-mode random` (1-99)
    #[arg(long)]
    pub random_quantity_min: Option<String>,

    /// Upper bound for `--quantity-mode random` (1-99)
    #[arg(long)]
    pub random_quantity_max: Option<String>,

    /// Amount mode: keep all matches, a set count, or a random count
    #[arg(long, value_enum)]
    pub amount_mode: Option<AmountMode>,

    /// Item count for `--amount-mode set`
    #[arg(long)]
    pub set_amount: Option<String>,

    /// Lower bound for `--amount-mode random`
    #[arg(long)]
    pub random_amount_min: Option<String>,

    /// Upper bound for `--amount-mode random`
    #[arg(long)]
    pub random_amount_max: Option<String>,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the record to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Add the criteria summary to the record description
    #[arg(long)]
    pub summary: bool,

    /// Configure the record as an Item Piles merchant
    #[arg(long)]
    pub item_piles: bool,

    /// Enable PF2E Toolbelt better-merchant infinite stock
    #[arg(long)]
    pub toolbelt: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

#[derive(Parser, Debug)]
pub struct FacetsArgs {
    /// Catalog file (JSON array or JSON Lines); defaults to `catalog` in config
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Only show these facets (repeatable)
    #[arg(short, long = "facet", value_enum)]
    pub facets: Vec<Facet>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
