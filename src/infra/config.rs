use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cli::{AppContext, InitArgs},
    core::matcher::{DEFAULT_DENYLIST, Denylist},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Default catalog file (JSON array or JSON Lines)
    pub catalog: Option<PathBuf>,

    /// Name used when the form leaves the merchant name blank
    pub default_name: String,

    /// Put the rendered criteria summary into the record description
    pub add_criteria_summary: bool,

    /// Third-party inventory module setups
    pub integrations: IntegrationConfig,

    /// Replace the built-in slug denylist
    pub denylist: Option<Vec<String>>,

    /// Fixed RNG seed for reproducible merchants
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig
{
    pub item_piles: bool,
    pub toolbelt_better_merchant: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            catalog: None,
            default_name: "New Merchant".to_string(),
            add_criteria_summary: false,
            integrations: IntegrationConfig::default(),
            denylist: None,
            seed: None,
        }
    }
}

impl Config
{
    /// Configured denylist, or the built-in one.
    pub fn denylist(&self) -> Denylist
    {
        self.denylist
            .as_ref()
            .map_or_else(Denylist::default, |slugs| Denylist::from_slugs(slugs.iter().cloned()))
    }
}

/// Config file names, highest priority first. Only the first one found is read.
pub const CONFIG_FILES: [&str; 4] = ["lootsmith.toml", "lootsmith.yaml", "lootsmith.json", ".lootsmith.toml"];

/// Environment prefix; nested keys are joined with `__`
/// (`LOOTSMITH__INTEGRATIONS__ITEM_PILES=true`).
pub const ENV_PREFIX: &str = "LOOTSMITH";

pub fn find_config_file(dir: &Path) -> Option<PathBuf>
{
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Config from the working directory and the environment.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    if let Some(path) = find_config_file(dir)
    {
        debug!(path = %path.display(), "reading config file");
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(env_source());

    builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")
}

fn env_source() -> config::Environment
{
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

/// Starter config: the defaults, with the built-in denylist spelled out so it
/// can be edited in place.
pub fn starter_toml() -> Result<String>
{
    let starter = Config {
        denylist: Some(
            DEFAULT_DENYLIST
                .iter()
                .map(|slug| slug.to_string())
                .collect(),
        ),
        ..Config::default()
    };
    let body = toml::to_string_pretty(&starter).context("Failed to serialize starter config")?;
    Ok(format!("# lootsmith configuration\n# Environment overrides: {ENV_PREFIX}__<KEY>, e.g. {ENV_PREFIX}__SEED=42\n\n{body}"))
}

/// `lsm init`
pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let text = starter_toml()?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: Would write {}", config_path.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(&args.path)
        .with_context(|| format!("Failed to create {}", args.path.display()))?;
    std::fs::write(&config_path, text).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
