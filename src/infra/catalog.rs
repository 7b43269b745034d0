//! Catalog access: a provider trait for the host item store, a JSON/JSONL
//! file implementation, and the immutable snapshot (items + facet index)
//! every generation runs against.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    core::{facet::Item, index::FacetIndex},
    infra::config::Config,
};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError
{
    #[error("catalog unavailable at {path}")]
    Unavailable
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path} at line {line}")]
    Parse
    {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog entry {index} in {path} is not an object")]
    NotAnObject
    {
        path: PathBuf,
        index: usize,
    },
}

/// Source of the full item catalog. Called once per snapshot.
pub trait CatalogProvider
{
    fn all_items(&self) -> Result<Vec<Item>, CatalogError>;
}

/// Items already in memory.
impl CatalogProvider for Vec<Item>
{
    fn all_items(&self) -> Result<Vec<Item>, CatalogError>
    {
        Ok(self.clone())
    }
}

/// A catalog file: either one JSON array of item documents, or JSON Lines
/// with one document per line.
#[derive(Debug, Clone)]
pub struct JsonCatalog
{
    path: PathBuf,
}

impl JsonCatalog
{
    pub fn new(path: impl AsRef<Path>) -> Self
    {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn to_item(
        &self,
        index: usize,
        doc: Value,
    ) -> Result<Item, CatalogError>
    {
        Item::from_value(doc).ok_or_else(|| CatalogError::NotAnObject { path: self.path.clone(), index })
    }
}

impl CatalogProvider for JsonCatalog
{
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn all_items(&self) -> Result<Vec<Item>, CatalogError>
    {
        let text = fs::read_to_string(&self.path)
            .map_err(|source| CatalogError::Unavailable { path: self.path.clone(), source })?;

        let items = if text
            .trim_start()
            .starts_with('[')
        {
            let docs: Vec<Value> = serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: self.path.clone(),
                line: source.line(),
                source,
            })?;
            docs.into_iter()
                .enumerate()
                .map(|(i, doc)| self.to_item(i, doc))
                .collect::<Result<Vec<_>, _>>()?
        }
        else
        {
            let mut items = Vec::new();
            for (lineno, line) in text
                .lines()
                .enumerate()
            {
                if line
                    .trim()
                    .is_empty()
                {
                    continue;
                }
                let doc: Value = serde_json::from_str(line).map_err(|source| CatalogError::Parse {
                    path: self.path.clone(),
                    line: lineno + 1,
                    source,
                })?;
                items.push(self.to_item(items.len(), doc)?);
            }
            items
        };

        debug!(items = items.len(), "catalog read");
        Ok(items)
    }
}

/// Read-only catalog plus its facet index. Cheap to clone and safe to share;
/// when the catalog changes build a new one with [`CatalogSnapshot::rebuild`].
#[derive(Debug, Clone)]
pub struct CatalogSnapshot
{
    items: Arc<[Item]>,
    index: Arc<FacetIndex>,
}

impl CatalogSnapshot
{
    pub fn from_items(items: Vec<Item>) -> Self
    {
        let index = FacetIndex::build(&items);
        Self { items: items.into(), index: Arc::new(index) }
    }

    /// Fetch the catalog once and index it. A provider failure is final.
    pub fn load(provider: &dyn CatalogProvider) -> Result<Self, CatalogError>
    {
        Ok(Self::from_items(provider.all_items()?))
    }

    /// A fresh snapshot from the provider; `self` is left untouched.
    pub fn rebuild(
        &self,
        provider: &dyn CatalogProvider,
    ) -> Result<Self, CatalogError>
    {
        Self::load(provider)
    }

    pub fn items(&self) -> &[Item]
    {
        &self.items
    }

    pub fn index(&self) -> &FacetIndex
    {
        &self.index
    }
}

/// CLI path wins over the configured one; having neither is an error.
pub fn resolve_catalog_path(
    cli: Option<&Path>,
    config: &Config,
) -> Result<PathBuf>
{
    cli.map(Path::to_path_buf)
        .or_else(|| {
            config
                .catalog
                .clone()
        })
        .ok_or_else(|| anyhow::anyhow!("no catalog given: pass --catalog or set `catalog` in lootsmith.toml"))
}
