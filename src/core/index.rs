//! Facet index: the deduplicated, sorted set of values each facet takes
//! across the whole catalog. This is what a selection form offers as choices.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{debug, instrument};

use crate::{
    cli::{AppContext, FacetsArgs, OutputFormat},
    core::facet::{Extracted, Facet, FacetValue, Item, Rarity, extract, locale_cmp},
    infra::catalog::{CatalogSnapshot, JsonCatalog, resolve_catalog_path},
    infra::config::load_config,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FacetIndex
{
    values: IndexMap<Facet, Vec<FacetValue>>,
}

impl FacetIndex
{
    /// Scan the catalog once and collect every facet's values.
    #[instrument(skip_all, fields(items = items.len()))]
    pub fn build(items: &[Item]) -> Self
    {
        let mut sets: IndexMap<Facet, IndexSet<FacetValue>> = Facet::ALL
            .into_iter()
            .map(|f| (f, IndexSet::new()))
            .collect();

        for item in items
        {
            for (facet, set) in sets.iter_mut()
            {
                match extract(*facet, item)
                {
                    Extracted::Absent =>
                    {}
                    Extracted::One(v) =>
                    {
                        set.insert(v);
                    }
                    Extracted::Many(vs) => set.extend(vs),
                }
            }
        }

        let values: IndexMap<Facet, Vec<FacetValue>> = sets
            .into_iter()
            .map(|(facet, set)| {
                let mut sorted: Vec<FacetValue> = set
                    .into_iter()
                    .collect();
                sorted.sort_by(|a, b| compare_values(facet, a, b));
                (facet, sorted)
            })
            .collect();

        debug!(
            sizes = ?values
                .iter()
                .map(|(f, v)| (f.as_str(), v.len()))
                .collect::<Vec<_>>(),
            "facet index built"
        );

        Self { values }
    }

    pub fn values(
        &self,
        facet: Facet,
    ) -> &[FacetValue]
    {
        self.values
            .get(&facet)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facet, &[FacetValue])>
    {
        self.values
            .iter()
            .map(|(f, v)| (*f, v.as_slice()))
    }

    /// Total number of distinct values across all facets.
    pub fn total_values(&self) -> usize
    {
        self.values
            .values()
            .map(Vec::len)
            .sum()
    }
}

/// Per-facet ordering used for the index.
pub fn compare_values(
    facet: Facet,
    a: &FacetValue,
    b: &FacetValue,
) -> Ordering
{
    match facet
    {
        Facet::Rarity =>
        {
            let ra = Rarity::rank_of(a.as_text());
            let rb = Rarity::rank_of(b.as_text());
            ra.cmp(&rb)
                .then_with(|| fallback_cmp(a, b))
        }
        Facet::Level | Facet::Range => match (a, b)
        {
            (FacetValue::Int(x), FacetValue::Int(y)) => x.cmp(y),
            _ => fallback_cmp(a, b),
        },
        _ => fallback_cmp(a, b),
    }
}

fn fallback_cmp(
    a: &FacetValue,
    b: &FacetValue,
) -> Ordering
{
    match (a, b)
    {
        (FacetValue::Int(x), FacetValue::Int(y)) => x.cmp(y),
        (FacetValue::Int(_), FacetValue::Text(_)) => Ordering::Less,
        (FacetValue::Text(_), FacetValue::Int(_)) => Ordering::Greater,
        (FacetValue::Text(x), FacetValue::Text(y)) => locale_cmp(x, y),
    }
}

/// `lsm facets`: print the facet index for a catalog.
pub fn run(
    args: FacetsArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let path = resolve_catalog_path(args.catalog.as_deref(), &config)?;
    let snapshot = CatalogSnapshot::load(&JsonCatalog::new(&path))
        .with_context(|| format!("load catalog {}", path.display()))?;
    let index = snapshot.index();

    let wanted: Vec<Facet> = if args.facets.is_empty()
    {
        Facet::ALL.to_vec()
    }
    else
    {
        args.facets.clone()
    };

    if ctx.quiet
    {
        return Ok(());
    }

    match args.format
    {
        OutputFormat::Json =>
        {
            let subset: IndexMap<Facet, &[FacetValue]> = wanted
                .iter()
                .map(|f| (*f, index.values(*f)))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&subset).context("serialize facet index")?
            );
        }
        OutputFormat::Table =>
        {
            #[derive(Tabled)]
            struct FacetRow
            {
                facet: String,
                count: usize,
                values: String,
            }

            let rows: Vec<FacetRow> = wanted
                .iter()
                .map(|f| FacetRow {
                    facet: f.to_string(),
                    count: index
                        .values(*f)
                        .len(),
                    values: index
                        .values(*f)
                        .iter()
                        .join(", "),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        OutputFormat::Text =>
        {
            for facet in wanted
            {
                let values = index.values(facet);
                let heading = format!("{facet} ({})", values.len());
                if ctx.no_color
                {
                    println!("{heading}");
                }
                else
                {
                    println!("{}", heading.bold());
                }
                println!("  {}", values.iter().join(", "));
            }
        }
    }

    Ok(())
}
