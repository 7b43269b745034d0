//! **lootsmith** - Build loot merchants from a game item catalog
//!
//! Filters catalog items by facet criteria, ranks the matches, samples a subset
//! under quantity/amount policies, and assembles a `loot` record annotated with
//! a criteria summary.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Selection engine - extraction, matching, ranking, sampling, summaries
pub mod core {
    /// Facet definitions, item accessors and per-facet extraction
    pub mod facet;
    pub use facet::{Extracted, Facet, FacetValue, Item, Rarity, extract};

    /// Deduplicated, sorted facet values across the catalog
    pub mod index;
    pub use index::{FacetIndex, run as facets_run};

    /// Include/exclude criteria and the merchant form they come from
    pub mod criteria;
    pub use criteria::{Criteria, FacetForm, FacetSelection, FormValue, MerchantForm};

    /// Predicate evaluation and the slug denylist
    pub mod matcher;
    pub use matcher::{Denylist, filter_matches, matches};

    /// Rarity > level > name ordering
    pub mod ranking;
    pub use ranking::{compare_items, sort_matches};

    /// Quantity/amount policies and input clamping
    pub mod policy;
    pub use policy::{AmountPolicy, QuantityPolicy};

    /// Sampling without replacement and per-item quantity draws
    pub mod sampling;
    pub use sampling::{Selected, sample_indices, select};

    /// Structured and rendered criteria summary
    pub mod summary;
    pub use summary::CriteriaSummary;

    /// Output record, persistence sinks and integration hooks
    pub mod record;
    pub use record::{IntegrationHook, NewRecord, Record, RecordSink};

    /// End-to-end generation pipeline
    pub mod generate;
    pub use generate::{MerchantPlan, generate, run as generate_run};
}

/// Infrastructure - catalog access and configuration
pub mod infra {
    /// Catalog provider, JSON/JSONL reader and immutable snapshot
    pub mod catalog;
    pub use catalog::{CatalogError, CatalogProvider, CatalogSnapshot, JsonCatalog};

    /// Configuration management with TOML support and integration toggles
    pub mod config;
    pub use config::{Config, init as config_init, load_config};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{facets_run, generate_run};
pub use infra::{CatalogSnapshot, Config, load_config};

// Core types for external consumers
pub use core::{Criteria, Facet, FacetValue, Item, MerchantPlan};
