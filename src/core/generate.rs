//! End-to-end merchant generation: filter, rank, sample, summarize, persist.
//!
//! Everything between loading the catalog and persisting the record runs as
//! one synchronous pass over freshly built state; the snapshot is only read.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::{
    cli::{AppContext, GenerateArgs},
    core::{
        criteria::{Criteria, FormValue, MerchantForm},
        facet::Item,
        matcher::{Denylist, filter_matches},
        policy::{AmountPolicy, QuantityPolicy},
        ranking::sort_matches,
        record::{
            CRITERIA_FLAG, FLAG_SCOPE, IntegrationHook, JsonFileSink, MemorySink, NewRecord,
            RECORD_TYPE, Record, RecordDetails, RecordSink, RecordSystem, registered_hooks, snapshot,
        },
        sampling::{Selected, select},
        summary::CriteriaSummary,
    },
    infra::{
        catalog::{CatalogSnapshot, JsonCatalog, resolve_catalog_path},
        config::{Config, load_config},
    },
};

/// Resolved, validated request for one merchant.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantPlan
{
    pub name: String,
    pub criteria: Criteria,
    pub quantity: QuantityPolicy,
    pub amount: AmountPolicy,
}

impl MerchantPlan
{
    /// Normalize a raw form. A blank name becomes `default_name`.
    pub fn from_form(
        form: &MerchantForm,
        default_name: &str,
    ) -> Self
    {
        let name = form
            .name
            .as_deref()
            .filter(|n| {
                !n.trim()
                    .is_empty()
            })
            .unwrap_or(default_name)
            .to_string();

        Self {
            name,
            criteria: Criteria::from_form(&form.facets),
            quantity: form
                .quantity
                .to_policy(),
            amount: form
                .amount
                .to_policy(),
        }
    }
}

/// Outcome of running a plan against a catalog.
#[derive(Debug, Clone)]
pub struct Generated<'a>
{
    pub name: String,
    /// Size of the ranked match set before the amount cut.
    pub total_matches: usize,
    pub selected: Vec<Selected<'a>>,
    pub summary: CriteriaSummary,
}

/// Filter, rank and sample `items` according to `plan`.
#[instrument(skip_all, fields(merchant = %plan.name))]
pub fn generate<'a, R: Rng + ?Sized>(
    items: &'a [Item],
    plan: &MerchantPlan,
    denylist: &Denylist,
    rng: &mut R,
) -> Generated<'a>
{
    let mut ranked = filter_matches(items, &plan.criteria, denylist);
    sort_matches(&mut ranked);

    let selected = select(rng, &ranked, &plan.amount, &plan.quantity);
    debug!(
        quantity = %plan.quantity,
        amount = ?plan.amount,
        matches = ranked.len(),
        selected = selected.len(),
        "selection resolved"
    );

    let summary = CriteriaSummary::build(&plan.criteria, &plan.quantity, &plan.amount, ranked.len());

    Generated { name: plan.name.clone(), total_matches: ranked.len(), selected, summary }
}

/// Output-assembly switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOptions
{
    /// Put the rendered summary in the description, visible to the GM only.
    pub add_criteria_summary: bool,
}

impl Generated<'_>
{
    pub fn to_record(
        &self,
        options: RecordOptions,
    ) -> NewRecord
    {
        let rendered = self
            .summary
            .render();
        let details = (options.add_criteria_summary && !rendered.is_empty()).then(|| RecordDetails {
            description: format!("<div data-visibility=\"gm\">{rendered}</div>\n<hr />\n<p></p>\n"),
        });

        NewRecord {
            name: self
                .name
                .clone(),
            kind: RECORD_TYPE.to_string(),
            system: RecordSystem { details, ..RecordSystem::default() },
            items: self
                .selected
                .iter()
                .map(|s| snapshot(s.item, s.quantity))
                .collect(),
        }
    }
}

/// Create the record, attach the criteria summary, run each hook, then
/// commit the finished record.
pub fn persist(
    sink: &mut dyn RecordSink,
    generated: &Generated<'_>,
    options: RecordOptions,
    hooks: &[Box<dyn IntegrationHook>],
) -> Result<Record>
{
    let mut record = sink.create_record(generated.to_record(options))?;

    let summary = serde_json::to_value(&generated.summary).context("serialize criteria summary")?;
    sink.set_metadata(&mut record, FLAG_SCOPE, CRITERIA_FLAG, summary)?;

    for hook in hooks
    {
        debug!(namespace = hook.namespace(), key = hook.key(), "applying integration hook");
        sink.set_metadata(&mut record, hook.namespace(), hook.key(), hook.metadata())?;
    }

    sink.commit(&record)?;
    Ok(record)
}

/// Read a merchant form from a JSON or TOML file (by extension).
pub fn read_form(path: &Path) -> Result<MerchantForm>
{
    let text = fs::read_to_string(path).with_context(|| format!("read form {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|e| e == "toml");

    if is_toml
    {
        toml::from_str(&text).with_context(|| format!("parse TOML form {}", path.display()))
    }
    else
    {
        serde_json::from_str(&text).with_context(|| format!("parse JSON form {}", path.display()))
    }
}

/// Layer CLI flags over a form loaded from disk (or an empty one).
pub fn merge_args(
    mut form: MerchantForm,
    args: &GenerateArgs,
) -> MerchantForm
{
    if let Some(name) = &args.name
    {
        form.name = Some(name.clone());
    }

    if let Some(mode) = args.quantity_mode
    {
        form.quantity
            .mode = mode;
    }
    override_value(&mut form.quantity.set, &args.set_quantity);
    override_value(&mut form.quantity.min, &args.random_quantity_min);
    override_value(&mut form.quantity.max, &args.random_quantity_max);

    if let Some(mode) = args.amount_mode
    {
        form.amount
            .mode = mode;
    }
    override_value(&mut form.amount.set, &args.set_amount);
    override_value(&mut form.amount.min, &args.random_amount_min);
    override_value(&mut form.amount.max, &args.random_amount_max);

    for (facet, value) in &args.include
    {
        form.facets
            .selection_mut(*facet)
            .include
            .push(FormValue::from(value.as_str()));
    }
    for (facet, value) in &args.exclude
    {
        form.facets
            .selection_mut(*facet)
            .exclude
            .push(FormValue::from(value.as_str()));
    }

    form
}

fn override_value(
    slot: &mut Option<FormValue>,
    raw: &Option<String>,
)
{
    if let Some(raw) = raw
    {
        *slot = Some(FormValue::from(raw.as_str()));
    }
}

fn make_rng(seed: Option<u64>) -> StdRng
{
    match seed
    {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// `lsm generate`
pub fn run(
    args: GenerateArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config: Config = load_config()?;

    let catalog_path = resolve_catalog_path(args.catalog.as_deref(), &config)?;
    let snapshot = CatalogSnapshot::load(&JsonCatalog::new(&catalog_path))
        .with_context(|| format!("load catalog {}", catalog_path.display()))?;

    let form = match &args.form
    {
        Some(path) => read_form(path)?,
        None => MerchantForm::default(),
    };
    let form = merge_args(form, &args);
    let plan = MerchantPlan::from_form(&form, &config.default_name);

    let denylist = config.denylist();
    let mut rng = make_rng(args.seed.or(config.seed));
    let generated = generate(snapshot.items(), &plan, &denylist, &mut rng);

    let options = RecordOptions { add_criteria_summary: args.summary || config.add_criteria_summary };
    let mut integrations = config
        .integrations
        .clone();
    integrations.item_piles |= args.item_piles;
    integrations.toolbelt_better_merchant |= args.toolbelt;
    let hooks = registered_hooks(&integrations);

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", "DRY RUN: Would create:".yellow());
            println!("  Name: {}", plan.name);
            println!("  Matches: {}", generated.total_matches);
            println!("  Items: {}", generated.selected.len());
            println!("  {}", generated.summary.render());
        }
        return Ok(());
    }

    let record = match &args.output
    {
        Some(path) =>
        {
            let mut sink = JsonFileSink::new(path);
            persist(&mut sink, &generated, options, &hooks)?
        }
        None =>
        {
            let mut sink = MemorySink::new();
            let record = persist(&mut sink, &generated, options, &hooks)?;
            let json: Value = serde_json::to_value(&record).context("serialize record")?;
            println!("{}", serde_json::to_string_pretty(&json).context("format record")?);
            record
        }
    };

    info!(
        name = %record.name,
        items = record.items.len(),
        matches = generated.total_matches,
        "merchant generated"
    );

    if let Some(path) = &args.output
    {
        if !ctx.quiet
        {
            let line = format!(
                "Created {} with {} of {} matching items at {}",
                record.name,
                record.items.len(),
                generated.total_matches,
                path.display()
            );
            if ctx.no_color
            {
                eprintln!("{line}");
            }
            else
            {
                eprintln!("{}", line.green());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;
    use crate::core::{
        facet::Facet,
        policy::{AmountForm, AmountMode, QuantityForm, QuantityMode},
        record::ItemPilesMerchant,
    };

    fn catalog() -> Vec<Item>
    {
        [
            json!({ "name": "a", "type": "weapon", "system": {
                "slug": "a", "level": { "value": 3 }, "traits": { "rarity": "rare" } } }),
            json!({ "name": "b", "type": "weapon", "system": {
                "slug": "b", "level": { "value": 1 }, "traits": { "rarity": "common" } } }),
            json!({ "name": "amulet", "type": "weapon", "system": {
                "slug": "amulet-implement", "level": { "value": 1 }, "traits": { "rarity": "common" } } }),
        ]
        .into_iter()
        .filter_map(Item::from_value)
        .collect()
    }

    fn weapons() -> MerchantPlan
    {
        MerchantPlan {
            name: "Armory".to_string(),
            criteria: Criteria::new().include(Facet::Type, ["weapon"]),
            quantity: QuantityPolicy::Fixed(1),
            amount: AmountPolicy::All,
        }
    }

    fn names(generated: &Generated<'_>) -> Vec<String>
    {
        generated
            .selected
            .iter()
            .map(|s| {
                s.item
                    .name()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn ranks_matches_and_drops_denied_slugs()
    {
        let items = catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let generated = generate(&items, &weapons(), &Denylist::default(), &mut rng);

        assert_eq!(generated.total_matches, 2);
        assert_eq!(names(&generated), vec!["b", "a"]);
        assert!(
            generated
                .selected
                .iter()
                .all(|s| s.quantity == 1)
        );
    }

    #[test]
    fn fixed_amount_picks_one_of_the_matches()
    {
        let items = catalog();
        let plan = MerchantPlan { amount: AmountPolicy::Fixed(1), ..weapons() };

        let mut seen = std::collections::HashSet::new();
        for seed in 0..64
        {
            let mut rng = StdRng::seed_from_u64(seed);
            let generated = generate(&items, &plan, &Denylist::default(), &mut rng);
            assert_eq!(generated.selected.len(), 1);
            seen.insert(names(&generated).remove(0));
        }
        assert_eq!(seen.len(), 2, "both matches should be reachable");
    }

    #[test]
    fn oversized_fixed_amount_is_deterministic()
    {
        let items = catalog();
        let plan = MerchantPlan { amount: AmountPolicy::Fixed(5), ..weapons() };
        let mut rng = StdRng::seed_from_u64(9);
        let generated = generate(&items, &plan, &Denylist::default(), &mut rng);

        assert_eq!(names(&generated), vec!["b", "a"]);
        assert_eq!(generated.summary.options.items_returned, "Set (2)");
    }

    #[test]
    fn empty_match_set_still_yields_a_record()
    {
        let items = catalog();
        let plan = MerchantPlan { criteria: Criteria::new().include(Facet::Type, ["armor"]), ..weapons() };
        let mut rng = StdRng::seed_from_u64(0);
        let generated = generate(&items, &plan, &Denylist::default(), &mut rng);

        assert_eq!(generated.total_matches, 0);
        let record = generated.to_record(RecordOptions::default());
        assert!(record.items.is_empty());
        assert_eq!(record.kind, "loot");
    }

    #[test]
    fn blank_name_falls_back()
    {
        let form = MerchantForm { name: Some("   ".to_string()), ..MerchantForm::default() };
        assert_eq!(MerchantPlan::from_form(&form, "New Merchant").name, "New Merchant");
    }

    #[test]
    fn plan_from_form_resolves_policies()
    {
        let form = MerchantForm {
            name: Some("Stall".to_string()),
            quantity: QuantityForm { mode: QuantityMode::Random, min: Some("0".into()), max: Some("200".into()), set: None },
            amount: AmountForm { mode: AmountMode::Set, set: Some("3".into()), ..AmountForm::default() },
            ..MerchantForm::default()
        };
        let plan = MerchantPlan::from_form(&form, "unused");

        assert_eq!(plan.quantity, QuantityPolicy::Random { min: 1, max: 99 });
        assert_eq!(plan.amount, AmountPolicy::Fixed(3));
    }

    #[test]
    fn persist_attaches_summary_and_hooks()
    {
        let items = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let plan = MerchantPlan { quantity: QuantityPolicy::Fixed(4), ..weapons() };
        let generated = generate(&items, &plan, &Denylist::default(), &mut rng);

        let hooks: Vec<Box<dyn IntegrationHook>> = vec![Box::new(ItemPilesMerchant)];
        let mut sink = MemorySink::new();
        let record = persist(&mut sink, &generated, RecordOptions { add_criteria_summary: true }, &hooks)
            .expect("persist");

        assert_eq!(record.items.len(), 2);
        assert!(
            record
                .items
                .iter()
                .all(|i| i["system"]["quantity"] == 4)
        );
        assert_eq!(
            record.flag(FLAG_SCOPE, CRITERIA_FLAG).expect("criteria")["Included"]["type"],
            json!(["weapon"])
        );
        assert!(record.flag("item-piles", "data").is_some());

        let description = &record
            .system
            .details
            .as_ref()
            .expect("details")
            .description;
        assert!(description.starts_with("<div data-visibility=\"gm\"><strong>Included:</strong>"));
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn summary_stays_out_of_description_by_default()
    {
        let items = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let generated = generate(&items, &weapons(), &Denylist::default(), &mut rng);
        assert!(
            generated
                .to_record(RecordOptions::default())
                .system
                .details
                .is_none()
        );
    }

    #[test]
    fn malformed_form_numbers_do_not_abort_reading()
    {
        use assert_fs::prelude::*;

        let tmp = assert_fs::TempDir::new().expect("tempdir");
        let file = tmp.child("form.json");
        file.write_str(r#"{ "quantity": { "mode": "set", "set": true }, "facets": { "type": { "include": "weapon" } } }"#)
            .expect("write");

        let form = read_form(file.path()).expect("lenient form");
        let plan = MerchantPlan::from_form(&form, "New Merchant");

        assert_eq!(plan.quantity, QuantityPolicy::Fixed(1));
        assert_eq!(plan.criteria, Criteria::new().include(Facet::Type, ["weapon"]));
    }
}
