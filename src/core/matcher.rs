//! Include/exclude predicate evaluation plus the permanent slug denylist.

use indexmap::IndexSet;
use tracing::{debug, instrument};

use crate::core::{
    criteria::Criteria,
    facet::{Item, extract},
};

/// Slugs that are never offered, whatever the criteria say. These are class
/// features and implements that live in the equipment catalog but are not
/// purchasable gear.
pub const DEFAULT_DENYLIST: [&str; 19] = [
    "amulet-implement",
    "bakuwa-lizardfolk-bony-plates",
    "bell-implement",
    "chalice-implement",
    "hardshell-surki-carapace",
    "lantern-implement",
    "mirror-implement",
    "orc-warmask",
    "power-suit",
    "regalia-implement",
    "reinforced-chassis",
    "rite-of-reinforcement-exoskeleton",
    "splendid-skull-mask",
    "subterfuge-suit",
    "titan-nagaji-scales",
    "tough-skin",
    "tome-implement",
    "versatile-vial",
    "wand-implement",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist
{
    slugs: IndexSet<String>,
}

impl Denylist
{
    pub fn from_slugs<S: Into<String>>(slugs: impl IntoIterator<Item = S>) -> Self
    {
        Self {
            slugs: slugs
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    pub fn contains(
        &self,
        slug: &str,
    ) -> bool
    {
        self.slugs
            .contains(slug)
    }

    pub fn len(&self) -> usize
    {
        self.slugs
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.slugs
            .is_empty()
    }
}

impl Default for Denylist
{
    fn default() -> Self
    {
        Self::from_slugs(DEFAULT_DENYLIST)
    }
}

/// Whether `item` passes the denylist and every include/exclude constraint.
///
/// Within a facet any listed value satisfies inclusion; across facets every
/// included facet must be satisfied. An absent value fails inclusion but can
/// never trigger exclusion.
pub fn matches(
    item: &Item,
    criteria: &Criteria,
    denylist: &Denylist,
) -> bool
{
    if let Some(slug) = item
        .slug()
        .filter(|s| !s.is_empty())
    {
        if denylist.contains(slug)
        {
            return false;
        }
    }

    for (facet, wanted) in criteria.included()
    {
        if extract(*facet, item).intersects(wanted) != Some(true)
        {
            return false;
        }
    }

    for (facet, unwanted) in criteria.excluded()
    {
        if extract(*facet, item).intersects(unwanted) == Some(true)
        {
            return false;
        }
    }

    true
}

/// Every catalog item that matches, in catalog order.
#[instrument(skip_all, fields(catalog = items.len()))]
pub fn filter_matches<'a>(
    items: &'a [Item],
    criteria: &Criteria,
    denylist: &Denylist,
) -> Vec<&'a Item>
{
    let out: Vec<&Item> = items
        .iter()
        .filter(|item| matches(item, criteria, denylist))
        .collect();

    debug!(matches = out.len(), "criteria applied");
    out
}

#[cfg(test)]
mod tests
{
    use serde_json::{Value, json};

    use super::*;
    use crate::core::facet::{Facet, FacetValue};

    fn item(doc: Value) -> Item
    {
        Item::from_value(doc).expect("object")
    }

    fn sword() -> Item
    {
        item(json!({
            "name": "Flaming Sword",
            "type": "weapon",
            "system": {
                "slug": "flaming-sword",
                "level": { "value": 8 },
                "traits": { "rarity": "uncommon", "value": ["fire", "magical"] }
            }
        }))
    }

    #[test]
    fn no_criteria_accepts_everything_not_denied()
    {
        assert!(matches(&sword(), &Criteria::new(), &Denylist::default()));
    }

    #[test]
    fn denylist_beats_inclusion()
    {
        let wand = item(json!({ "name": "Wand", "type": "weapon", "system": { "slug": "wand-implement" } }));
        let criteria = Criteria::new().include(Facet::Type, ["weapon"]);
        assert!(!matches(&wand, &criteria, &Denylist::default()));
    }

    #[test]
    fn empty_slug_is_ignored()
    {
        let it = item(json!({ "name": "Blank", "type": "weapon", "system": { "slug": "" } }));
        let deny = Denylist::from_slugs([""]);
        assert!(matches(&it, &Criteria::new(), &deny));
    }

    #[test]
    fn inclusion_is_any_within_and_all_across()
    {
        let deny = Denylist::default();

        let any_trait = Criteria::new().include(Facet::Traits, ["cold", "fire"]);
        assert!(matches(&sword(), &any_trait, &deny));

        let both = Criteria::new()
            .include(Facet::Traits, ["fire"])
            .include(Facet::Level, [FacetValue::Int(1)]);
        assert!(!matches(&sword(), &both, &deny));

        let both_ok = Criteria::new()
            .include(Facet::Traits, ["fire"])
            .include(Facet::Level, [FacetValue::Int(8)]);
        assert!(matches(&sword(), &both_ok, &deny));
    }

    #[test]
    fn absent_value_fails_inclusion()
    {
        let criteria = Criteria::new().include(Facet::Range, [FacetValue::Int(30)]);
        assert!(!matches(&sword(), &criteria, &Denylist::default()));
    }

    #[test]
    fn absent_value_never_excludes()
    {
        let criteria = Criteria::new()
            .exclude(Facet::Range, [FacetValue::Int(30)])
            .exclude(Facet::Category, ["martial"]);
        assert!(matches(&sword(), &criteria, &Denylist::default()));
    }

    #[test]
    fn exclusion_hits_scalars_and_sequences()
    {
        let deny = Denylist::default();
        assert!(!matches(&sword(), &Criteria::new().exclude(Facet::Traits, ["magical"]), &deny));
        assert!(!matches(&sword(), &Criteria::new().exclude(Facet::Rarity, ["uncommon"]), &deny));
        assert!(matches(&sword(), &Criteria::new().exclude(Facet::Rarity, ["rare"]), &deny));
    }

    #[test]
    fn textual_level_never_matches()
    {
        let criteria = Criteria::new().include(Facet::Level, ["8"]);
        assert!(!matches(&sword(), &criteria, &Denylist::default()));
    }

    #[test]
    fn empty_trait_list_fails_trait_inclusion()
    {
        let plain = item(json!({ "name": "Rope", "type": "equipment", "system": {} }));
        let criteria = Criteria::new().include(Facet::Traits, ["magical"]);
        assert!(!matches(&plain, &criteria, &Denylist::default()));
    }
}
