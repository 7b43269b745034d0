//! Deterministic ordering of matched items: rarity, then level, then name.

use std::{borrow::Borrow, cmp::Ordering};

use crate::core::facet::{Item, Rarity, locale_cmp};

/// Compare two items by rarity rank, level and case-insensitive name.
///
/// Unknown or missing rarities rank after `unique`. A missing level sorts
/// after every numeric level; two missing levels tie and fall through to name.
pub fn compare_items(
    a: &Item,
    b: &Item,
) -> Ordering
{
    Rarity::rank_of(a.rarity())
        .cmp(&Rarity::rank_of(b.rarity()))
        .then_with(|| compare_levels(a.level(), b.level()))
        .then_with(|| {
            locale_cmp(
                &a.name()
                    .to_lowercase(),
                &b.name()
                    .to_lowercase(),
            )
        })
}

fn compare_levels(
    a: Option<i64>,
    b: Option<i64>,
) -> Ordering
{
    match (a, b)
    {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort in place; full ties keep catalog order.
pub fn sort_matches<T: Borrow<Item>>(items: &mut [T])
{
    items.sort_by(|a, b| compare_items(a.borrow(), b.borrow()));
}
