//! Facet extraction over catalog items.
//!
//! A facet is one of a small, fixed set of item attributes a merchant can be
//! filtered on. Extraction never fails: a missing attribute or one with an
//! unexpected shape comes back as [`Extracted::Absent`].

use std::{cmp::Ordering, fmt, str::FromStr};

use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The recognized facets, in display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Facet
{
    Category,
    Group,
    Level,
    Range,
    Rarity,
    Traits,
    Type,
}

impl Facet
{
    pub const ALL: [Facet; 7] = [
        Facet::Category,
        Facet::Group,
        Facet::Level,
        Facet::Range,
        Facet::Rarity,
        Facet::Traits,
        Facet::Type,
    ];

    pub fn as_str(self) -> &'static str
    {
        match self
        {
            Facet::Category => "category",
            Facet::Group => "group",
            Facet::Level => "level",
            Facet::Range => "range",
            Facet::Rarity => "rarity",
            Facet::Traits => "traits",
            Facet::Type => "type",
        }
    }

    /// Facets whose selections are integers rather than strings.
    pub fn is_numeric(self) -> bool
    {
        matches!(self, Facet::Level | Facet::Range)
    }
}

impl fmt::Display for Facet
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facet `{0}` (expected one of: category, group, level, range, rarity, traits, type)")]
pub struct UnknownFacet(pub String);

impl FromStr for Facet
{
    type Err = UnknownFacet;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Facet::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| UnknownFacet(s.to_string()))
    }
}

/// A single facet value: integers for `level`/`range`, strings otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue
{
    Int(i64),
    Text(String),
}

impl FacetValue
{
    pub fn as_int(&self) -> Option<i64>
    {
        match self
        {
            FacetValue::Int(n) => Some(*n),
            FacetValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str>
    {
        match self
        {
            FacetValue::Text(s) => Some(s),
            FacetValue::Int(_) => None,
        }
    }
}

impl fmt::Display for FacetValue
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            FacetValue::Int(n) => write!(f, "{n}"),
            FacetValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FacetValue
{
    fn from(n: i64) -> Self
    {
        FacetValue::Int(n)
    }
}

impl From<&str> for FacetValue
{
    fn from(s: &str) -> Self
    {
        FacetValue::Text(s.to_string())
    }
}

impl From<String> for FacetValue
{
    fn from(s: String) -> Self
    {
        FacetValue::Text(s)
    }
}

/// Result of extracting one facet from one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted
{
    /// The attribute path does not resolve, or resolved to an unusable shape.
    Absent,
    One(FacetValue),
    /// Sequence-valued facet (`traits`); may be empty.
    Many(Vec<FacetValue>),
}

impl Extracted
{
    pub fn is_absent(&self) -> bool
    {
        matches!(self, Extracted::Absent)
    }

    /// Extracted values as a slice; `None` when absent.
    pub fn as_slice(&self) -> Option<&[FacetValue]>
    {
        match self
        {
            Extracted::Absent => None,
            Extracted::One(v) => Some(std::slice::from_ref(v)),
            Extracted::Many(vs) => Some(vs),
        }
    }

    /// Whether any extracted value is a member of `wanted`. `None` when absent.
    pub fn intersects(
        &self,
        wanted: &[FacetValue],
    ) -> Option<bool>
    {
        self.as_slice()
            .map(|have| {
                have.iter()
                    .any(|v| wanted.contains(v))
            })
    }
}

/// Known rarities with their sort rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity
{
    Common,
    Uncommon,
    Rare,
    Unique,
}

/// Rank given to any rarity outside the known table, including a missing one.
pub const UNRANKED: u8 = 5;

impl Rarity
{
    pub fn rank(self) -> u8
    {
        match self
        {
            Rarity::Common => 0,
            Rarity::Uncommon => 1,
            Rarity::Rare => 2,
            Rarity::Unique => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self>
    {
        match s
        {
            "common" => Some(Rarity::Common),
            "uncommon" => Some(Rarity::Uncommon),
            "rare" => Some(Rarity::Rare),
            "unique" => Some(Rarity::Unique),
            _ => None,
        }
    }

    /// Rank of a raw rarity string; unknown or missing values rank last.
    pub fn rank_of(raw: Option<&str>) -> u8
    {
        raw.and_then(Rarity::parse)
            .map_or(UNRANKED, Rarity::rank)
    }
}

thread_local! {
    static COLLATOR: Option<Collator> = Collator::try_new(&Default::default(), CollatorOptions::new()).ok();
}

/// Unicode collation under the root locale at tertiary strength, so accents
/// sort next to their base letter and lowercase precedes uppercase.
///
/// Strings the collator calls equal (and every pair, should collation data be
/// unavailable) fall back to [`caseless_cmp`] so the result stays total.
pub fn locale_cmp(
    a: &str,
    b: &str,
) -> Ordering
{
    COLLATOR
        .with(|collator| {
            collator
                .as_ref()
                .map_or(Ordering::Equal, |c| c.compare(a, b))
        })
        .then_with(|| caseless_cmp(a, b))
}

/// Lowercased code-point order, lowercase first on ties.
pub fn caseless_cmp(
    a: &str,
    b: &str,
) -> Ordering
{
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// An immutable catalog record.
///
/// The raw document is kept whole so a snapshot of it can be written into the
/// output record; typed accessors read the attribute bag under `system`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Item
{
    doc: Value,
}

impl Item
{
    /// Wrap a JSON document. Returns `None` unless it is an object.
    pub fn from_value(doc: Value) -> Option<Self>
    {
        doc.is_object()
            .then_some(Self { doc })
    }

    pub fn document(&self) -> &Value
    {
        &self.doc
    }

    pub fn name(&self) -> &str
    {
        self.text_at("/name")
            .unwrap_or("")
    }

    pub fn item_type(&self) -> Option<&str>
    {
        self.text_at("/type")
    }

    pub fn slug(&self) -> Option<&str>
    {
        self.text_at("/system/slug")
    }

    pub fn category(&self) -> Option<&str>
    {
        self.text_at("/system/category")
    }

    pub fn group(&self) -> Option<&str>
    {
        self.text_at("/system/group")
    }

    pub fn level(&self) -> Option<i64>
    {
        self.int_at("/system/level/value")
    }

    pub fn range(&self) -> Option<i64>
    {
        self.int_at("/system/range")
    }

    pub fn rarity(&self) -> Option<&str>
    {
        self.text_at("/system/traits/rarity")
    }

    /// Trait list. A missing or null list is empty; a non-list is `None`.
    pub fn traits(&self) -> Option<Vec<&str>>
    {
        match self
            .doc
            .pointer("/system/traits/value")
        {
            None | Some(Value::Null) => Some(Vec::new()),
            Some(Value::Array(values)) => Some(
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .collect(),
            ),
            Some(_) => None,
        }
    }

    fn text_at(
        &self,
        pointer: &str,
    ) -> Option<&str>
    {
        self.doc
            .pointer(pointer)
            .and_then(Value::as_str)
    }

    fn int_at(
        &self,
        pointer: &str,
    ) -> Option<i64>
    {
        let Value::Number(n) = self
            .doc
            .pointer(pointer)?
        else
        {
            return None;
        };

        if let Some(i) = n.as_i64()
        {
            return Some(i);
        }

        // Integral floats such as `3.0` still count as levels
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    }
}

/// Extract one facet's value(s) from an item.
pub fn extract(
    facet: Facet,
    item: &Item,
) -> Extracted
{
    let text = |v: Option<&str>| {
        v.map_or(Extracted::Absent, |s| Extracted::One(FacetValue::from(s)))
    };
    let int = |v: Option<i64>| v.map_or(Extracted::Absent, |n| Extracted::One(FacetValue::Int(n)));

    match facet
    {
        Facet::Category => text(item.category()),
        Facet::Group => text(item.group()),
        Facet::Level => int(item.level()),
        Facet::Range => int(item.range()),
        Facet::Rarity => text(item.rarity()),
        Facet::Type => text(item.item_type()),
        Facet::Traits => item
            .traits()
            .map_or(Extracted::Absent, |ts| {
                Extracted::Many(
                    ts.into_iter()
                        .map(FacetValue::from)
                        .collect(),
                )
            }),
    }
}
