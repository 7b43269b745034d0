//! Selection criteria and the merchant form they are built from.
//!
//! The form is the validated boundary: one explicit include/exclude pair per
//! facet. [`Criteria`] is the normalized result, where an empty list never
//! appears (empty means "no constraint").

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::{
    facet::{Facet, FacetValue},
    policy::{AmountForm, QuantityForm},
};

/// A raw value as submitted by a form: either already numeric or text.
///
/// Deserialization never fails on the value's shape. Booleans, nulls, arrays
/// and objects are kept as their JSON text, which parses as no number, so the
/// numeric fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormValue
{
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for FormValue
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        Value::deserialize(deserializer).map(FormValue::from_json)
    }
}

impl FormValue
{
    pub fn from_json(value: Value) -> Self
    {
        match value
        {
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| FormValue::Text(n.to_string()), FormValue::Number),
            Value::String(s) => FormValue::Text(s),
            other => FormValue::Text(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64>
    {
        match self
        {
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok(),
        }
    }

    /// Integer view, only when the value is a whole finite number.
    pub fn as_integer(&self) -> Option<i64>
    {
        if let FormValue::Text(s) = self
        {
            if let Ok(n) = s
                .trim()
                .parse::<i64>()
            {
                return Some(n);
            }
        }

        self.as_f64()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    }

    fn into_text(self) -> String
    {
        match self
        {
            FormValue::Text(s) => s,
            FormValue::Number(n) if n.is_finite() && n.fract() == 0.0 => format!("{}", n as i64),
            FormValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for FormValue
{
    fn from(s: &str) -> Self
    {
        FormValue::Text(s.to_string())
    }
}

/// Include/exclude lists for a single facet. A bare value stands for a list
/// of one; null means an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetSelection
{
    #[serde(deserialize_with = "one_or_many")]
    pub include: Vec<FormValue>,
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<FormValue>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FormValue>, D::Error>
{
    Ok(match Value::deserialize(deserializer)?
    {
        Value::Null => Vec::new(),
        Value::Array(values) => values
            .into_iter()
            .filter(|v| !v.is_null())
            .map(FormValue::from_json)
            .collect(),
        single => vec![FormValue::from_json(single)],
    })
}

/// One selection per recognized facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetForm
{
    pub category: FacetSelection,
    pub group: FacetSelection,
    pub level: FacetSelection,
    pub range: FacetSelection,
    pub rarity: FacetSelection,
    pub traits: FacetSelection,
    #[serde(rename = "type")]
    pub item_type: FacetSelection,
}

impl FacetForm
{
    pub fn selection(
        &self,
        facet: Facet,
    ) -> &FacetSelection
    {
        match facet
        {
            Facet::Category => &self.category,
            Facet::Group => &self.group,
            Facet::Level => &self.level,
            Facet::Range => &self.range,
            Facet::Rarity => &self.rarity,
            Facet::Traits => &self.traits,
            Facet::Type => &self.item_type,
        }
    }

    pub fn selection_mut(
        &mut self,
        facet: Facet,
    ) -> &mut FacetSelection
    {
        match facet
        {
            Facet::Category => &mut self.category,
            Facet::Group => &mut self.group,
            Facet::Level => &mut self.level,
            Facet::Range => &mut self.range,
            Facet::Rarity => &mut self.rarity,
            Facet::Traits => &mut self.traits,
            Facet::Type => &mut self.item_type,
        }
    }
}

/// Everything the user submits to generate one merchant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantForm
{
    #[serde(deserialize_with = "lenient_name")]
    pub name: Option<String>,
    pub quantity: QuantityForm,
    pub amount: AmountForm,
    pub facets: FacetForm,
}

/// Scalars become the name; anything else reads as blank.
fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error>
{
    Ok(match Value::deserialize(deserializer)?
    {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

pub type Selections = IndexMap<Facet, Vec<FacetValue>>;

/// Normalized include/exclude criteria. Keys follow [`Facet::ALL`] order when
/// built from a form; lists are never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Criteria
{
    included: Selections,
    excluded: Selections,
}

impl Criteria
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add an inclusion constraint. An empty list leaves the facet unconstrained.
    pub fn include<V: Into<FacetValue>>(
        mut self,
        facet: Facet,
        values: impl IntoIterator<Item = V>,
    ) -> Self
    {
        put(&mut self.included, facet, values);
        self
    }

    /// Add an exclusion constraint. An empty list leaves the facet unconstrained.
    pub fn exclude<V: Into<FacetValue>>(
        mut self,
        facet: Facet,
        values: impl IntoIterator<Item = V>,
    ) -> Self
    {
        put(&mut self.excluded, facet, values);
        self
    }

    pub fn included(&self) -> &Selections
    {
        &self.included
    }

    pub fn excluded(&self) -> &Selections
    {
        &self.excluded
    }

    /// Build criteria from the form, coercing numeric facets to integers.
    pub fn from_form(form: &FacetForm) -> Self
    {
        let mut criteria = Criteria::new();

        for facet in Facet::ALL
        {
            let selection = form.selection(facet);
            criteria = criteria
                .include(facet, coerce(facet, &selection.include))
                .exclude(facet, coerce(facet, &selection.exclude));
        }

        criteria
    }
}

fn put<V: Into<FacetValue>>(
    target: &mut Selections,
    facet: Facet,
    values: impl IntoIterator<Item = V>,
)
{
    let values: Vec<FacetValue> = values
        .into_iter()
        .map(Into::into)
        .collect();

    if values.is_empty()
    {
        target.shift_remove(&facet);
    }
    else
    {
        target.insert(facet, values);
    }
}

/// Numeric facets get integers. A value that is not a whole number is kept as
/// text so it can never equal an item's level or range.
fn coerce(
    facet: Facet,
    raw: &[FormValue],
) -> Vec<FacetValue>
{
    raw.iter()
        .cloned()
        .map(|value| {
            if !facet.is_numeric()
            {
                return FacetValue::Text(value.into_text());
            }

            match value.as_integer()
            {
                Some(n) => FacetValue::Int(n),
                None =>
                {
                    warn!(%facet, ?value, "non-integer selection for numeric facet will match nothing");
                    FacetValue::Text(value.into_text())
                }
            }
        })
        .collect()
}
