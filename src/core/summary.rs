//! Criteria summary attached to a generated merchant: a structured form kept
//! as record metadata and a rendered form for the record description.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::{
    criteria::{Criteria, Selections},
    facet::{Facet, FacetValue},
    policy::{AmountPolicy, QuantityPolicy},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions
{
    #[serde(rename = "Quantity")]
    pub quantity: String,
    #[serde(rename = "Items Returned")]
    pub items_returned: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaSummary
{
    #[serde(rename = "Included")]
    pub included: IndexMap<Facet, Vec<FacetValue>>,
    #[serde(rename = "Excluded")]
    pub excluded: IndexMap<Facet, Vec<FacetValue>>,
    #[serde(rename = "Options")]
    pub options: SummaryOptions,
}

impl CriteriaSummary
{
    pub fn build(
        criteria: &Criteria,
        quantity: &QuantityPolicy,
        amount: &AmountPolicy,
        total_matches: usize,
    ) -> Self
    {
        Self {
            included: criteria
                .included()
                .clone(),
            excluded: criteria
                .excluded()
                .clone(),
            options: SummaryOptions {
                quantity: quantity.to_string(),
                items_returned: amount.describe(total_matches),
            },
        }
    }

    /// Rendered markup: one `<strong>` heading per section followed by its
    /// rows. Sections with nothing to show are left out entirely.
    pub fn render(&self) -> String
    {
        let options: Vec<(&str, Option<&str>)> = vec![
            ("Quantity", Some(self.options.quantity.as_str())),
            ("Items Returned", Some(self.options.items_returned.as_str())),
        ];

        [
            render_section("Included", selection_rows(&self.included)),
            render_section("Excluded", selection_rows(&self.excluded)),
            render_section("Options", scalar_rows(&options)),
        ]
        .into_iter()
        .flatten()
        .join("<br><br>")
    }
}

fn selection_rows(selections: &Selections) -> Vec<(String, String)>
{
    selections
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(facet, values)| (title_case(facet.as_str()), values.iter().join(", ")))
        .collect()
}

fn scalar_rows(rows: &[(&str, Option<&str>)]) -> Vec<(String, String)>
{
    rows.iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| (title_case(label), v.to_string()))
        })
        .collect()
}

fn render_section(
    title: &str,
    rows: Vec<(String, String)>,
) -> Option<String>
{
    if rows.is_empty()
    {
        return None;
    }

    let body = rows
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .join("<br>");

    Some(format!("<strong>{title}:</strong><br>{body}"))
}

/// Uppercase the first character of every word.
fn title_case(label: &str) -> String
{
    let mut out = String::with_capacity(label.len());
    let mut in_word = false;

    for c in label.chars()
    {
        let word_char = c.is_alphanumeric() || c == '_';
        if word_char && !in_word
        {
            out.extend(c.to_uppercase());
        }
        else
        {
            out.push(c);
        }
        in_word = word_char;
    }

    out
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn criteria() -> Criteria
    {
        Criteria::new()
            .include(Facet::Type, ["weapon", "armor"])
            .include(Facet::Level, [FacetValue::Int(1), FacetValue::Int(2)])
    }

    #[test]
    fn structured_summary_describes_policies()
    {
        let summary = CriteriaSummary::build(
            &criteria(),
            &QuantityPolicy::Random { min: 1, max: 4 },
            &AmountPolicy::Fixed(10),
            3,
        );

        assert_eq!(summary.options.quantity, "Random (1-4)");
        assert_eq!(summary.options.items_returned, "Set (3)");
        assert!(summary.excluded.is_empty());

        let json = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(json["Included"]["level"], serde_json::json!([1, 2]));
        assert_eq!(json["Options"]["Items Returned"], "Set (3)");
    }

    #[test]
    fn rendering_skips_empty_sections()
    {
        let summary = CriteriaSummary::build(&criteria(), &QuantityPolicy::Fixed(1), &AmountPolicy::All, 0);

        insta::assert_snapshot!(
            summary.render(),
            @"<strong>Included:</strong><br>Type: weapon, armor<br>Level: 1, 2<br><br><strong>Options:</strong><br>Quantity: Set (1)<br>Items Returned: All"
        );
    }

    #[test]
    fn rendering_with_nothing_but_options()
    {
        let summary =
            CriteriaSummary::build(&Criteria::new(), &QuantityPolicy::Fixed(3), &AmountPolicy::Random { min: 2, max: 5 }, 9);
        assert_eq!(
            summary.render(),
            "<strong>Options:</strong><br>Quantity: Set (3)<br>Items Returned: Random (2-5)"
        );
    }

    #[test]
    fn title_case_capitalizes_each_word()
    {
        assert_eq!(title_case("items returned"), "Items Returned");
        assert_eq!(title_case("level"), "Level");
        assert_eq!(title_case("a-b"), "A-B");
    }
}
