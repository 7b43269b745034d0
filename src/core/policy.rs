//! Quantity and amount policies, and the clamping rules that turn raw form
//! input into them. Bad numbers never error: they fall back to a minimum.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::criteria::FormValue;

pub const QUANTITY_MIN: i64 = 1;
pub const QUANTITY_MAX: i64 = 99;
pub const AMOUNT_MIN: i64 = 1;
/// Largest integer a double represents exactly (2^53 - 1).
pub const AMOUNT_MAX: i64 = 9_007_199_254_740_991;

/// Parse, floor and clamp a raw number into `[min, max]`.
///
/// Missing, unparseable or non-finite input yields `fallback` unchanged.
pub fn clamp_integer(
    raw: Option<&FormValue>,
    min: i64,
    max: i64,
    fallback: i64,
) -> i64
{
    match raw.and_then(FormValue::as_f64)
    {
        Some(n) if n.is_finite() => (n.floor() as i64).clamp(min, max),
        _ => fallback,
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QuantityMode
{
    #[default]
    Set,
    Random,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AmountMode
{
    #[default]
    All,
    Set,
    Random,
}

/// Stack count given to each selected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityPolicy
{
    Fixed(u32),
    /// Each item draws its own count in `[min, max]`.
    Random
    {
        min: u32,
        max: u32,
    },
}

impl QuantityPolicy
{
    pub fn fixed(amount: i64) -> Self
    {
        QuantityPolicy::Fixed(amount.clamp(QUANTITY_MIN, QUANTITY_MAX) as u32)
    }

    /// Bounds are clamped into range and reordered so `min <= max`.
    pub fn random(
        a: i64,
        b: i64,
    ) -> Self
    {
        let a = a.clamp(QUANTITY_MIN, QUANTITY_MAX) as u32;
        let b = b.clamp(QUANTITY_MIN, QUANTITY_MAX) as u32;
        QuantityPolicy::Random { min: a.min(b), max: a.max(b) }
    }
}

impl Default for QuantityPolicy
{
    fn default() -> Self
    {
        QuantityPolicy::Fixed(QUANTITY_MIN as u32)
    }
}

impl fmt::Display for QuantityPolicy
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            QuantityPolicy::Fixed(n) => write!(f, "Set ({n})"),
            QuantityPolicy::Random { min, max } => write!(f, "Random ({min}-{max})"),
        }
    }
}

/// How many distinct matched items make the final cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmountPolicy
{
    #[default]
    All,
    Fixed(usize),
    Random
    {
        min: usize,
        max: usize,
    },
}

impl AmountPolicy
{
    pub fn fixed(count: i64) -> Self
    {
        AmountPolicy::Fixed(to_count(count))
    }

    pub fn random(
        a: i64,
        b: i64,
    ) -> Self
    {
        let (a, b) = (to_count(a), to_count(b));
        AmountPolicy::Random { min: a.min(b), max: a.max(b) }
    }

    /// Human description; a fixed count is reported as what the match set
    /// could actually supply.
    pub fn describe(
        &self,
        total_matches: usize,
    ) -> String
    {
        match self
        {
            AmountPolicy::All => "All".to_string(),
            AmountPolicy::Fixed(count) => format!("Set ({})", (*count).min(total_matches)),
            AmountPolicy::Random { min, max } => format!("Random ({min}-{max})"),
        }
    }
}

fn to_count(n: i64) -> usize
{
    usize::try_from(n.clamp(AMOUNT_MIN, AMOUNT_MAX)).unwrap_or(usize::MAX)
}

/// Raw quantity section of the merchant form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantityForm
{
    pub mode: QuantityMode,
    pub set: Option<FormValue>,
    pub min: Option<FormValue>,
    pub max: Option<FormValue>,
}

impl QuantityForm
{
    pub fn to_policy(&self) -> QuantityPolicy
    {
        match self.mode
        {
            QuantityMode::Set => QuantityPolicy::fixed(clamp_integer(
                self.set
                    .as_ref(),
                QUANTITY_MIN,
                QUANTITY_MAX,
                QUANTITY_MIN,
            )),
            QuantityMode::Random =>
            {
                let min = clamp_integer(
                    self.min
                        .as_ref(),
                    QUANTITY_MIN,
                    QUANTITY_MAX,
                    QUANTITY_MIN,
                );
                let max = clamp_integer(
                    self.max
                        .as_ref(),
                    QUANTITY_MIN,
                    QUANTITY_MAX,
                    min,
                );
                QuantityPolicy::random(min, max)
            }
        }
    }
}

/// Raw amount section of the merchant form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountForm
{
    pub mode: AmountMode,
    pub set: Option<FormValue>,
    pub min: Option<FormValue>,
    pub max: Option<FormValue>,
}

impl AmountForm
{
    pub fn to_policy(&self) -> AmountPolicy
    {
        match self.mode
        {
            AmountMode::All => AmountPolicy::All,
            AmountMode::Set => AmountPolicy::fixed(clamp_integer(
                self.set
                    .as_ref(),
                AMOUNT_MIN,
                AMOUNT_MAX,
                AMOUNT_MIN,
            )),
            AmountMode::Random =>
            {
                let min = clamp_integer(
                    self.min
                        .as_ref(),
                    AMOUNT_MIN,
                    AMOUNT_MAX,
                    AMOUNT_MIN,
                );
                let max = clamp_integer(
                    self.max
                        .as_ref(),
                    AMOUNT_MIN,
                    AMOUNT_MAX,
                    min,
                );
                AmountPolicy::random(min, max)
            }
        }
    }
}
