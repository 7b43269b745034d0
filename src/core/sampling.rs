//! Randomized selection: per-item quantities and subset sampling without
//! replacement. All randomness flows through a caller-supplied [`Rng`] so a
//! seeded generator gives reproducible merchants.

use rand::{
    Rng,
    distr::uniform::{SampleRange, SampleUniform},
    seq::index,
};
use tracing::debug;

use crate::core::{
    facet::Item,
    policy::{AmountPolicy, QuantityPolicy},
};

/// Uniform integer between `a` and `b` inclusive, in either order.
pub fn roll_between<T, R>(
    rng: &mut R,
    a: T,
    b: T,
) -> T
where
    T: SampleUniform + PartialOrd,
    std::ops::RangeInclusive<T>: SampleRange<T>,
    R: Rng + ?Sized,
{
    if a <= b
    {
        rng.random_range(a..=b)
    }
    else
    {
        rng.random_range(b..=a)
    }
}

/// `k` distinct indices from `[0, n)`, ascending.
///
/// When `k >= n` every index is returned without consulting the generator.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    k: usize,
) -> Vec<usize>
{
    if k >= n
    {
        return (0..n).collect();
    }

    let mut picked = index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}

impl QuantityPolicy
{
    /// Stack count for one item; random policies draw independently per call.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> u32
    {
        match *self
        {
            QuantityPolicy::Fixed(n) => n,
            QuantityPolicy::Random { min, max } => roll_between(rng, min, max),
        }
    }
}

impl AmountPolicy
{
    /// Indices into a match set of size `n` that survive the cut, ascending.
    pub fn select_indices<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> Vec<usize>
    {
        match *self
        {
            AmountPolicy::All => (0..n).collect(),
            AmountPolicy::Fixed(count) => sample_indices(rng, n, count.min(n)),
            AmountPolicy::Random { min, max } =>
            {
                if n == 0
                {
                    return Vec::new();
                }

                let upper = min.max(max).min(n);
                let lower = min.min(max).min(upper);
                let target = roll_between(rng, lower, upper);
                debug!(lower, upper, target, "random amount drawn");
                sample_indices(rng, n, target)
            }
        }
    }
}

/// A matched item that made the cut, with its resolved stack count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selected<'a>
{
    pub item: &'a Item,
    pub quantity: u32,
}

/// Apply the amount policy to the ranked matches, then give every survivor a
/// quantity. Ranking order is preserved.
pub fn select<'a, R: Rng + ?Sized>(
    rng: &mut R,
    ranked: &[&'a Item],
    amount: &AmountPolicy,
    quantity: &QuantityPolicy,
) -> Vec<Selected<'a>>
{
    amount
        .select_indices(rng, ranked.len())
        .into_iter()
        .map(|i| Selected { item: ranked[i], quantity: quantity.resolve(rng) })
        .collect()
}
