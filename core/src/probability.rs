//! Weighted-pool arithmetic shared by loot groups and attachment pools:
//! balancing a pool to a target sum and sampling from its cumulative
//! distribution.
//!
//! Pool order is the map's insertion order and is part of the sampling
//! contract: the same ordered pool and the same RNG stream always select
//! the same entries.

use indexmap::IndexMap;
use std::cell::OnceCell;

/// Percent scale every pool is balanced to.
pub const PROBABILITY_TARGET: f64 = 100.0;

/// Sums within this distance of the target count as balanced.
pub const BALANCE_EPSILON: f64 = 1e-3;

/// Anything carrying a probability in a weighted pool.
pub trait Weighted {
    fn weight(&self) -> f64;
    fn set_weight(&mut self, weight: f64);
}

impl Weighted for f64 {
    fn weight(&self) -> f64 {
        *self
    }
    fn set_weight(&mut self, weight: f64) {
        *self = weight;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceMode {
    /// Rebalance whenever the sum is off target in either direction.
    Always,
    /// Rebalance only when the sum exceeds the target. Pools summing
    /// below the target keep their "nothing selected" share.
    IfOver,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceOutcome {
    pub sum_before: f64,
    pub sum_after: f64,
}

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn pool_sum<V: Weighted>(pool: &IndexMap<String, V>) -> f64 {
    pool.values().map(Weighted::weight).sum()
}

/// Scale every weight by `target / sum`, rounded to two decimals, then
/// push the rounding drift onto the entry that was largest before
/// scaling (first occurrence wins ties).
///
/// Returns `None` when nothing changed: empty pool, non-positive sum,
/// or a sum already balanced under `mode`.
pub fn balance<V: Weighted>(
    pool: &mut IndexMap<String, V>,
    target: f64,
    mode: BalanceMode,
) -> Option<BalanceOutcome> {
    let sum_before = pool_sum(pool);
    if pool.is_empty() || sum_before <= 0.0 || !sum_before.is_finite() {
        return None;
    }

    let off_target = match mode {
        BalanceMode::Always => (sum_before - target).abs() > BALANCE_EPSILON,
        BalanceMode::IfOver => sum_before - target > BALANCE_EPSILON,
    };
    if !off_target {
        return None;
    }

    let ratio = target / sum_before;
    let mut largest_index = 0;
    let mut largest_value = pool.get_index(0).map(|(_, v)| v.weight())?;

    for (index, (_, entry)) in pool.iter_mut().enumerate() {
        let weight = entry.weight();
        if weight > largest_value {
            largest_value = weight;
            largest_index = index;
        }
        entry.set_weight(round2(weight * ratio));
    }

    let drift = round2(target - pool_sum(pool));
    if let Some((_, largest)) = pool.get_index_mut(largest_index) {
        largest.set_weight(round2(largest.weight() + drift));
    }

    Some(BalanceOutcome {
        sum_before,
        sum_after: pool_sum(pool),
    })
}

/// Running sums of a sequence of weights.
pub fn cumulative_weights<I>(weights: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut running = 0.0;
    weights
        .into_iter()
        .map(|w| {
            running += w;
            running
        })
        .collect()
}

/// Index of the first cumulative value strictly greater than `draw`.
/// A draw landing exactly on a boundary goes to the next entry.
/// Draws at or past the final value select nothing.
pub fn select_index(cumulative: &[f64], draw: f64) -> Option<usize> {
    let index = cumulative.partition_point(|&c| c <= draw);
    (index < cumulative.len()).then_some(index)
}

/// Lazily built cumulative distribution of a weighted pool.
///
/// The cell is the dirty flag: empty means stale. Owners call
/// [`CumulativeTable::invalidate`] on every mutation of the pool and the
/// next sampling call rebuilds it.
#[derive(Debug, Clone, Default)]
pub struct CumulativeTable {
    cached: OnceCell<Vec<f64>>,
}

impl CumulativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.cached.take();
    }

    pub fn is_built(&self) -> bool {
        self.cached.get().is_some()
    }

    /// Return the cached sequence, building it from `weights` if stale.
    pub fn get_or_build<I, F>(&self, weights: F) -> &[f64]
    where
        F: FnOnce() -> I,
        I: IntoIterator<Item = f64>,
    {
        self.cached.get_or_init(|| cumulative_weights(weights()))
    }

    /// Drop any cached sequence and build a fresh one now.
    pub fn rebuild<I>(&mut self, weights: I)
    where
        I: IntoIterator<Item = f64>,
    {
        self.cached = OnceCell::from(cumulative_weights(weights));
    }
}
