//! Aggregates over per-source summaries and reconciliation deltas
//!
//! All sums are exact `Decimal` arithmetic. Undefined percentages (no cost
//! side) are skipped by the averages rather than counted as zero.

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

use crate::models::{DeltaRecord, StockSummary, SummaryMap, SymbolKey};

/// Headline numbers for one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStats {
    pub symbol_count: usize,
    pub total_pnl: Decimal,
    pub total_buy_value: Decimal,
    pub total_sell_value: Decimal,
    /// Mean over symbols with a defined percentage; None when there are none
    pub avg_pnl_pct: Option<Decimal>,
}

/// Best and worst performers by realized P&L
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    /// Best first
    pub top: Vec<StockSummary>,
    /// Worst first
    pub bottom: Vec<StockSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaStats {
    pub total_delta: Decimal,
    /// Largest |delta|; ties go to the earliest record
    pub largest_delta: Option<DeltaRecord>,
    /// Ordered by |delta| descending, truncated for display
    pub ranked: Vec<DeltaRecord>,
}

/// Profit vs. loss split for a pie-style breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    /// Sum of non-negative realized P&L
    pub profit_sum: Decimal,
    /// Sum of |negative realized P&L|
    pub loss_sum: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub symbol: SymbolKey,
    pub buy_value: Decimal,
    pub sell_value: Decimal,
    pub realized_pnl: Decimal,
}

pub fn total_pnl(summaries: &SummaryMap) -> Decimal {
    summaries.iter().map(|s| s.realized_pnl).sum()
}

pub fn source_stats(summaries: &SummaryMap) -> SourceStats {
    let defined: Vec<Decimal> = summaries
        .iter()
        .filter_map(|s| s.realized_pnl_pct)
        .collect();

    let avg_pnl_pct = if defined.is_empty() {
        None
    } else {
        let sum: Decimal = defined.iter().copied().sum();
        Some(sum / Decimal::from(defined.len()))
    };

    SourceStats {
        symbol_count: summaries.len(),
        total_pnl: total_pnl(summaries),
        total_buy_value: summaries.iter().map(|s| s.buy_value).sum(),
        total_sell_value: summaries.iter().map(|s| s.sell_value).sum(),
        avg_pnl_pct,
    }
}

/// Realized P&L descending, then symbol ascending
fn performance_order(a: &StockSummary, b: &StockSummary) -> Ordering {
    b.realized_pnl
        .cmp(&a.realized_pnl)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Top and bottom `n` performers
///
/// Both lists come from one total order, so with at least `2n` symbols they
/// are disjoint and together they always cover `min(2n, len)` symbols.
pub fn rank(summaries: &SummaryMap, n: usize) -> Rankings {
    let ordered: Vec<&StockSummary> = summaries.iter().sorted_by(|a, b| performance_order(a, b)).collect();

    Rankings {
        top: ordered.iter().take(n).map(|s| (*s).clone()).collect(),
        bottom: ordered.iter().rev().take(n).map(|s| (*s).clone()).collect(),
    }
}

/// Deltas ordered by magnitude, largest first; stable for equal magnitudes
pub fn rank_by_magnitude(deltas: &[DeltaRecord]) -> Vec<DeltaRecord> {
    deltas
        .iter()
        .sorted_by(|a, b| b.delta.abs().cmp(&a.delta.abs()))
        .cloned()
        .collect()
}

pub fn delta_stats(deltas: &[DeltaRecord], display_limit: usize) -> DeltaStats {
    let total_delta = deltas.iter().map(|d| d.delta).sum();

    let mut largest: Option<&DeltaRecord> = None;
    for record in deltas {
        match largest {
            Some(current) if record.delta.abs() <= current.delta.abs() => {}
            _ => largest = Some(record),
        }
    }

    let mut ranked = rank_by_magnitude(deltas);
    ranked.truncate(display_limit);

    DeltaStats {
        total_delta,
        largest_delta: largest.cloned(),
        ranked,
    }
}

pub fn distribution(summaries: &SummaryMap) -> Distribution {
    let (profit_sum, loss_sum) = summaries.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(profit, loss), s| {
            if s.realized_pnl >= Decimal::ZERO {
                (profit + s.realized_pnl, loss)
            } else {
                (profit, loss + s.realized_pnl.abs())
            }
        },
    );
    Distribution {
        profit_sum,
        loss_sum,
    }
}

/// Per-symbol (buy, sell, pnl) triples, passed through unchanged
pub fn scatter(summaries: &SummaryMap) -> Vec<ScatterPoint> {
    summaries
        .iter()
        .map(|s| ScatterPoint {
            symbol: s.symbol.clone(),
            buy_value: s.buy_value,
            sell_value: s.sell_value,
            realized_pnl: s.realized_pnl,
        })
        .collect()
}
