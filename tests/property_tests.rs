//! Property-based tests for lot matching, reconciliation and aggregation
//!
//! Generated inputs via `proptest`; amounts are whole paise so every
//! expected value is exact in Decimal arithmetic.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tradecheck::cost_basis::{FifoMatcher, OpenLot};
use tradecheck::importers::platform::parse_platform;
use tradecheck::importers::Schema;
use tradecheck::models::{percentage, RawTable, StockSummary, SummaryMap, SymbolKey};
use tradecheck::reconcile::reconcile;
use tradecheck::reports::summary::total_pnl;
use tradecheck::reports::{rank, source_stats};

// =============================================================================
// Generators
// =============================================================================

fn paise(range: std::ops::Range<i64>) -> impl Strategy<Value = Decimal> {
    range.prop_map(|p| Decimal::new(p, 2))
}

fn day(offset: i64) -> NaiveDateTime {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(9, 15, 0))
        .unwrap();
    base + Duration::days(offset)
}

fn summary(symbol: &str, pnl: Decimal) -> StockSummary {
    let buy_value = Decimal::new(100_000, 2);
    StockSummary {
        symbol: SymbolKey::new(symbol).unwrap(),
        isin: None,
        quantity: Decimal::ONE,
        buy_value,
        sell_value: buy_value + pnl,
        realized_pnl: pnl,
        realized_pnl_pct: percentage(pnl, buy_value),
        unrealized_pnl: None,
        open_quantity: None,
    }
}

/// Summaries drawn from a small symbol pool so two maps overlap
fn arb_summary_map() -> impl Strategy<Value = SummaryMap> {
    proptest::collection::vec((0usize..8, paise(-1_000_000..1_000_000)), 0..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(idx, pnl)| summary(&format!("SYM{idx}"), pnl))
            .collect()
    })
}

/// `len` distinct symbols with arbitrary (possibly tied) P&L
fn arb_distinct_map() -> impl Strategy<Value = SummaryMap> {
    proptest::collection::vec(paise(-500..500), 0..24).prop_map(|pnls| {
        pnls.into_iter()
            .enumerate()
            .map(|(idx, pnl)| summary(&format!("S{idx:02}"), pnl))
            .collect()
    })
}

/// (quantity, price) fills
fn arb_fills(max: usize) -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
    proptest::collection::vec((paise(1..100_000), paise(1..1_000_000)), 1..max)
}

fn open_lots(matcher: &FifoMatcher) -> Vec<OpenLot> {
    matcher.open_lots().cloned().collect()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Closed plus open quantity always equals what was bought, and each
    /// sale's P&L is its proceeds minus the cost of the lots it consumed
    #[test]
    fn prop_fifo_conserves_quantity_and_cost(
        buys in arb_fills(10),
        sells in arb_fills(10),
    ) {
        let mut matcher = FifoMatcher::new();
        let mut bought = Decimal::ZERO;
        let mut bought_cost = Decimal::ZERO;
        for (i, (qty, price)) in buys.iter().enumerate() {
            matcher.add_purchase(day(i as i64), *qty, *price);
            bought += qty;
            bought_cost += qty * price;
        }

        let mut closed = Decimal::ZERO;
        let mut closed_cost = Decimal::ZERO;
        for (qty, price) in &sells {
            let before = open_lots(&matcher);
            match matcher.match_sale(*qty, *price) {
                Ok(sale) => {
                    let lot_qty: Decimal = sale.matched_lots.iter().map(|l| l.quantity).sum();
                    let lot_cost: Decimal = sale.matched_lots.iter().map(|l| l.cost).sum();
                    prop_assert_eq!(lot_qty, *qty);
                    prop_assert_eq!(lot_cost, sale.cost_basis);
                    prop_assert_eq!(sale.proceeds, qty * price);
                    prop_assert_eq!(sale.profit_loss, sale.proceeds - sale.cost_basis);
                    closed += sale.quantity;
                    closed_cost += sale.cost_basis;
                }
                Err(_) => {
                    prop_assert_eq!(open_lots(&matcher), before);
                }
            }
            prop_assert_eq!(closed + matcher.open_quantity(), bought);
            prop_assert_eq!(closed_cost + matcher.open_cost(), bought_cost);
        }
    }

    /// Selling more than is open is always rejected and changes nothing
    #[test]
    fn prop_oversell_is_rejected_and_lots_unchanged(
        buys in arb_fills(8),
        partial in paise(0..100),
        excess in paise(1..100_000),
        price in paise(1..1_000_000),
    ) {
        let mut matcher = FifoMatcher::new();
        for (i, (qty, p)) in buys.iter().enumerate() {
            matcher.add_purchase(day(i as i64), *qty, *p);
        }
        // Leave the queue partially consumed first
        let first = partial.min(matcher.open_quantity());
        if first > Decimal::ZERO {
            prop_assert!(matcher.match_sale(first, price).is_ok());
        }

        let before = open_lots(&matcher);
        let open = matcher.open_quantity();
        let err = matcher.match_sale(open + excess, price).unwrap_err();

        prop_assert_eq!(err.available, open);
        prop_assert_eq!(err.requested, open + excess);
        prop_assert_eq!(open_lots(&matcher), before);
    }

    /// Swapping the sources negates every delta and mirrors the unmatched sets
    #[test]
    fn prop_reconcile_is_antisymmetric(a in arb_summary_map(), b in arb_summary_map()) {
        let ab = reconcile(&a, &b);
        let ba = reconcile(&b, &a);

        prop_assert_eq!(ab.deltas.len(), ba.deltas.len());
        for record in &ab.deltas {
            let mirrored = ba.deltas.iter().find(|d| d.symbol == record.symbol);
            prop_assert!(mirrored.is_some());
            if let Some(mirrored) = mirrored {
                prop_assert_eq!(record.delta, -mirrored.delta);
                prop_assert_eq!(record.kite_pnl, mirrored.tradingview_pnl);
            }
        }

        let set = |keys: &[SymbolKey]| keys.iter().cloned().collect::<HashSet<_>>();
        prop_assert_eq!(set(&ab.unmatched.kite_only), set(&ba.unmatched.tradingview_only));
        prop_assert_eq!(set(&ab.unmatched.tradingview_only), set(&ba.unmatched.kite_only));
    }

    /// Totals are the exact Decimal sum, independent of input order
    #[test]
    fn prop_total_pnl_is_exact(map in arb_distinct_map()) {
        let expected = map.iter().fold(Decimal::ZERO, |acc, s| acc + s.realized_pnl);
        let reversed: SummaryMap = map.iter().rev().cloned().collect();

        prop_assert_eq!(total_pnl(&map), expected);
        prop_assert_eq!(total_pnl(&reversed), expected);
        prop_assert_eq!(source_stats(&map).total_pnl, expected);
    }

    /// Top and bottom cover min(2n, len) symbols and never overlap when
    /// there are enough symbols to fill both lists
    #[test]
    fn prop_rankings_cover_expected_symbols(map in arb_distinct_map(), n in 0usize..8) {
        let rankings = rank(&map, n);
        let top: HashSet<_> = rankings.top.iter().map(|s| s.symbol.clone()).collect();
        let bottom: HashSet<_> = rankings.bottom.iter().map(|s| s.symbol.clone()).collect();

        prop_assert_eq!(rankings.top.len(), n.min(map.len()));
        prop_assert_eq!(rankings.bottom.len(), n.min(map.len()));
        prop_assert_eq!(top.union(&bottom).count(), (2 * n).min(map.len()));
        if map.len() >= 2 * n {
            prop_assert!(top.is_disjoint(&bottom));
        }
        prop_assert!(rankings.top.windows(2).all(|w| w[0].realized_pnl >= w[1].realized_pnl));
        prop_assert!(rankings.bottom.windows(2).all(|w| w[0].realized_pnl <= w[1].realized_pnl));
    }

    /// A history gives the same summary whether listed oldest or newest first
    #[test]
    fn prop_history_order_does_not_change_summary(
        fills in proptest::collection::vec((any::<bool>(), 1i64..50, 1i64..10_000), 1..15),
    ) {
        let mut open = 0i64;
        let mut rows: Vec<Vec<String>> = Vec::new();
        for (i, (sell, qty, price)) in fills.iter().enumerate() {
            // Only sell what is open so the history stays valid
            let (action, qty) = if *sell && open > 0 {
                ("Sell", (*qty).min(open))
            } else {
                ("Buy", *qty)
            };
            open += if action == "Buy" { qty } else { -qty };
            rows.push(vec![
                day(i as i64).format("%Y-%m-%d").to_string(),
                action.to_string(),
                qty.to_string(),
                Decimal::new(*price, 2).to_string(),
            ]);
        }

        let parse = |rows: &[Vec<String>]| {
            let cells: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
            let refs: Vec<&[&str]> = cells.iter().map(|r| r.as_slice()).collect();
            let table = RawTable::from_strings("INFY.csv", &["Date", "Action", "Quantity", "Price"], &refs);
            parse_platform(&[table], &Schema::platform())
        };

        let oldest_first = parse(&rows).unwrap();
        let newest_first: Vec<Vec<String>> = rows.iter().rev().cloned().collect();
        let newest_first = parse(&newest_first).unwrap();

        prop_assert_eq!(oldest_first.summaries, newest_first.summaries);
    }
}
