use serde::Serialize;
use tracing::{info, warn};

use crate::error::Warning;
use crate::models::{DeltaRecord, SummaryMap, SymbolKey};

/// Symbols present in only one of the two sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Unmatched {
    pub kite_only: Vec<SymbolKey>,
    pub tradingview_only: Vec<SymbolKey>,
}

/// Output of joining the two sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// One record per common symbol, in brokerage input order
    pub deltas: Vec<DeltaRecord>,
    pub unmatched: Unmatched,
    pub warnings: Vec<Warning>,
}

/// Inner-join the sources on symbol and compute per-symbol deltas
///
/// Deterministic for a fixed pair of inputs. Order follows `kite`'s input
/// order and carries no meaning beyond tie-breaking. Swapping the arguments
/// negates every delta.
pub fn reconcile(kite: &SummaryMap, tradingview: &SummaryMap) -> Reconciliation {
    let mut deltas = Vec::new();
    let mut unmatched = Unmatched::default();
    let mut warnings = Vec::new();

    for summary in kite {
        match tradingview.get(&summary.symbol) {
            Some(other) => {
                if let (Some(k), Some(t)) = (&summary.isin, &other.isin) {
                    if k != t {
                        warn!("{}: ISIN {} vs {}", summary.symbol, k, t);
                        warnings.push(Warning::IsinMismatch {
                            symbol: summary.symbol.to_string(),
                            kite: k.clone(),
                            tradingview: t.clone(),
                        });
                    }
                }
                deltas.push(DeltaRecord::new(
                    summary.symbol.clone(),
                    summary.realized_pnl,
                    other.realized_pnl,
                ));
            }
            None => unmatched.kite_only.push(summary.symbol.clone()),
        }
    }

    unmatched.tradingview_only = tradingview
        .keys()
        .filter(|key| !kite.contains_key(key))
        .cloned()
        .collect();

    if deltas.is_empty() {
        warn!("No symbols are common to both sources");
        warnings.push(Warning::NoMatch);
    }

    info!(
        "Reconciled {} symbols ({} brokerage-only, {} platform-only)",
        deltas.len(),
        unmatched.kite_only.len(),
        unmatched.tradingview_only.len()
    );

    Reconciliation {
        deltas,
        unmatched,
        warnings,
    }
}
