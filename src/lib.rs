//! Tradecheck - brokerage vs. charting-platform P&L reconciliation
//!
//! This library parses a Kite P&L statement and TradingView trade histories
//! into per-symbol summaries, reconciles them by symbol, and produces
//! rankings, deltas, a flat export and chart descriptors.

pub mod analysis;
pub mod config;
pub mod cost_basis;
pub mod error;
pub mod importers;
pub mod models;
pub mod reconcile;
pub mod reports;
pub mod utils;

pub use analysis::{analyze, AnalysisInput, AnalysisResult};
pub use config::Settings;
pub use error::{ReconcileError, Warning};
