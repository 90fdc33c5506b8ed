use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The two record providers being reconciled
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Kite,        // Brokerage P&L statement, one row per symbol
    TradingView, // Charting-platform trade history, one file per symbol
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Kite => "Kite",
            Source::TradingView => "TradingView",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kite" | "brokerage" | "zerodha" => Ok(Source::Kite),
            "tradingview" | "tv" | "platform" => Ok(Source::TradingView),
            _ => Err(()),
        }
    }
}

/// A single decoded spreadsheet/CSV cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.trim()),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One input record, cells aligned with the owning table's headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `idx`; short rows read as empty
    pub fn get(&self, idx: usize) -> &CellValue {
        self.cells.get(idx).unwrap_or(&EMPTY_CELL)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// A decoded table: header labels plus data rows
///
/// `name` identifies where the table came from (usually the file name) and
/// doubles as the instrument identity for per-symbol trade histories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a table from string literals, handy for callers holding text grids
    pub fn from_strings(name: impl Into<String>, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| RawRow::new(r.iter().map(|c| CellValue::from(*c)).collect()))
                .collect(),
        }
    }
}

/// Normalized instrument identifier used as the join key
///
/// Trimmed, whitespace-free, upper-cased. An exchange prefix (`NSE:INFY`) and
/// a trailing series suffix (`INFY-EQ`) are stripped so both exports agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SymbolKey(String);

const SERIES_SUFFIXES: [&str; 3] = ["-EQ", "-BE", "-BZ"];

impl SymbolKey {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let without_exchange = match trimmed.rsplit_once(':') {
            Some((_, rest)) => rest,
            None => trimmed,
        };

        let mut symbol: String = without_exchange
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        for suffix in SERIES_SUFFIXES {
            if symbol.len() > suffix.len() && symbol.ends_with(suffix) {
                symbol.truncate(symbol.len() - suffix.len());
                break;
            }
        }

        if symbol.is_empty() {
            None
        } else {
            Some(SymbolKey(symbol))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-symbol realized performance from one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSummary {
    pub symbol: SymbolKey,
    pub isin: Option<String>,
    pub quantity: Decimal,
    pub buy_value: Decimal,
    pub sell_value: Decimal,
    pub realized_pnl: Decimal,
    /// None when the cost side is zero; never a divide-by-zero artifact
    pub realized_pnl_pct: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>, // Brokerage only
    pub open_quantity: Option<Decimal>,  // Brokerage only
}

/// Percentage of `numerator` over `denominator`, None for a zero denominator
pub fn percentage(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        numerator
            .checked_div(denominator)
            .map(|ratio| ratio * Decimal::ONE_HUNDRED)
    }
}

/// Symbol -> summary mapping that remembers input order
///
/// Lookups go through the hash index; iteration follows insertion order so
/// "first in input order" tie-breaks are well defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMap {
    entries: Vec<StockSummary>,
    index: HashMap<SymbolKey, usize>,
}

impl SummaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a summary, replacing (in place) any existing one for the symbol
    pub fn insert(&mut self, summary: StockSummary) -> Option<StockSummary> {
        match self.index.get(&summary.symbol) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos], summary)),
            None => {
                self.index.insert(summary.symbol.clone(), self.entries.len());
                self.entries.push(summary);
                None
            }
        }
    }

    pub fn get(&self, key: &SymbolKey) -> Option<&StockSummary> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn contains_key(&self, key: &SymbolKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StockSummary> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SymbolKey> {
        self.entries.iter().map(|s| &s.symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<StockSummary> for SummaryMap {
    fn from_iter<I: IntoIterator<Item = StockSummary>>(iter: I) -> Self {
        let mut map = SummaryMap::new();
        for summary in iter {
            map.insert(summary);
        }
        map
    }
}

impl<'a> IntoIterator for &'a SummaryMap {
    type Item = &'a StockSummary;
    type IntoIter = std::slice::Iter<'a, StockSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for SummaryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

/// Cross-source comparison for one symbol present in both sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRecord {
    pub symbol: SymbolKey,
    pub kite_pnl: Decimal,
    pub tradingview_pnl: Decimal,
    /// kite_pnl - tradingview_pnl
    pub delta: Decimal,
    /// delta / |tradingview_pnl| * 100, None when tradingview_pnl is zero
    pub delta_pct: Option<Decimal>,
}

impl DeltaRecord {
    pub fn new(symbol: SymbolKey, kite_pnl: Decimal, tradingview_pnl: Decimal) -> Self {
        let delta = kite_pnl - tradingview_pnl;
        Self {
            symbol,
            kite_pnl,
            tradingview_pnl,
            delta,
            delta_pct: percentage(delta, tradingview_pnl.abs()),
        }
    }
}

/// Trade side on the platform export
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl FromStr for TradeAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" | "bought" | "long" => Ok(TradeAction::Buy),
            "sell" | "s" | "sold" | "short" => Ok(TradeAction::Sell),
            _ => Err(()),
        }
    }
}
