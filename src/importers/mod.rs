// Import module - brokerage statements and platform trade histories

pub mod brokerage;
pub mod cells;
pub mod columns;
pub mod decode;
pub mod platform;

use tracing::info;

use crate::config::Settings;
use crate::error::{Result, Warning};
use crate::models::{RawTable, Source, SummaryMap};

pub use columns::{resolve_columns, ColumnMap, Field, Schema};
pub use decode::{decode_bytes, FileFormat};

/// Per-symbol summaries for one source plus the recoverable issues found
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub summaries: SummaryMap,
    pub warnings: Vec<Warning>,
}

/// The two input shapes behind one parsing contract
///
/// Brokerage tables carry one row per symbol; platform tables carry one row
/// per fill, one table per instrument. Downstream code only sees the
/// resulting `SummaryMap`.
#[derive(Debug, Clone)]
pub enum SourceParser {
    Brokerage(Schema),
    Platform(Schema),
}

impl SourceParser {
    /// Parser for a source with built-in synonyms plus any configured extras
    pub fn for_source(source: Source, settings: &Settings) -> Self {
        match source {
            Source::Kite => SourceParser::Brokerage(
                Schema::brokerage().with_extra_synonyms(&settings.columns.kite),
            ),
            Source::TradingView => SourceParser::Platform(
                Schema::platform().with_extra_synonyms(&settings.columns.tradingview),
            ),
        }
    }

    pub fn source(&self) -> Source {
        match self {
            SourceParser::Brokerage(_) => Source::Kite,
            SourceParser::Platform(_) => Source::TradingView,
        }
    }

    pub fn schema(&self) -> &Schema {
        match self {
            SourceParser::Brokerage(schema) | SourceParser::Platform(schema) => schema,
        }
    }

    pub fn parse(&self, tables: &[RawTable]) -> Result<ParsedSource> {
        info!("Parsing {} {} table(s)", tables.len(), self.source());
        match self {
            SourceParser::Brokerage(schema) => brokerage::parse_brokerage(tables, schema),
            SourceParser::Platform(schema) => platform::parse_platform(tables, schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SymbolKey;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parsers_share_one_contract() {
        let settings = Settings::default();
        let kite = RawTable::from_strings(
            "kite.csv",
            &["Symbol", "Quantity", "Buy Value", "Sell Value", "Realized P&L"],
            &[&["A", "1", "100", "150", "50"]],
        );
        let tv = RawTable::from_strings(
            "A.csv",
            &["Date", "Action", "Quantity", "Price"],
            &[&["2024-01-01", "Buy", "1", "100"], &["2024-01-02", "Sell", "1", "140"]],
        );

        let parsers = [
            (SourceParser::for_source(Source::Kite, &settings), vec![kite]),
            (SourceParser::for_source(Source::TradingView, &settings), vec![tv]),
        ];

        let pnls: Vec<_> = parsers
            .iter()
            .map(|(parser, tables)| {
                let parsed = parser.parse(tables).unwrap();
                parsed
                    .summaries
                    .get(&SymbolKey::new("a").unwrap())
                    .unwrap()
                    .realized_pnl
            })
            .collect();

        assert_eq!(pnls, vec![dec!(50), dec!(40)]);
        assert_eq!(parsers[1].0.source(), Source::TradingView);
    }
}
