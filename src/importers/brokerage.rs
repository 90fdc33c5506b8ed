use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::cells::parse_decimal;
use super::columns::{resolve_columns, Field, Schema};
use super::ParsedSource;
use crate::error::{ReconcileError, Result, Warning};
use crate::models::{percentage, RawRow, RawTable, Source, StockSummary, SummaryMap, SymbolKey};

/// Column mapping for brokerage P&L statements
#[derive(Debug)]
struct BrokerageColumns {
    symbol: usize,
    quantity: usize,
    buy_value: usize,
    sell_value: usize,
    realized_pnl: usize,
    isin: Option<usize>,
    realized_pnl_pct: Option<usize>,
    open_quantity: Option<usize>,
    unrealized_pnl: Option<usize>,
}

impl BrokerageColumns {
    fn resolve(table: &RawTable, schema: &Schema) -> Result<Self> {
        let map = resolve_columns(&table.headers, schema, &table.name)?;
        Ok(BrokerageColumns {
            symbol: map.required(Field::Symbol, &table.name)?,
            quantity: map.required(Field::Quantity, &table.name)?,
            buy_value: map.required(Field::BuyValue, &table.name)?,
            sell_value: map.required(Field::SellValue, &table.name)?,
            realized_pnl: map.required(Field::RealizedPnl, &table.name)?,
            isin: map.get(Field::Isin),
            realized_pnl_pct: map.get(Field::RealizedPnlPct),
            open_quantity: map.get(Field::OpenQuantity),
            unrealized_pnl: map.get(Field::UnrealizedPnl),
        })
    }
}

/// Parse brokerage statements (one row per symbol) into per-symbol summaries
///
/// Usually a single table. Rows without a symbol are dropped with a warning;
/// a required numeric field that fails to parse fails the whole run.
pub fn parse_brokerage(tables: &[RawTable], schema: &Schema) -> Result<ParsedSource> {
    let mut summaries = SummaryMap::new();
    let mut warnings = Vec::new();

    for table in tables {
        parse_table(table, schema, &mut summaries, &mut warnings)?;
    }

    if summaries.is_empty() {
        let name = tables
            .first()
            .map(|t| t.name.as_str())
            .unwrap_or(Source::Kite.as_str());
        return Err(ReconcileError::empty_input(
            name,
            "no rows with a symbol were found",
        ));
    }

    Ok(ParsedSource {
        summaries,
        warnings,
    })
}

fn parse_table(
    table: &RawTable,
    schema: &Schema,
    summaries: &mut SummaryMap,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    info!("Parsing brokerage table: {} ({} rows)", table.name, table.rows.len());

    let columns = BrokerageColumns::resolve(table, schema)?;
    debug!("Brokerage column mapping: {:?}", columns);

    for (idx, row) in table.rows.iter().enumerate() {
        // Header is row 1 for the user
        let row_num = idx + 2;

        if row.is_blank() {
            continue;
        }

        let Some(symbol) = SymbolKey::new(&row.get(columns.symbol).as_text()) else {
            warn!("{}: skipping row {} without symbol", table.name, row_num);
            warnings.push(Warning::MissingSymbol {
                table: table.name.clone(),
                row: row_num,
            });
            continue;
        };

        let summary = parse_row(table, row, row_num, symbol, &columns, warnings)?;

        match summaries.get(&summary.symbol) {
            Some(existing) => {
                warn!("{}: duplicate symbol {} merged", table.name, summary.symbol);
                warnings.push(Warning::DuplicateSymbol {
                    source: Source::Kite,
                    symbol: summary.symbol.to_string(),
                });
                let merged = merge(existing, &summary);
                summaries.insert(merged);
            }
            None => {
                summaries.insert(summary);
            }
        }
    }

    info!(
        "Parsed {} symbols so far from brokerage table {}",
        summaries.len(),
        table.name
    );

    Ok(())
}

fn parse_row(
    table: &RawTable,
    row: &RawRow,
    row_num: usize,
    symbol: SymbolKey,
    columns: &BrokerageColumns,
    warnings: &mut Vec<Warning>,
) -> Result<StockSummary> {
    let required = |idx: usize, field: Field| -> Result<Decimal> {
        let cell = row.get(idx);
        match parse_decimal(cell) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ReconcileError::data_format(
                &table.name,
                row_num,
                field.as_str(),
                "",
                "is empty",
            )),
            Err(reason) => Err(ReconcileError::data_format(
                &table.name,
                row_num,
                field.as_str(),
                cell.as_text(),
                reason,
            )),
        }
    };

    let quantity = required(columns.quantity, Field::Quantity)?;
    let buy_value = required(columns.buy_value, Field::BuyValue)?;
    let sell_value = required(columns.sell_value, Field::SellValue)?;
    let realized_pnl = required(columns.realized_pnl, Field::RealizedPnl)?;

    let mut optional = |idx: Option<usize>, field: Field| -> Option<Decimal> {
        let cell = row.get(idx?);
        match parse_decimal(cell) {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "{}: row {} has malformed {} '{}'",
                    table.name,
                    row_num,
                    field,
                    cell.as_text()
                );
                warnings.push(Warning::MalformedOptional {
                    table: table.name.clone(),
                    row: row_num,
                    field: field.to_string(),
                    value: cell.as_text().into_owned(),
                });
                None
            }
        }
    };

    let reported_pct = optional(columns.realized_pnl_pct, Field::RealizedPnlPct);
    let open_quantity = optional(columns.open_quantity, Field::OpenQuantity);
    let unrealized_pnl = optional(columns.unrealized_pnl, Field::UnrealizedPnl);

    // Undefined whenever there is no cost side, whatever the file says
    let realized_pnl_pct = if buy_value.is_zero() {
        None
    } else {
        reported_pct.or_else(|| percentage(realized_pnl, buy_value))
    };

    let isin = columns
        .isin
        .map(|idx| row.get(idx).as_text().trim().to_uppercase())
        .filter(|s| !s.is_empty());

    Ok(StockSummary {
        symbol,
        isin,
        quantity,
        buy_value,
        sell_value,
        realized_pnl,
        realized_pnl_pct,
        unrealized_pnl,
        open_quantity,
    })
}

fn merge(a: &StockSummary, b: &StockSummary) -> StockSummary {
    let buy_value = a.buy_value + b.buy_value;
    let realized_pnl = a.realized_pnl + b.realized_pnl;
    let add_opt = |x: Option<Decimal>, y: Option<Decimal>| match (x, y) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or_default() + y.unwrap_or_default()),
    };

    StockSummary {
        symbol: a.symbol.clone(),
        isin: a.isin.clone().or_else(|| b.isin.clone()),
        quantity: a.quantity + b.quantity,
        buy_value,
        sell_value: a.sell_value + b.sell_value,
        realized_pnl,
        realized_pnl_pct: percentage(realized_pnl, buy_value),
        unrealized_pnl: add_opt(a.unrealized_pnl, b.unrealized_pnl),
        open_quantity: add_opt(a.open_quantity, b.open_quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const KITE_HEADERS: [&str; 9] = [
        "Symbol",
        "ISIN",
        "Quantity",
        "Buy Value",
        "Sell Value",
        "Realized P&L",
        "Realized P&L Pct.",
        "Open Quantity",
        "Unrealized P&L",
    ];

    fn parse(rows: &[&[&str]]) -> Result<ParsedSource> {
        let table = RawTable::from_strings("kite.csv", &KITE_HEADERS, rows);
        parse_brokerage(&[table], &Schema::brokerage())
    }

    fn key(s: &str) -> SymbolKey {
        SymbolKey::new(s).unwrap()
    }

    #[test]
    fn test_parses_rows_into_summaries() {
        let parsed = parse(&[
            &["RELIANCE", "INE002A01018", "10", "24,000.00", "25,000.00", "1,000.00", "4.17", "0", "0"],
            &["infy ", "", "5", "₹7,500", "₹7,000", "-500", "", "", ""],
        ])
        .unwrap();

        assert_eq!(parsed.summaries.len(), 2);
        assert!(parsed.warnings.is_empty());

        let rel = parsed.summaries.get(&key("RELIANCE")).unwrap();
        assert_eq!(rel.isin.as_deref(), Some("INE002A01018"));
        assert_eq!(rel.buy_value, dec!(24000));
        assert_eq!(rel.realized_pnl, dec!(1000));
        assert_eq!(rel.realized_pnl_pct, Some(dec!(4.17)));
        assert_eq!(rel.open_quantity, Some(dec!(0)));

        // Missing percentage is derived from buy value
        let infy = parsed.summaries.get(&key("INFY")).unwrap();
        assert!(infy.isin.is_none());
        assert_eq!(infy.realized_pnl_pct, percentage(dec!(-500), dec!(7500)));
        assert!(infy.unrealized_pnl.is_none());
    }

    #[test]
    fn test_zero_buy_value_percentage_is_sentinel() {
        let parsed = parse(&[&["BONUS", "", "1", "0", "100", "100", "0", "", ""]]).unwrap();
        let bonus = parsed.summaries.get(&key("BONUS")).unwrap();
        assert!(bonus.realized_pnl_pct.is_none());
    }

    #[test]
    fn test_rows_without_symbol_are_dropped_with_warning() {
        let parsed = parse(&[
            &["TCS", "", "1", "100", "110", "10", "10", "", ""],
            &["", "", "", "", "", "10", "", "", ""],
        ])
        .unwrap();
        assert_eq!(parsed.summaries.len(), 1);
        assert_eq!(
            parsed.warnings,
            vec![Warning::MissingSymbol {
                table: "kite.csv".to_string(),
                row: 3
            }]
        );
    }

    #[test]
    fn test_malformed_required_number_fails_table() {
        let err = parse(&[&["TCS", "", "1", "abc", "110", "10", "", "", ""]]).unwrap_err();
        match err {
            ReconcileError::DataFormat { row, field, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "buy_value");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_required_number_fails_table() {
        let err = parse(&[&["TCS", "", "1", "100", "", "10", "", "", ""]]).unwrap_err();
        assert!(matches!(err, ReconcileError::DataFormat { ref field, .. } if field == "sell_value"));
    }

    #[test]
    fn test_malformed_optional_number_is_warning() {
        let parsed = parse(&[&["TCS", "", "1", "100", "110", "10", "n/a", "", ""]]).unwrap();
        let tcs = parsed.summaries.get(&key("TCS")).unwrap();
        // Falls back to the derived percentage
        assert_eq!(tcs.realized_pnl_pct, Some(dec!(10)));
        assert!(matches!(
            &parsed.warnings[0],
            Warning::MalformedOptional { field, .. } if field == "realized_pnl_pct"
        ));
    }

    #[test]
    fn test_duplicate_symbols_are_merged() {
        let parsed = parse(&[
            &["SBIN", "", "10", "1000", "1200", "200", "20", "", "5"],
            &["sbin", "", "5", "1000", "900", "-100", "-10", "", ""],
        ])
        .unwrap();
        let sbin = parsed.summaries.get(&key("SBIN")).unwrap();
        assert_eq!(sbin.quantity, dec!(15));
        assert_eq!(sbin.realized_pnl, dec!(100));
        assert_eq!(sbin.realized_pnl_pct, Some(dec!(5)));
        assert_eq!(sbin.unrealized_pnl, Some(dec!(5)));
        assert!(matches!(parsed.warnings[0], Warning::DuplicateSymbol { .. }));
    }

    #[test]
    fn test_no_usable_rows_is_empty_input() {
        let err = parse(&[&["", "", "", "", "", "", "", "", ""]]).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyInput { .. }));
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let table = RawTable::from_strings("kite.csv", &["Symbol", "Quantity"], &[&["A", "1"]]);
        let err = parse_brokerage(&[table], &Schema::brokerage()).unwrap_err();
        assert!(matches!(err, ReconcileError::Schema { .. }));
    }

    #[test]
    fn test_no_tables_is_empty_input() {
        let err = parse_brokerage(&[], &Schema::brokerage()).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyInput { ref table, .. } if table == "Kite"));
    }
}
