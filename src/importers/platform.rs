use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::cells::{parse_decimal, parse_timestamp};
use super::columns::{resolve_columns, Field, Schema};
use super::ParsedSource;
use crate::cost_basis::FifoMatcher;
use crate::error::{ReconcileError, Result, Warning};
use crate::models::{
    percentage, RawRow, RawTable, Source, StockSummary, SummaryMap, SymbolKey, TradeAction,
};

/// Column mapping for one platform trade-history table
#[derive(Debug)]
struct PlatformColumns {
    date: usize,
    action: usize,
    quantity: usize,
    price: usize,
    symbol: Option<usize>,
}

impl PlatformColumns {
    fn resolve(table: &RawTable, schema: &Schema) -> Result<Self> {
        let map = resolve_columns(&table.headers, schema, &table.name)?;
        Ok(PlatformColumns {
            date: map.required(Field::Date, &table.name)?,
            action: map.required(Field::Action, &table.name)?,
            quantity: map.required(Field::Quantity, &table.name)?,
            price: map.required(Field::Price, &table.name)?,
            symbol: map.get(Field::Symbol),
        })
    }
}

/// A single fill from the platform export
#[derive(Debug, Clone)]
struct Trade {
    timestamp: NaiveDateTime,
    action: TradeAction,
    quantity: Decimal,
    price: Decimal,
    table: usize,
    row: usize,
}

/// Trades for one instrument, possibly gathered from several tables
struct InstrumentHistory {
    symbol: SymbolKey,
    trades: Vec<Trade>,
}

/// Parse per-instrument trade histories into per-symbol summaries
///
/// Each table holds the fills of one instrument. Fills are replayed in time
/// order through a FIFO lot matcher; only the matched (closed) quantity
/// contributes to realized P&L.
pub fn parse_platform(tables: &[RawTable], schema: &Schema) -> Result<ParsedSource> {
    if tables.is_empty() {
        return Err(ReconcileError::empty_input(
            Source::TradingView.as_str(),
            "no trade history tables were provided",
        ));
    }

    let mut histories: Vec<InstrumentHistory> = Vec::new();
    let mut warnings = Vec::new();

    for (table_idx, table) in tables.iter().enumerate() {
        info!("Parsing platform table: {} ({} rows)", table.name, table.rows.len());

        let columns = PlatformColumns::resolve(table, schema)?;
        debug!("Platform column mapping: {:?}", columns);

        let symbol = instrument_symbol(table, &columns)?;
        let trades = parse_trades(table, table_idx, &columns, &mut warnings)?;

        if trades.is_empty() {
            return Err(ReconcileError::empty_input(&table.name, "no buy or sell trades found"));
        }

        match histories.iter_mut().find(|h| h.symbol == symbol) {
            Some(history) => {
                warn!("{}: symbol {} already seen, merging trades", table.name, symbol);
                warnings.push(Warning::DuplicateSymbol {
                    source: Source::TradingView,
                    symbol: symbol.to_string(),
                });
                history.trades.extend(trades);
            }
            None => histories.push(InstrumentHistory { symbol, trades }),
        }
    }

    let mut summaries = SummaryMap::new();
    for history in histories {
        let summary = summarize(history, tables)?;
        summaries.insert(summary);
    }

    info!("Parsed {} symbols from {} platform tables", summaries.len(), tables.len());

    Ok(ParsedSource {
        summaries,
        warnings,
    })
}

/// Symbol from an explicit column when present, else from the table name
fn instrument_symbol(table: &RawTable, columns: &PlatformColumns) -> Result<SymbolKey> {
    let from_column = columns.symbol.and_then(|idx| {
        table
            .rows
            .iter()
            .find_map(|row| SymbolKey::new(&row.get(idx).as_text()))
    });

    from_column
        .or_else(|| SymbolKey::new(symbol_from_name(&table.name)))
        .ok_or_else(|| ReconcileError::Schema {
            table: table.name.clone(),
            field: Field::Symbol.to_string(),
            headers: table.headers.clone(),
        })
}

/// "exports/RELIANCE.NS.csv" -> "RELIANCE"
fn symbol_from_name(name: &str) -> &str {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file_name.split('.').next().unwrap_or(file_name)
}

fn parse_trades(
    table: &RawTable,
    table_idx: usize,
    columns: &PlatformColumns,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Trade>> {
    let mut trades = Vec::new();

    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = idx + 2;

        if row.is_blank() {
            continue;
        }

        let action_cell = row.get(columns.action);
        if action_cell.is_empty() {
            return Err(ReconcileError::data_format(
                &table.name,
                row_num,
                Field::Action.as_str(),
                "",
                "is empty",
            ));
        }
        let Ok(action) = TradeAction::from_str(&action_cell.as_text()) else {
            warn!(
                "{}: skipping row {} with action '{}'",
                table.name,
                row_num,
                action_cell.as_text()
            );
            warnings.push(Warning::UnknownAction {
                table: table.name.clone(),
                row: row_num,
                value: action_cell.as_text().into_owned(),
            });
            continue;
        };

        let date_cell = row.get(columns.date);
        let timestamp = parse_timestamp(date_cell).map_err(|reason| {
            ReconcileError::data_format(
                &table.name,
                row_num,
                Field::Date.as_str(),
                date_cell.as_text(),
                reason,
            )
        })?;

        let quantity = required_number(table, row, row_num, columns.quantity, Field::Quantity)?;
        if quantity <= Decimal::ZERO {
            return Err(ReconcileError::data_format(
                &table.name,
                row_num,
                Field::Quantity.as_str(),
                quantity.to_string(),
                "must be greater than zero",
            ));
        }

        let price = required_number(table, row, row_num, columns.price, Field::Price)?;
        if price < Decimal::ZERO {
            return Err(ReconcileError::data_format(
                &table.name,
                row_num,
                Field::Price.as_str(),
                price.to_string(),
                "must not be negative",
            ));
        }

        trades.push(Trade {
            timestamp,
            action,
            quantity,
            price,
            table: table_idx,
            row: row_num,
        });
    }

    if is_newest_first(&trades) {
        debug!("{}: rows are newest first, reversing", table.name);
        trades.reverse();
    }

    Ok(trades)
}

/// Timestamps never increase down the file and do decrease at least once
fn is_newest_first(trades: &[Trade]) -> bool {
    trades.windows(2).all(|w| w[0].timestamp >= w[1].timestamp)
        && trades.first().map(|t| t.timestamp) > trades.last().map(|t| t.timestamp)
}

fn required_number(
    table: &RawTable,
    row: &RawRow,
    row_num: usize,
    idx: usize,
    field: Field,
) -> Result<Decimal> {
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
}

/// Replay one instrument's fills through the FIFO matcher
fn summarize(history: InstrumentHistory, tables: &[RawTable]) -> Result<StockSummary> {
    let InstrumentHistory { symbol, mut trades } = history;

    // Buys before sells at equal timestamps, otherwise file order
    trades.sort_by_key(|t| (t.timestamp, t.action == TradeAction::Sell));

    let mut matcher = FifoMatcher::new();
    let mut buy_value = Decimal::ZERO;
    let mut sell_value = Decimal::ZERO;
    let mut closed_quantity = Decimal::ZERO;
    let mut closed_cost = Decimal::ZERO;
    let mut realized_pnl = Decimal::ZERO;

    for trade in &trades {
        debug!(
            "{}: {} {} @ {} ({})",
            symbol,
            trade.action.as_str(),
            trade.quantity,
            trade.price,
            trade.timestamp
        );
        let value = trade.quantity * trade.price;
        match trade.action {
            TradeAction::Buy => {
                buy_value += value;
                matcher.add_purchase(trade.timestamp, trade.quantity, trade.price);
            }
            TradeAction::Sell => {
                sell_value += value;
                let sale = matcher
                    .match_sale(trade.quantity, trade.price)
                    .map_err(|e| {
                        ReconcileError::data_format(
                            &tables[trade.table].name,
                            trade.row,
                            Field::Quantity.as_str(),
                            trade.quantity.to_string(),
                            format!("sells more than was bought ({})", e),
                        )
                    })?;
                closed_quantity += sale.quantity;
                closed_cost += sale.cost_basis;
                realized_pnl += sale.profit_loss;
            }
        }
    }

    debug!(
        "{}: closed {} units, {} still open",
        symbol,
        closed_quantity,
        matcher.open_quantity()
    );

    Ok(StockSummary {
        symbol,
        isin: None,
        quantity: closed_quantity,
        buy_value,
        sell_value,
        realized_pnl,
        realized_pnl_pct: percentage(realized_pnl, closed_cost),
        unrealized_pnl: None,
        open_quantity: None,
    })
}
