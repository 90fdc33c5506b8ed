//! Header resolution for heterogeneous exports
//!
//! Each source has a `Schema`: an ordered list of canonical fields, each with
//! synonyms and exclusion tokens. Resolution is a pure function of the header
//! row and the schema:
//!
//! 1. exact (normalized, case-insensitive) match against any synonym
//! 2. fuzzy match: the header contains the synonym, or its tokens are a
//!    superset of the synonym's tokens, unless an exclusion token is present
//!
//! A column binds to at most one field. Missing required fields fail with
//! `ReconcileError::Schema`; missing optional fields resolve to absent.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::{ReconcileError, Result};

/// Canonical fields across both source schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Symbol,
    Isin,
    Quantity,
    BuyValue,
    SellValue,
    RealizedPnl,
    RealizedPnlPct,
    OpenQuantity,
    UnrealizedPnl,
    Date,
    Action,
    Price,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Symbol => "symbol",
            Field::Isin => "isin",
            Field::Quantity => "quantity",
            Field::BuyValue => "buy_value",
            Field::SellValue => "sell_value",
            Field::RealizedPnl => "realized_pnl",
            Field::RealizedPnlPct => "realized_pnl_pct",
            Field::OpenQuantity => "open_quantity",
            Field::UnrealizedPnl => "unrealized_pnl",
            Field::Date => "date",
            Field::Action => "action",
            Field::Price => "price",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "symbol" => Ok(Field::Symbol),
            "isin" => Ok(Field::Isin),
            "quantity" => Ok(Field::Quantity),
            "buy_value" => Ok(Field::BuyValue),
            "sell_value" => Ok(Field::SellValue),
            "realized_pnl" => Ok(Field::RealizedPnl),
            "realized_pnl_pct" => Ok(Field::RealizedPnlPct),
            "open_quantity" => Ok(Field::OpenQuantity),
            "unrealized_pnl" => Ok(Field::UnrealizedPnl),
            "date" => Ok(Field::Date),
            "action" => Ok(Field::Action),
            "price" => Ok(Field::Price),
            _ => Err(()),
        }
    }
}

/// One canonical field and the header spellings accepted for it
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: Field,
    pub required: bool,
    /// Tried in order; earlier synonyms win ties
    pub synonyms: Vec<String>,
    /// A header containing any of these never fuzzy-matches the field
    pub excludes: Vec<String>,
}

impl FieldSpec {
    fn new(field: Field, required: bool, synonyms: &[&str], excludes: &[&str]) -> Self {
        Self {
            field,
            required,
            synonyms: synonyms.iter().map(|s| normalize_header(s)).collect(),
            excludes: excludes.iter().map(|s| normalize_header(s)).collect(),
        }
    }
}

/// Ordered set of fields a source table must (or may) provide
#[derive(Debug, Clone)]
pub struct Schema {
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    /// Brokerage P&L statement (Kite "Tradewise P&L" style)
    pub fn brokerage() -> Self {
        Schema {
            fields: vec![
                FieldSpec::new(
                    Field::Symbol,
                    true,
                    &["symbol", "tradingsymbol", "ticker", "scrip", "stock", "instrument"],
                    &[],
                ),
                FieldSpec::new(Field::Isin, false, &["isin"], &[]),
                FieldSpec::new(Field::Quantity, true, &["quantity", "qty", "shares"], &["open"]),
                FieldSpec::new(
                    Field::BuyValue,
                    true,
                    &["buy value", "buy amount", "purchase value", "buy"],
                    &[],
                ),
                FieldSpec::new(
                    Field::SellValue,
                    true,
                    &["sell value", "sell amount", "sale value", "sell"],
                    &[],
                ),
                FieldSpec::new(
                    Field::RealizedPnl,
                    true,
                    &["realized p&l", "realised p&l", "realized pnl", "pnl", "p&l", "profit"],
                    &["pct", "%", "percent", "unrealized", "unrealised"],
                ),
                FieldSpec::new(
                    Field::RealizedPnlPct,
                    false,
                    &["realized p&l pct", "realized p&l %", "realised p&l pct", "pnl %", "return %"],
                    &["unrealized", "unrealised"],
                ),
                FieldSpec::new(Field::OpenQuantity, false, &["open quantity", "open qty"], &["type"]),
                FieldSpec::new(
                    Field::UnrealizedPnl,
                    false,
                    &["unrealized p&l", "unrealised p&l", "unrealized pnl"],
                    &["pct", "%", "percent"],
                ),
            ],
        }
    }

    /// Charting-platform trade history, one row per fill
    pub fn platform() -> Self {
        Schema {
            fields: vec![
                FieldSpec::new(Field::Date, true, &["date", "time", "timestamp", "datetime"], &[]),
                FieldSpec::new(Field::Action, true, &["action", "side", "type", "direction"], &[]),
                FieldSpec::new(Field::Quantity, true, &["quantity", "qty", "amount", "shares"], &[]),
                FieldSpec::new(Field::Price, true, &["price", "fill price", "avg price"], &[]),
                FieldSpec::new(Field::Symbol, false, &["symbol", "ticker", "instrument"], &[]),
            ],
        }
    }

    /// Append user-supplied synonyms after the built-in ones
    pub fn with_extra_synonyms(mut self, extra: &HashMap<String, Vec<String>>) -> Self {
        for (name, synonyms) in extra {
            let Ok(field) = Field::from_str(name) else {
                debug!("Ignoring synonyms for unknown field '{}'", name);
                continue;
            };
            if let Some(spec) = self.fields.iter_mut().find(|s| s.field == field) {
                spec.synonyms
                    .extend(synonyms.iter().map(|s| normalize_header(s)));
            }
        }
        self
    }
}

/// Resolved field -> column index mapping for one table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Index of a field the schema declared required
    pub fn required(&self, field: Field, table: &str) -> Result<usize> {
        self.get(field).ok_or_else(|| ReconcileError::Schema {
            table: table.to_string(),
            field: field.to_string(),
            headers: self.headers.clone(),
        })
    }

    /// Header label bound to a field, for display
    pub fn header_for(&self, field: Field) -> Option<&str> {
        self.get(field)
            .and_then(|idx| self.headers.get(idx))
            .map(String::as_str)
    }
}

/// Resolve a header row against a schema
pub fn resolve_columns(headers: &[String], schema: &Schema, table: &str) -> Result<ColumnMap> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut claimed = vec![false; headers.len()];
    let mut columns: HashMap<Field, usize> = HashMap::new();

    // Pass 1: exact matches, for every field before any fuzzy binding
    for spec in &schema.fields {
        let hit = spec.synonyms.iter().find_map(|syn| {
            normalized
                .iter()
                .enumerate()
                .find(|(idx, header)| !claimed[*idx] && *header == syn)
                .map(|(idx, _)| idx)
        });
        if let Some(idx) = hit {
            claimed[idx] = true;
            columns.insert(spec.field, idx);
        }
    }

    // Pass 2: containment / token overlap for what is left
    for spec in &schema.fields {
        if columns.contains_key(&spec.field) {
            continue;
        }
        let hit = spec.synonyms.iter().find_map(|syn| {
            normalized
                .iter()
                .enumerate()
                .find(|(idx, header)| {
                    !claimed[*idx]
                        && !spec.excludes.iter().any(|ex| header.contains(ex.as_str()))
                        && fuzzy_matches(header, syn)
                })
                .map(|(idx, _)| idx)
        });
        if let Some(idx) = hit {
            claimed[idx] = true;
            columns.insert(spec.field, idx);
        }
    }

    for spec in schema.fields.iter().filter(|s| s.required) {
        if !columns.contains_key(&spec.field) {
            return Err(ReconcileError::Schema {
                table: table.to_string(),
                field: spec.field.to_string(),
                headers: headers.to_vec(),
            });
        }
    }

    debug!("Column mapping for {}: {:?}", table, columns);

    Ok(ColumnMap {
        columns,
        headers: headers.to_vec(),
    })
}

fn fuzzy_matches(header: &str, synonym: &str) -> bool {
    if synonym.is_empty() {
        return false;
    }
    if header.contains(synonym) {
        return true;
    }
    let header_tokens: Vec<&str> = tokens(header).collect();
    tokens(synonym).all(|t| header_tokens.contains(&t))
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '&' || c == '%'))
        .filter(|t| !t.is_empty())
}

/// Fold a header label for comparison
///
/// NFKD with combining marks dropped, lower-case, `_` as space, runs of
/// whitespace collapsed, trailing `.`/`:` removed.
pub fn normalize_header(label: &str) -> String {
    let folded: String = label
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '_' { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ':'])
        .trim()
        .to_string()
}
