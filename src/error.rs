//! Error handling for tradecheck
//!
//! Fatal parse failures are typed (`ReconcileError`) so callers can tell a
//! missing column from a bad number. Recoverable issues are `Warning`s that
//! ride along with the analysis result. The CLI host and file decoding use
//! anyhow for context chaining.

use serde::Serialize;
use thiserror::Error;

use crate::models::Source;

/// Fatal errors for one analysis run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("schema error in {table}: required column '{field}' not found (headers: {headers:?})")]
    Schema {
        table: String,
        field: String,
        headers: Vec<String>,
    },

    #[error("data format error in {table}, row {row}: {field} value '{value}' {reason}")]
    DataFormat {
        table: String,
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    #[error("empty input in {table}: {reason}")]
    EmptyInput { table: String, reason: String },
}

impl ReconcileError {
    pub fn data_format(
        table: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ReconcileError::DataFormat {
            table: table.into(),
            row,
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_input(table: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconcileError::EmptyInput {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Non-fatal issue collected during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// No symbol is present in both sources
    NoMatch,
    MissingSymbol {
        table: String,
        row: usize,
    },
    MalformedOptional {
        table: String,
        row: usize,
        field: String,
        value: String,
    },
    UnknownAction {
        table: String,
        row: usize,
        value: String,
    },
    DuplicateSymbol {
        source: Source,
        symbol: String,
    },
    IsinMismatch {
        symbol: String,
        kite: String,
        tradingview: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoMatch => write!(f, "no symbols are common to both sources"),
            Warning::MissingSymbol { table, row } => {
                write!(f, "{}: row {} has no symbol, skipped", table, row)
            }
            Warning::MalformedOptional {
                table,
                row,
                field,
                value,
            } => write!(
                f,
                "{}: row {} has malformed {} '{}', treated as absent",
                table, row, field, value
            ),
            Warning::UnknownAction { table, row, value } => write!(
                f,
                "{}: row {} has unknown action '{}', skipped",
                table, row, value
            ),
            Warning::DuplicateSymbol { source, symbol } => {
                write!(f, "{}: symbol {} appears more than once, merged", source, symbol)
            }
            Warning::IsinMismatch {
                symbol,
                kite,
                tradingview,
            } => write!(
                f,
                "{}: ISIN differs between sources ({} vs {})",
                symbol, kite, tradingview
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = ReconcileError::empty_input("kite.csv", "no usable rows");
        assert_eq!(err.to_string(), "empty input in kite.csv: no usable rows");
    }

    #[test]
    fn test_data_format_names_row_and_field() {
        let err = ReconcileError::data_format("RELIANCE.csv", 4, "price", "abc", "is not a number");
        let msg = err.to_string();
        assert!(msg.contains("row 4"));
        assert!(msg.contains("price value 'abc'"));
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: anyhow::Result<()> =
            Err(ReconcileError::empty_input("t", "x")).context("analysis failed");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("analysis failed"));
        assert!(format!("{:?}", err).contains("empty input"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let json = serde_json::to_value(Warning::NoMatch).unwrap();
        assert_eq!(json["kind"], "no_match");
    }
}
