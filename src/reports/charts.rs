//! Chart descriptors in Plotly's `{data, layout}` JSON shape
//!
//! Values are converted to `f64` only here, at the presentation boundary.

use itertools::Itertools;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::summary::{distribution, rank_by_magnitude, scatter};
use crate::models::{DeltaRecord, SummaryMap};

const PROFIT_COLOR: &str = "rgba(75, 192, 192, 0.8)";
const LOSS_COLOR: &str = "rgba(255, 99, 132, 0.8)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub pnl_chart: Chart,
    pub delta_chart: Chart,
    pub pnl_distribution_chart: Chart,
    pub buy_sell_chart: Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

/// Axis values: category labels or numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Labels(Vec<String>),
    Numbers(Vec<f64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textinfo: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insidetextorientation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Vec<String>>,
    /// Pie slices use `colors`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: &'static str,
    pub width: u32,
    pub dash: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub line: Line,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<AxisTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<AxisTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn sign_color(value: Decimal, positive: &str, negative: &str) -> String {
    if value >= Decimal::ZERO {
        positive.to_string()
    } else {
        negative.to_string()
    }
}

/// Build all four charts for one run
///
/// `deltas` are the reconciled common symbols; the distribution and scatter
/// charts describe the brokerage side only.
pub fn build_charts(kite: &SummaryMap, deltas: &[DeltaRecord], delta_display_limit: usize) -> Charts {
    Charts {
        pnl_chart: pnl_chart(deltas),
        delta_chart: delta_chart(deltas, delta_display_limit),
        pnl_distribution_chart: pnl_distribution_chart(kite),
        buy_sell_chart: buy_sell_chart(kite),
    }
}

/// Grouped bars per common symbol, sorted by brokerage P&L descending
pub fn pnl_chart(deltas: &[DeltaRecord]) -> Chart {
    let sorted: Vec<&DeltaRecord> = deltas
        .iter()
        .sorted_by(|a, b| b.kite_pnl.cmp(&a.kite_pnl).then_with(|| a.symbol.cmp(&b.symbol)))
        .collect();
    let symbols: Vec<String> = sorted.iter().map(|d| d.symbol.to_string()).collect();

    let bars = |name: &str, values: Vec<f64>| Trace {
        kind: "bar",
        name: Some(name.to_string()),
        x: Some(Series::Labels(symbols.clone())),
        y: Some(Series::Numbers(values)),
        ..Default::default()
    };

    Chart {
        data: vec![
            bars("Kite PnL", sorted.iter().map(|d| to_f64(d.kite_pnl)).collect()),
            bars(
                "TradingView PnL",
                sorted.iter().map(|d| to_f64(d.tradingview_pnl)).collect(),
            ),
        ],
        layout: Layout {
            title: "P&L Comparison: Kite vs TradingView".to_string(),
            xaxis: Some(AxisTitle { title: "Stock Symbol" }),
            yaxis: Some(AxisTitle { title: "Realized P&L" }),
            barmode: Some("group"),
            ..Default::default()
        },
    }
}

/// Largest deltas by magnitude, colored by sign, with a zero reference line
pub fn delta_chart(deltas: &[DeltaRecord], limit: usize) -> Chart {
    let mut ranked = rank_by_magnitude(deltas);
    ranked.truncate(limit);

    Chart {
        data: vec![Trace {
            kind: "bar",
            name: Some("Delta (Kite - TradingView)".to_string()),
            x: Some(Series::Labels(ranked.iter().map(|d| d.symbol.to_string()).collect())),
            y: Some(Series::Numbers(ranked.iter().map(|d| to_f64(d.delta)).collect())),
            marker: Some(Marker {
                color: Some(ranked.iter().map(|d| sign_color(d.delta, "green", "red")).collect()),
                ..Default::default()
            }),
            ..Default::default()
        }],
        layout: Layout {
            title: "Delta: Kite P&L - TradingView P&L".to_string(),
            xaxis: Some(AxisTitle { title: "Stock Symbol" }),
            yaxis: Some(AxisTitle { title: "P&L Difference" }),
            shapes: vec![Shape {
                kind: "line",
                x0: -0.5,
                y0: 0.0,
                x1: ranked.len() as f64 - 0.5,
                y1: 0.0,
                line: Line {
                    color: "black",
                    width: 2,
                    dash: "dot",
                },
            }],
            ..Default::default()
        },
    }
}

pub fn pnl_distribution_chart(kite: &SummaryMap) -> Chart {
    let split = distribution(kite);

    Chart {
        data: vec![Trace {
            kind: "pie",
            labels: Some(vec!["Profit".to_string(), "Loss".to_string()]),
            values: Some(vec![to_f64(split.profit_sum), to_f64(split.loss_sum)]),
            marker: Some(Marker {
                colors: Some(vec![PROFIT_COLOR.to_string(), LOSS_COLOR.to_string()]),
                ..Default::default()
            }),
            textinfo: Some("label+percent"),
            textposition: Some("inside"),
            insidetextorientation: Some("radial"),
            ..Default::default()
        }],
        layout: Layout {
            title: "P&L Distribution".to_string(),
            height: Some(400),
            width: Some(500),
            ..Default::default()
        },
    }
}

/// Buy value against sell value per symbol, plus the buy = sell diagonal
pub fn buy_sell_chart(kite: &SummaryMap) -> Chart {
    let points = scatter(kite);
    let axes = |title: &str| Layout {
        title: title.to_string(),
        xaxis: Some(AxisTitle { title: "Buy Value (₹)" }),
        yaxis: Some(AxisTitle { title: "Sell Value (₹)" }),
        ..Default::default()
    };

    if points.is_empty() {
        return Chart {
            data: Vec::new(),
            layout: axes("Buy vs. Sell Values (No Data Available)"),
        };
    }

    let thousand = Decimal::ONE_THOUSAND;
    let max_value = points
        .iter()
        .flat_map(|p| [p.buy_value, p.sell_value])
        .max()
        .unwrap_or_default();

    let markers = Trace {
        kind: "scatter",
        x: Some(Series::Numbers(points.iter().map(|p| to_f64(p.buy_value)).collect())),
        y: Some(Series::Numbers(points.iter().map(|p| to_f64(p.sell_value)).collect())),
        mode: Some("markers"),
        text: Some(points.iter().map(|p| p.symbol.to_string()).collect()),
        marker: Some(Marker {
            size: Some(
                points
                    .iter()
                    .map(|p| to_f64(p.realized_pnl.abs() / thousand + Decimal::TEN))
                    .collect(),
            ),
            color: Some(
                points
                    .iter()
                    .map(|p| sign_color(p.realized_pnl, PROFIT_COLOR, LOSS_COLOR))
                    .collect(),
            ),
            opacity: Some(0.7),
            ..Default::default()
        }),
        ..Default::default()
    };

    let break_even = Trace {
        kind: "scatter",
        name: Some("Break-even Line".to_string()),
        x: Some(Series::Numbers(vec![0.0, to_f64(max_value)])),
        y: Some(Series::Numbers(vec![0.0, to_f64(max_value)])),
        mode: Some("lines"),
        line: Some(Line {
            color: "rgba(0, 0, 0, 0.5)",
            width: 2,
            dash: "dot",
        }),
        ..Default::default()
    };

    Chart {
        data: vec![markers, break_even],
        layout: axes("Buy vs. Sell Values"),
    }
}
