//! Derived earnings views
//!
//! Everything here is computed on demand from a session snapshot and never
//! feeds back into session state.

use crate::model::EarningsEntry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of points in the earnings chart
pub const CHART_WINDOW: usize = 7;

/// Projected income at the current accrual pace
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
}

/// Project hourly/daily/monthly earnings
///
/// Each history entry is counted as one elapsed minute, even though ticks
/// arrive once per second. Dashboards built against this projection expect
/// the minute-based figure, so it is kept as is.
pub fn project(cumulative: f64, history_len: usize) -> Projection {
    let hourly = cumulative * (60.0 / history_len.max(1) as f64);
    let daily = hourly * 24.0;
    Projection {
        hourly,
        daily,
        monthly: daily * 30.0,
    }
}

/// Last `n` amounts of the history, oldest first
pub fn recent_window(history: &[EarningsEntry], n: usize) -> Vec<f64> {
    let start = history.len().saturating_sub(n);
    history[start..].iter().map(|e| e.amount).collect()
}

/// Chart x-axis granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[default]
    Hour,
    Day,
    Week,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl Timeframe {
    /// Label for a point at `position` (0.0 = start, 1.0 = end) of the span
    fn label_at(&self, position: f64) -> String {
        match self {
            Timeframe::Hour => format!("{}m", (position * 60.0).round()),
            Timeframe::Day => format!("{}h", (position * 24.0).round()),
            Timeframe::Week => {
                let hours = (position * 6.0 * 24.0).round() as usize;
                let (day, hour) = (hours / 24, hours % 24);
                if hour == 0 {
                    WEEKDAYS[day].to_string()
                } else {
                    format!("{} {}h", WEEKDAYS[day], hour)
                }
            }
        }
    }

    /// `points` labels spread evenly from the start to the end of the span
    ///
    /// A single point is labelled with the end of the span.
    pub fn labels(&self, points: usize) -> Vec<String> {
        match points {
            0 => Vec::new(),
            1 => vec![self.label_at(1.0)],
            n => (0..n)
                .map(|i| self.label_at(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            other => Err(format!("Unknown timeframe: {}", other)),
        }
    }
}

/// Labels and values ready for a line chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Build the earnings chart for `timeframe` from the most recent entries
///
/// Short histories are left-padded with zeros so the chart always has
/// `window` points; the padding exists only in the returned series.
pub fn chart_series(history: &[EarningsEntry], timeframe: Timeframe, window: usize) -> ChartSeries {
    let mut values = recent_window(history, window);
    if values.len() < window {
        let mut padded = vec![0.0; window - values.len()];
        padded.append(&mut values);
        values = padded;
    }

    ChartSeries {
        labels: timeframe.labels(window),
        values,
    }
}

/// Fixed-width rolling series, newest last, left-padded with zeros
pub fn gauge_series<I>(values: I, width: usize) -> Vec<f64>
where
    I: DoubleEndedIterator<Item = f64>,
{
    let mut newest_first: Vec<f64> = values.rev().take(width).collect();
    newest_first.resize(width, 0.0);
    newest_first.reverse();
    newest_first
}
