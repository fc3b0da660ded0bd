//! Reading source trait definition

use crate::model::TelemetrySample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// An ordered, finite, read-only sequence of telemetry samples
///
/// Each source is responsible for:
/// - Holding its samples in replay order
/// - Handing out samples by position without ever mutating them
///
/// The session engine wraps its cursor modulo `len()`, so a source is replayed
/// as an endless loop.
pub trait ReadingSource: Send + Sync {
    /// Get the name of this source (e.g., a dataset file name, "Synthetic")
    fn name(&self) -> &str;

    /// Number of samples in the source
    fn len(&self) -> usize;

    /// Get the sample at `index`, or `None` past the end
    fn sample(&self, index: usize) -> Option<&TelemetrySample>;

    /// Whether the source holds no samples
    ///
    /// An empty source can never be shared; the session refuses to start.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The simplest source: samples held in memory
impl ReadingSource for Vec<TelemetrySample> {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn len(&self) -> usize {
        <[TelemetrySample]>::len(self)
    }

    fn sample(&self, index: usize) -> Option<&TelemetrySample> {
        self.get(index)
    }
}

/// Serializable summary of a source for the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub len: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub vehicle_ids: Vec<String>,
    pub readings_with_dtc: usize,
}

/// Summarize any source in one pass over its samples
pub fn describe(source: &dyn ReadingSource) -> SourceInfo {
    let samples = move || (0..source.len()).filter_map(move |i| source.sample(i));
    let vehicles: BTreeSet<&str> = samples().map(|s| s.vehicle_id.as_str()).collect();

    SourceInfo {
        name: source.name().to_string(),
        len: source.len(),
        first_timestamp: samples().next().map(|s| s.timestamp),
        last_timestamp: samples().last().map(|s| s.timestamp),
        vehicle_ids: vehicles.into_iter().map(str::to_string).collect(),
        readings_with_dtc: samples().filter(|s| s.dtc_code.is_some()).count(),
    }
}
