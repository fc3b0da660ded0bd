//! JSON dataset reading source
//!
//! A dataset file is a JSON array of OBD-II readings in replay order:
//!
//! ```json
//! [
//!   {"vehicle_id": "VH-001", "timestamp": "2024-03-01T00:00:00",
//!    "speed_kmph": 0.0, "engine_rpm": 780, "fuel_level_pct": 82.5,
//!    "engine_temp_c": 21.0, "dtc_code": null, "lat": 37.7749, "lon": -122.4194}
//! ]
//! ```
//!
//! Rows are validated up front. A row with a missing or mistyped required
//! field rejects the whole file, naming the row, instead of replaying with
//! holes.

use obd_core::{model::TelemetrySample, source::ReadingSource};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset is not a JSON array of readings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Reading #{index} is malformed: {source}")]
    Sample {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// An in-memory, read-only sequence of readings
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    samples: Vec<TelemetrySample>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, samples: Vec<TelemetrySample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    /// Parse a dataset from JSON text
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, DatasetError> {
        let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let samples = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                serde_json::from_value::<TelemetrySample>(row)
                    .map_err(|source| DatasetError::Sample { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dataset = Self::new(name, samples);
        debug!("Parsed dataset {} ({} readings)", dataset.name, dataset.samples.len());
        Ok(dataset)
    }

    /// Load a dataset file; the file name becomes the source name
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let json = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let dataset = Self::from_json_str(name, &json)?;
        info!(
            "Loaded dataset {} with {} readings",
            path.display(),
            dataset.samples.len()
        );
        Ok(dataset)
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }
}

impl ReadingSource for Dataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample(&self, index: usize) -> Option<&TelemetrySample> {
        self.samples.get(index)
    }
}
