//! Server configuration from environment variables
//!
//! | Variable           | Default         | Meaning                               |
//! |--------------------|-----------------|---------------------------------------|
//! | `OBD_DATASET`      | (unset)         | JSON dataset to replay                |
//! | `OBD_DEMO_SAMPLES` | `1440`          | synthetic readings when no dataset    |
//! | `OBD_DEMO_SEED`    | generator's own | synthetic dataset seed                |
//! | `OBD_TICK_MS`      | `1000`          | tick interval while sharing           |
//! | `OBD_BIND`         | `0.0.0.0:9100`  | HTTP listen address                   |
//! | `OBD_CHART_WINDOW` | `7`             | points in the earnings chart          |

use crate::driver::DEFAULT_TICK_INTERVAL;
use obd_core::{aggregate::CHART_WINDOW, source::ReadingSource};
use obd_sources::{Dataset, DatasetError, SyntheticDrive};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub dataset_path: Option<PathBuf>,
    pub demo_samples: usize,
    pub demo_seed: Option<u64>,
    pub tick_interval: Duration,
    pub bind_addr: SocketAddr,
    pub chart_window: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            demo_samples: 1440,
            demo_seed: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            chart_window: CHART_WINDOW,
        }
    }
}

impl ServerConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            dataset_path: get("OBD_DATASET").map(PathBuf::from),
            demo_samples: parse_or(get("OBD_DEMO_SAMPLES"), "OBD_DEMO_SAMPLES", defaults.demo_samples),
            demo_seed: get("OBD_DEMO_SEED").and_then(|v| match v.parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!("Ignoring invalid OBD_DEMO_SEED={:?}", v);
                    None
                }
            }),
            tick_interval: Duration::from_millis(
                parse_or(get("OBD_TICK_MS"), "OBD_TICK_MS", defaults.tick_interval.as_millis() as u64)
                    .max(1),
            ),
            bind_addr: parse_or(get("OBD_BIND"), "OBD_BIND", defaults.bind_addr),
            chart_window: parse_or(get("OBD_CHART_WINDOW"), "OBD_CHART_WINDOW", defaults.chart_window)
                .max(1),
        }
    }

    /// Open the configured dataset, or generate a synthetic one
    pub fn load_source(&self) -> Result<Arc<dyn ReadingSource>, DatasetError> {
        match &self.dataset_path {
            Some(path) => Ok(Arc::new(Dataset::open(path)?)),
            None => {
                let mut drive = SyntheticDrive::new().with_samples(self.demo_samples);
                if let Some(seed) = self.demo_seed {
                    drive = drive.with_seed(seed);
                }
                let dataset = drive.generate();
                info!("No dataset configured, generated {} synthetic readings", dataset.samples().len());
                Ok(Arc::new(dataset))
            }
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
