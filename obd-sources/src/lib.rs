//! Reading sources for OBD Share

pub mod dataset;
pub mod synthetic;

pub use dataset::{Dataset, DatasetError};
pub use synthetic::SyntheticDrive;
