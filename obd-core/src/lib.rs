//! OBD Share Core Library
//!
//! This crate provides the telemetry sample model, the reading source trait,
//! the per-sample reward calculator and the sharing session state machine.

pub mod aggregate;
pub mod diagnostics;
pub mod model;
pub mod reward;
pub mod session;
pub mod source;
pub mod units;

pub use model::{EarningsEntry, FieldMask, TelemetrySample};
pub use session::{Session, SessionError, TickEvent};
pub use source::ReadingSource;
