//! Diagnostic trouble code lookup

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// A DTC annotated for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticInfo {
    pub code: String,
    pub description: &'static str,
    pub severity: Severity,
}

const KNOWN_CODES: &[(&str, &str)] = &[
    ("P0171", "Fuel System Too Lean (Bank 1)"),
    ("P0300", "Random/Multiple Cylinder Misfire Detected"),
    ("P0420", "Catalyst System Efficiency Below Threshold"),
    ("P0455", "Evaporative Emission System Leak Detected"),
    ("P0401", "Exhaust Gas Recirculation Flow Insufficient"),
];

impl DiagnosticInfo {
    pub fn lookup(code: &str) -> Self {
        let description = KNOWN_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, desc)| *desc)
            .unwrap_or("Unknown Issue");

        // Generic powertrain codes (P0xxx) are treated as less urgent than
        // manufacturer-specific or non-powertrain ones.
        let severity = if code.starts_with("P0") {
            Severity::Medium
        } else {
            Severity::High
        };

        Self {
            code: code.to_string(),
            description,
            severity,
        }
    }
}
