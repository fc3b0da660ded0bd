//! Telemetry sample and earnings data model
//!
//! `TelemetrySample` mirrors one row of an OBD-II dataset. Field names match
//! the dataset's snake_case JSON so files deserialize without renaming.

use crate::units::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// One OBD-II reading from a reading source
///
/// Samples are never mutated once loaded; their identity is their position in
/// the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Vehicle identifier (VIN or fleet id)
    pub vehicle_id: String,

    /// Point in time the reading represents
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub speed_kmph: Kmph,

    pub engine_rpm: Rpm,

    /// Fuel tank level, 0-100
    pub fuel_level_pct: Percent,

    /// Coolant temperature
    pub engine_temp_c: Celsius,

    /// Diagnostic trouble code, if the ECU reported one
    #[serde(default, deserialize_with = "deserialize_dtc")]
    pub dtc_code: Option<String>,

    pub lat: Degrees,

    pub lon: Degrees,
}

impl TelemetrySample {
    /// Location of this reading
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Accepts RFC 3339 timestamps as well as naive ISO-8601 ones (read as UTC)
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

/// `null`, a missing key and `""` all mean "no code"
fn deserialize_dtc<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty()))
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: Degrees,
    pub lon: Degrees,
}

/// Reward credited for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEntry {
    /// Wall-clock time of accrual (not the sample's own timestamp)
    pub timestamp: DateTime<Utc>,

    pub amount: f64,
}

/// Specifies which sample fields to include in serialized output
///
/// Lets a display surface subscribe to just the readings it draws, e.g. the
/// map view only needs `lat,lon`.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    ///
    /// `*` or an empty list selects everything.
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if fields.is_empty() || fields.contains("*") {
            return Self::all();
        }

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all fields should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl TelemetrySample {
    /// Serialize this sample to a JSON value respecting the given field mask
    ///
    /// `vehicle_id` and `timestamp` are always present.
    pub fn to_value_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<serde_json::Value> {
        let full = serde_json::to_value(self)?;
        let mask = match mask {
            Some(m) if !m.is_all() => m,
            _ => return Ok(full),
        };

        let serde_json::Value::Object(fields) = full else {
            return Ok(full);
        };

        let filtered: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .filter(|(name, _)| {
                name == "vehicle_id" || name == "timestamp" || mask.includes(name)
            })
            .collect();

        Ok(serde_json::Value::Object(filtered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "vehicle_id": "VH-001",
            "timestamp": "2024-03-01T08:15:00",
            "speed_kmph": 72.5,
            "engine_rpm": 2400,
            "fuel_level_pct": 63.2,
            "engine_temp_c": 91.0,
            "dtc_code": null,
            "lat": 37.7749,
            "lon": -122.4194
        }"#
    }

    #[test]
    fn test_sample_deserializes_dataset_row() {
        let sample: TelemetrySample = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(sample.vehicle_id, "VH-001");
        assert_eq!(sample.speed_kmph, Kmph(72.5));
        assert_eq!(sample.engine_rpm, Rpm(2400.0));
        assert_eq!(sample.dtc_code, None);
        assert_eq!(sample.timestamp.to_rfc3339(), "2024-03-01T08:15:00+00:00");
    }

    #[test]
    fn test_sample_accepts_rfc3339_timestamp() {
        let json = sample_json().replace("2024-03-01T08:15:00", "2024-03-01T10:15:00+02:00");
        let sample: TelemetrySample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.timestamp.to_rfc3339(), "2024-03-01T08:15:00+00:00");
    }

    #[test]
    fn test_empty_dtc_is_absent() {
        let json = sample_json().replace("\"dtc_code\": null", "\"dtc_code\": \"\"");
        let sample: TelemetrySample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.dtc_code, None);

        let json = sample_json().replace("\"dtc_code\": null,", "");
        let sample: TelemetrySample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.dtc_code, None);

        let json = sample_json().replace("\"dtc_code\": null", "\"dtc_code\": \"P0420\"");
        let sample: TelemetrySample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.dtc_code.as_deref(), Some("P0420"));
    }

    #[test]
    fn test_missing_numeric_field_is_an_error() {
        let json = sample_json().replace("\"engine_temp_c\": 91.0,", "");
        let result: Result<TelemetrySample, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_mask_parse_comma_separated() {
        let mask = FieldMask::parse("speed_kmph,lat,lon");
        assert!(mask.includes("speed_kmph"));
        assert!(mask.includes("lat"));
        assert!(!mask.includes("engine_rpm"));
        assert!(!mask.is_all());
    }

    #[test]
    fn test_field_mask_parse_case_insensitive_with_whitespace() {
        let mask = FieldMask::parse(" Speed_Kmph , LAT ");
        assert!(mask.includes("speed_kmph"));
        assert!(mask.includes("lat"));
    }

    #[test]
    fn test_field_mask_wildcard_and_empty_select_all() {
        assert!(FieldMask::parse("*").is_all());
        assert!(FieldMask::parse("").is_all());
        assert!(FieldMask::parse(" , ").is_all());
        let mask: FieldMask = "lat".parse().unwrap();
        assert!(!mask.is_all());
    }

    #[test]
    fn test_to_value_filtered_keeps_identity_fields() {
        let sample: TelemetrySample = serde_json::from_str(sample_json()).unwrap();
        let mask = FieldMask::parse("lat,lon");
        let value = sample.to_value_filtered(Some(&mask)).unwrap();
        let obj = value.as_object().unwrap();

        assert!(obj.contains_key("vehicle_id"));
        assert!(obj.contains_key("timestamp"));
        assert!(obj.contains_key("lat"));
        assert!(obj.contains_key("lon"));
        assert!(!obj.contains_key("speed_kmph"));
        assert!(!obj.contains_key("dtc_code"));
    }

    #[test]
    fn test_to_value_filtered_without_mask_is_full_sample() {
        let sample: TelemetrySample = serde_json::from_str(sample_json()).unwrap();
        let value = sample.to_value_filtered(None).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 9);
    }
}
