//! Integration tests for JSON dataset loading

use obd_core::source::{describe, ReadingSource};
use obd_sources::{Dataset, DatasetError};

const TWO_READINGS: &str = r#"[
    {"vehicle_id": "VH-001", "timestamp": "2024-03-01T00:00:00", "speed_kmph": 70.0,
     "engine_rpm": 2600, "fuel_level_pct": 74.0, "engine_temp_c": 90.0,
     "dtc_code": null, "lat": 37.7749, "lon": -122.4194},
    {"vehicle_id": "VH-001", "timestamp": "2024-03-01T00:01:00", "speed_kmph": 40.0,
     "engine_rpm": 1900, "fuel_level_pct": 73.8, "engine_temp_c": 110.0,
     "dtc_code": "P0171", "lat": 37.7755, "lon": -122.4188}
]"#;

#[test]
fn test_dataset_parses_readings_in_order() {
    let dataset = Dataset::from_json_str("two.json", TWO_READINGS).expect("dataset should parse");

    assert_eq!(dataset.name(), "two.json");
    assert_eq!(dataset.len(), 2);
    assert!(!dataset.is_empty());
    assert_eq!(dataset.sample(0).unwrap().speed_kmph.0, 70.0);
    assert_eq!(dataset.sample(1).unwrap().dtc_code.as_deref(), Some("P0171"));
    assert!(dataset.sample(2).is_none());
}

#[test]
fn test_dataset_info_summarizes_readings() {
    let dataset = Dataset::from_json_str("two.json", TWO_READINGS).unwrap();
    let info = describe(&dataset);

    assert_eq!(info.len, 2);
    assert_eq!(info.vehicle_ids, vec!["VH-001".to_string()]);
    assert_eq!(info.readings_with_dtc, 1);
    assert!(info.first_timestamp.unwrap() < info.last_timestamp.unwrap());
}

#[test]
fn test_empty_array_is_an_empty_source() {
    let dataset = Dataset::from_json_str("empty.json", "[]").unwrap();
    assert!(dataset.is_empty());
    assert_eq!(describe(&dataset).first_timestamp, None);
}

#[test]
fn test_malformed_reading_names_its_position() {
    let json = TWO_READINGS.replace("\"engine_temp_c\": 110.0,", "");
    let err = Dataset::from_json_str("broken.json", &json).unwrap_err();

    match err {
        DatasetError::Sample { index, .. } => assert_eq!(index, 1),
        other => panic!("expected a per-reading error, got {:?}", other),
    }
}

#[test]
fn test_non_array_document_is_rejected() {
    let err = Dataset::from_json_str("object.json", r#"{"readings": []}"#).unwrap_err();
    assert!(matches!(err, DatasetError::Parse(_)));
}

#[test]
fn test_open_reads_file_and_uses_file_name() {
    let dir = std::env::temp_dir().join(format!("obd-dataset-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("drive.json");
    std::fs::write(&path, TWO_READINGS).unwrap();

    let dataset = Dataset::open(&path).expect("dataset file should load");
    assert_eq!(dataset.name(), "drive.json");
    assert_eq!(dataset.len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_open_missing_file_is_io_error() {
    let path = std::env::temp_dir().join("obd-dataset-does-not-exist.json");
    let err = Dataset::open(&path).unwrap_err();
    assert!(matches!(err, DatasetError::Io { .. }));
}
