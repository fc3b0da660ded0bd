//! Synthetic drive generator
//!
//! Builds a day of believable OBD-II readings for one vehicle without a
//! recorded dataset: a daily routine of parked, urban and highway phases
//! around a looping route, with rpm following speed through a gearbox,
//! a draining fuel tank that gets refilled, an engine that warms up and
//! occasionally runs hot, and the odd trouble code.
//!
//! Generation is seeded, so the same seed always yields the same dataset.

use crate::dataset::Dataset;
use chrono::{DateTime, Duration, TimeZone, Utc};
use obd_core::{model::TelemetrySample, units::*};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Daily routine: a repeating sequence of drive phases
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
enum PhaseKind {
    Parked,   // Engine off, car cooling down
    Idle,     // Engine running, stationary (warm-up, traffic lights)
    Urban,    // Stop-and-go city driving
    Highway,  // Sustained high speed
}

#[derive(Clone, Copy)]
struct DrivePhase {
    kind: PhaseKind,
    minutes: u32,
    target_speed: f64, // km/h reached mid-phase
}

/// A ~24h routine: night parked, commute, errands, evening highway trip
fn daily_routine() -> Vec<DrivePhase> {
    vec![
        DrivePhase { kind: PhaseKind::Parked,  minutes: 420, target_speed: 0.0 },
        DrivePhase { kind: PhaseKind::Idle,    minutes: 5,   target_speed: 0.0 },
        DrivePhase { kind: PhaseKind::Urban,   minutes: 25,  target_speed: 45.0 },
        DrivePhase { kind: PhaseKind::Highway, minutes: 35,  target_speed: 105.0 },
        DrivePhase { kind: PhaseKind::Urban,   minutes: 15,  target_speed: 35.0 },
        DrivePhase { kind: PhaseKind::Parked,  minutes: 480, target_speed: 0.0 },
        DrivePhase { kind: PhaseKind::Idle,    minutes: 3,   target_speed: 0.0 },
        DrivePhase { kind: PhaseKind::Urban,   minutes: 40,  target_speed: 40.0 },
        DrivePhase { kind: PhaseKind::Parked,  minutes: 60,  target_speed: 0.0 },
        DrivePhase { kind: PhaseKind::Urban,   minutes: 20,  target_speed: 50.0 },
        DrivePhase { kind: PhaseKind::Highway, minutes: 90,  target_speed: 118.0 },
        DrivePhase { kind: PhaseKind::Urban,   minutes: 20,  target_speed: 38.0 },
        DrivePhase { kind: PhaseKind::Parked,  minutes: 227, target_speed: 0.0 },
    ]
}

fn phase_at(routine: &[DrivePhase], minute: u32) -> (DrivePhase, f64) {
    let total: u32 = routine.iter().map(|p| p.minutes).sum();
    let t = minute % total.max(1);

    let mut elapsed = 0;
    for phase in routine {
        if t < elapsed + phase.minutes {
            let progress = (t - elapsed) as f64 / phase.minutes as f64;
            return (*phase, progress);
        }
        elapsed += phase.minutes;
    }

    // Unreachable for a non-empty routine; fall back to the final phase
    (routine[routine.len() - 1], 1.0)
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn speed_to_gear(kmph: f64) -> u8 {
    match kmph {
        x if x < 1.0 => 0,
        x if x < 20.0 => 1,
        x if x < 40.0 => 2,
        x if x < 60.0 => 3,
        x if x < 85.0 => 4,
        x if x < 110.0 => 5,
        _ => 6,
    }
}

fn speed_to_rpm(kmph: f64, gear: u8) -> f64 {
    const IDLE_RPM: f64 = 780.0;
    // Lower gear = higher rpm for the same road speed
    let ratio = match gear {
        0 => return IDLE_RPM,
        1 => 110.0,
        2 => 62.0,
        3 => 45.0,
        4 => 35.0,
        5 => 28.0,
        _ => 23.0,
    };
    (kmph * ratio + IDLE_RPM).clamp(IDLE_RPM, 6500.0)
}

// =============================================================================
// Generator
// =============================================================================

/// Codes that show up occasionally while driving
const DRIVING_FAULTS: &[&str] = &["P0171", "P0300", "P0420", "P0455", "P0401", "P0128", "U0100"];

const AMBIENT_TEMP_C: f64 = 20.0;
const OPERATING_TEMP_C: f64 = 90.0;
const FUEL_BURN_PCT_PER_KM: f64 = 0.18;
const REFUEL_BELOW_PCT: f64 = 8.0;

/// Route loop: a ring around a city center
const ROUTE_CENTER: (f64, f64) = (37.7749, -122.4194);
const ROUTE_RADIUS_DEG: f64 = 0.05;
const ROUTE_LENGTH_KM: f64 = 35.0;

pub struct SyntheticDrive {
    seed: u64,
    samples: usize,
    interval: Duration,
    start: DateTime<Utc>,
    vehicle_id: String,
}

impl SyntheticDrive {
    /// A day of per-minute readings starting at midnight UTC
    pub fn new() -> Self {
        Self {
            seed: 0x0BD2,
            samples: 1440,
            interval: Duration::minutes(1),
            start: Utc
                .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            vehicle_id: "SIM-VH-0001".to_string(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_vehicle_id(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = vehicle_id.into();
        self
    }

    pub fn generate(&self) -> Dataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let routine = daily_routine();
        let minutes_per_sample = (self.interval.num_seconds() as f64 / 60.0).max(1.0 / 60.0);

        let mut samples = Vec::with_capacity(self.samples);
        let mut fuel = 82.0_f64;
        let mut engine_temp = AMBIENT_TEMP_C;
        let mut route_km = 0.0_f64;

        for i in 0..self.samples {
            let minute = (i as f64 * minutes_per_sample) as u32;
            let (phase, progress) = phase_at(&routine, minute);

            // Speed ramps in and out of each driving phase
            let envelope = if progress < 0.5 {
                smoothstep(progress * 4.0)
            } else {
                smoothstep((1.0 - progress) * 4.0)
            };
            let speed = match phase.kind {
                PhaseKind::Parked | PhaseKind::Idle => 0.0,
                PhaseKind::Urban => {
                    // stop-and-go: traffic lights pull speed to zero now and then
                    if rng.gen_bool(0.15) {
                        0.0
                    } else {
                        (phase.target_speed * envelope + rng.gen_range(-8.0..8.0)).max(0.0)
                    }
                }
                PhaseKind::Highway => {
                    (phase.target_speed * envelope + rng.gen_range(-6.0..6.0)).max(0.0)
                }
            };

            let engine_on = phase.kind != PhaseKind::Parked;
            let rpm = if engine_on {
                let gear = speed_to_gear(speed);
                (speed_to_rpm(speed, gear) + rng.gen_range(-40.0..40.0)).clamp(0.0, 6500.0)
            } else {
                0.0
            };

            // Coolant: warms toward operating temperature, runs hot on long
            // highway stretches, cools toward ambient when parked
            let target_temp = match phase.kind {
                PhaseKind::Parked => AMBIENT_TEMP_C,
                PhaseKind::Highway if progress > 0.7 => OPERATING_TEMP_C + 16.0,
                _ => OPERATING_TEMP_C,
            };
            let rate = if engine_on { 0.12 } else { 0.03 };
            engine_temp += (target_temp - engine_temp) * rate * minutes_per_sample.min(8.0);
            let temp = engine_temp + rng.gen_range(-0.8..0.8);

            let km = speed * minutes_per_sample / 60.0;
            route_km = (route_km + km) % ROUTE_LENGTH_KM;
            fuel -= km * FUEL_BURN_PCT_PER_KM;
            if fuel < REFUEL_BELOW_PCT && phase.kind == PhaseKind::Parked {
                fuel = rng.gen_range(90.0..100.0);
            }
            fuel = fuel.clamp(0.0, 100.0);

            let dtc_code = if engine_on && rng.gen_bool(0.04) {
                Some(DRIVING_FAULTS[rng.gen_range(0..DRIVING_FAULTS.len())].to_string())
            } else {
                None
            };

            let angle = route_km / ROUTE_LENGTH_KM * std::f64::consts::TAU;
            let lat = ROUTE_CENTER.0 + ROUTE_RADIUS_DEG * angle.sin();
            let lon = ROUTE_CENTER.1 + ROUTE_RADIUS_DEG * angle.cos();

            samples.push(TelemetrySample {
                vehicle_id: self.vehicle_id.clone(),
                timestamp: self.start + self.interval * i as i32,
                speed_kmph: Kmph(speed),
                engine_rpm: Rpm(rpm),
                fuel_level_pct: Percent::new(fuel),
                engine_temp_c: Celsius(temp),
                dtc_code,
                lat: Degrees(lat),
                lon: Degrees(lon),
            });
        }

        Dataset::new("Synthetic", samples)
    }
}

impl Default for SyntheticDrive {
    fn default() -> Self {
        Self::new()
    }
}
