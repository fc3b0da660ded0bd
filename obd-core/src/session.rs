//! Sharing session state machine
//!
//! A `Session` is the single owner of everything that changes while a user
//! shares data: the replay cursor, the current sample, accrued earnings and
//! the diagnostic codes seen so far. It does no scheduling of its own; a
//! driver calls [`Session::tick`] on a timer and serializes that with
//! [`Session::toggle_sharing`] and [`Session::reset_earnings`].
//!
//! Two states:
//! - **Idle** (`is_sharing() == false`): ticks are no-ops, state is frozen.
//! - **Active** (`is_sharing() == true`): each tick advances and scores.

use crate::aggregate::{self, Projection};
use crate::model::{EarningsEntry, GeoPoint, TelemetrySample};
use crate::reward::compute_reward_with;
use crate::source::ReadingSource;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

/// Number of processed samples kept for the map trail and gauges
pub const RECENT_SAMPLE_CAPACITY: usize = 100;

/// Points in each dashboard gauge series
pub const GAUGE_WIDTH: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Reading source {source_name:?} has no samples; sharing cannot start")]
    EmptySource { source_name: String },

    #[error("Reading source {source_name:?} has no sample at index {index} (len {len})")]
    MissingSample {
        source_name: String,
        index: usize,
        len: usize,
    },
}

/// Result of one advance-and-score cycle
#[derive(Debug, Clone, Serialize)]
pub struct TickEvent {
    /// Cursor position after the tick
    pub index: usize,
    pub sample: TelemetrySample,
    pub reward: f64,
    pub cumulative_earnings: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    current_index: Option<usize>,
    current_sample: Option<TelemetrySample>,
    sharing: bool,
    cumulative_earnings: f64,
    earnings_history: Vec<EarningsEntry>,
    // Vec rather than a set: first-seen order is what the dashboard lists
    diagnostic_codes_seen: Vec<String>,
    recent_samples: VecDeque<TelemetrySample>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip between Idle and Active, returning the new sharing flag
    ///
    /// The first activation points the cursor at index 0 and shows that
    /// sample without scoring it. Later activations resume where the cursor
    /// stopped. Activation against an empty source fails and leaves the
    /// session Idle.
    pub fn toggle_sharing(&mut self, source: &dyn ReadingSource) -> Result<bool, SessionError> {
        if self.sharing {
            self.sharing = false;
            return Ok(false);
        }

        if source.is_empty() {
            return Err(SessionError::EmptySource {
                source_name: source.name().to_string(),
            });
        }

        if self.current_sample.is_none() {
            let first = sample_at(source, 0)?.clone();
            self.current_index = Some(0);
            self.remember(first.clone());
            self.current_sample = Some(first);
        }

        self.sharing = true;
        Ok(true)
    }

    /// Advance to the next sample and credit its reward
    ///
    /// Returns `Ok(None)` when Idle. Steps, in order: wrap the cursor forward,
    /// load the sample, score it, add to the total, log the entry, record a
    /// new DTC code.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        source: &dyn ReadingSource,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Option<TickEvent>, SessionError> {
        if !self.sharing {
            return Ok(None);
        }

        let len = source.len();
        if len == 0 {
            return Err(SessionError::EmptySource {
                source_name: source.name().to_string(),
            });
        }

        let index = self.current_index.map_or(0, |i| (i + 1) % len);
        let sample = sample_at(source, index)?.clone();
        let reward = compute_reward_with(&sample, rng);

        self.current_index = Some(index);
        self.cumulative_earnings += reward;
        self.earnings_history.push(EarningsEntry {
            timestamp: now,
            amount: reward,
        });

        if let Some(code) = &sample.dtc_code {
            if !self.diagnostic_codes_seen.contains(code) {
                self.diagnostic_codes_seen.push(code.clone());
            }
        }

        self.remember(sample.clone());
        self.current_sample = Some(sample.clone());

        Ok(Some(TickEvent {
            index,
            sample,
            reward,
            cumulative_earnings: self.cumulative_earnings,
            timestamp: now,
        }))
    }

    /// Zero the balance and clear the earnings log
    ///
    /// The sharing flag, the cursor and the diagnostic codes are kept.
    pub fn reset_earnings(&mut self) {
        self.cumulative_earnings = 0.0;
        self.earnings_history.clear();
    }

    fn remember(&mut self, sample: TelemetrySample) {
        if self.recent_samples.len() == RECENT_SAMPLE_CAPACITY {
            self.recent_samples.pop_front();
        }
        self.recent_samples.push_back(sample);
    }

    pub fn is_sharing(&self) -> bool {
        self.sharing
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_sample(&self) -> Option<&TelemetrySample> {
        self.current_sample.as_ref()
    }

    pub fn cumulative_earnings(&self) -> f64 {
        self.cumulative_earnings
    }

    pub fn earnings_history(&self) -> &[EarningsEntry] {
        &self.earnings_history
    }

    pub fn diagnostic_codes_seen(&self) -> &[String] {
        &self.diagnostic_codes_seen
    }

    pub fn projection(&self) -> Projection {
        aggregate::project(self.cumulative_earnings, self.earnings_history.len())
    }

    /// Last processed positions, oldest first
    pub fn route_trail(&self) -> Vec<GeoPoint> {
        self.recent_samples.iter().map(|s| s.position()).collect()
    }

    /// Recent speeds for the dashboard chart
    pub fn speed_gauge(&self) -> Vec<f64> {
        aggregate::gauge_series(self.recent_samples.iter().map(|s| s.speed_kmph.0), GAUGE_WIDTH)
    }

    /// Recent engine speeds in hundreds of rpm, on the same chart as speed
    pub fn rpm_gauge(&self) -> Vec<f64> {
        aggregate::gauge_series(
            self.recent_samples.iter().map(|s| s.engine_rpm.hundreds()),
            GAUGE_WIDTH,
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sharing: self.sharing,
            current_index: self.current_index,
            current_sample: self.current_sample.clone(),
            cumulative_earnings: self.cumulative_earnings,
            history_len: self.earnings_history.len(),
            diagnostic_codes_seen: self.diagnostic_codes_seen.clone(),
        }
    }
}

fn sample_at(source: &dyn ReadingSource, index: usize) -> Result<&TelemetrySample, SessionError> {
    source.sample(index).ok_or_else(|| SessionError::MissingSample {
        source_name: source.name().to_string(),
        index,
        len: source.len(),
    })
}

/// Point-in-time copy of the session for display surfaces
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub sharing: bool,
    pub current_index: Option<usize>,
    pub current_sample: Option<TelemetrySample>,
    pub cumulative_earnings: f64,
    pub history_len: usize,
    pub diagnostic_codes_seen: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn sample(speed: f64, temp: f64, dtc: Option<&str>) -> TelemetrySample {
        TelemetrySample {
            vehicle_id: "VH-TEST".to_string(),
            timestamp: Utc::now(),
            speed_kmph: Kmph(speed),
            engine_rpm: Rpm(speed * 40.0 + 800.0),
            fuel_level_pct: Percent(70.0),
            engine_temp_c: Celsius(temp),
            dtc_code: dtc.map(str::to_string),
            lat: Degrees(37.0 + speed / 1000.0),
            lon: Degrees(-122.0),
        }
    }

    fn two_sample_source() -> Vec<TelemetrySample> {
        vec![
            sample(70.0, 90.0, None),
            sample(40.0, 110.0, Some("P0171")),
        ]
    }

    fn history_sum(session: &Session) -> f64 {
        session.earnings_history().iter().map(|e| e.amount).sum()
    }

    #[test]
    fn test_new_session_is_idle_without_cursor() {
        let session = Session::new();
        assert!(!session.is_sharing());
        assert_eq!(session.current_index(), None);
        assert!(session.current_sample().is_none());
        assert_eq!(session.cumulative_earnings(), 0.0);
    }

    #[test]
    fn test_first_activation_shows_index_zero_without_earning() {
        let source = two_sample_source();
        let mut session = Session::new();

        assert!(session.toggle_sharing(&source).unwrap());
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.current_sample(), Some(&source[0]));
        assert!(session.earnings_history().is_empty());
        assert_eq!(session.cumulative_earnings(), 0.0);
    }

    #[test]
    fn test_empty_source_refuses_activation() {
        let source: Vec<TelemetrySample> = Vec::new();
        let mut session = Session::new();

        let err = session.toggle_sharing(&source).unwrap_err();
        assert!(matches!(err, SessionError::EmptySource { .. }));
        assert!(!session.is_sharing());
        assert_eq!(session.current_index(), None);
    }

    #[test]
    fn test_tick_while_idle_is_noop() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(session.tick(&source, &mut rng, Utc::now()).unwrap().is_none());
        assert_eq!(session.current_index(), None);
        assert!(session.earnings_history().is_empty());
    }

    #[test]
    fn test_two_sample_scenario() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(42);
        session.toggle_sharing(&source).unwrap();

        // First tick advances past the activation sample onto the DTC reading
        let first = session.tick(&source, &mut rng, Utc::now()).unwrap().unwrap();
        assert_eq!(first.index, 1);
        assert!(first.reward >= 0.0040 - EPS && first.reward <= 0.0045 + EPS);

        // Second tick wraps back to the highway reading
        let second = session.tick(&source, &mut rng, Utc::now()).unwrap().unwrap();
        assert_eq!(second.index, 0);
        assert!(second.reward >= 0.0015 - EPS && second.reward <= 0.0020 + EPS);

        assert_eq!(session.diagnostic_codes_seen(), &["P0171".to_string()]);
        assert_eq!(session.earnings_history().len(), 2);
        assert!((session.cumulative_earnings() - (first.reward + second.reward)).abs() < EPS);
    }

    #[test]
    fn test_index_wraps_after_len_ticks() {
        let source: Vec<TelemetrySample> = (0..5).map(|i| sample(i as f64 * 20.0, 90.0, None)).collect();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(3);
        session.toggle_sharing(&source).unwrap();

        let start = session.current_index();
        for _ in 0..source.len() {
            session.tick(&source, &mut rng, Utc::now()).unwrap();
        }
        assert_eq!(session.current_index(), start);
        assert_eq!(session.earnings_history().len(), source.len());
    }

    #[test]
    fn test_cumulative_matches_history_sum() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(9);
        session.toggle_sharing(&source).unwrap();

        for i in 0..50 {
            session.tick(&source, &mut rng, Utc::now()).unwrap();
            assert!((session.cumulative_earnings() - history_sum(&session)).abs() < EPS);
            if i == 20 {
                session.reset_earnings();
                assert!((session.cumulative_earnings() - history_sum(&session)).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_pause_freezes_state_and_double_pause_is_harmless() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(5);
        session.toggle_sharing(&source).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();

        assert!(!session.toggle_sharing(&source).unwrap());
        let earnings = session.cumulative_earnings();
        let len = session.earnings_history().len();
        let index = session.current_index();

        assert!(session.tick(&source, &mut rng, Utc::now()).unwrap().is_none());
        assert_eq!(session.cumulative_earnings(), earnings);
        assert_eq!(session.earnings_history().len(), len);
        assert_eq!(session.current_index(), index);
    }

    #[test]
    fn test_resume_continues_from_cursor() {
        let source: Vec<TelemetrySample> = (0..4).map(|i| sample(i as f64 * 10.0, 90.0, None)).collect();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(11);

        session.toggle_sharing(&source).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();
        session.toggle_sharing(&source).unwrap();
        session.toggle_sharing(&source).unwrap();

        assert_eq!(session.current_index(), Some(2));
        let event = session.tick(&source, &mut rng, Utc::now()).unwrap().unwrap();
        assert_eq!(event.index, 3);
    }

    #[test]
    fn test_reset_clears_earnings_only() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(8);
        session.toggle_sharing(&source).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();

        session.reset_earnings();

        assert_eq!(session.cumulative_earnings(), 0.0);
        assert!(session.earnings_history().is_empty());
        assert!(session.is_sharing());
        assert_eq!(session.current_index(), Some(1));
        assert_eq!(session.diagnostic_codes_seen(), &["P0171".to_string()]);
    }

    #[test]
    fn test_repeated_dtc_is_recorded_once() {
        let source = vec![
            sample(30.0, 90.0, Some("P0420")),
            sample(30.0, 90.0, Some("P0420")),
            sample(30.0, 90.0, Some("P0300")),
        ];
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(2);
        session.toggle_sharing(&source).unwrap();

        for _ in 0..6 {
            session.tick(&source, &mut rng, Utc::now()).unwrap();
        }

        assert_eq!(
            session.diagnostic_codes_seen(),
            &["P0420".to_string(), "P0300".to_string()]
        );
    }

    #[test]
    fn test_activation_sample_code_is_not_recorded() {
        let source = vec![sample(30.0, 90.0, Some("P0455")), sample(30.0, 90.0, None)];
        let mut session = Session::new();
        session.toggle_sharing(&source).unwrap();
        assert!(session.diagnostic_codes_seen().is_empty());
    }

    #[test]
    fn test_gauges_and_trail_track_processed_samples() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(4);
        session.toggle_sharing(&source).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();

        assert_eq!(session.speed_gauge(), vec![0.0, 0.0, 0.0, 0.0, 70.0, 40.0]);
        assert_eq!(session.rpm_gauge()[5], 24.0);
        assert_eq!(session.route_trail().len(), 2);

        for _ in 0..(RECENT_SAMPLE_CAPACITY * 2) {
            session.tick(&source, &mut rng, Utc::now()).unwrap();
        }
        assert_eq!(session.route_trail().len(), RECENT_SAMPLE_CAPACITY);

        session.reset_earnings();
        assert_eq!(session.route_trail().len(), RECENT_SAMPLE_CAPACITY);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let source = two_sample_source();
        let mut session = Session::new();
        let mut rng = StdRng::seed_from_u64(6);
        session.toggle_sharing(&source).unwrap();
        session.tick(&source, &mut rng, Utc::now()).unwrap();

        let snap = session.snapshot();
        assert!(snap.sharing);
        assert_eq!(snap.current_index, Some(1));
        assert_eq!(snap.history_len, 1);
        assert_eq!(snap.current_sample.unwrap().dtc_code.as_deref(), Some("P0171"));
    }
}
