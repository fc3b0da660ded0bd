//! Per-sample reward calculation
//!
//! Every shared reading earns a base rate, plus bonuses for readings that
//! are worth more to data buyers:
//!
//! | Term                | Amount   | Condition                         |
//! |---------------------|----------|-----------------------------------|
//! | Base                | 0.001    | always                            |
//! | Speed bonus         | 0.0005   | `speed_kmph > 60`                 |
//! | Diagnostic bonus    | 0.002    | a DTC code is present             |
//! | Temperature bonus   | 0.001    | `engine_temp_c > 100` or `< 50`   |
//! | Market fluctuation  | [0, 0.0005) | uniform random                 |
//!
//! The sum is rounded to 4 decimal places, half away from zero.

use crate::model::TelemetrySample;
use rand::Rng;
use serde::Serialize;

pub const BASE_RATE: f64 = 0.001;
pub const SPEED_BONUS: f64 = 0.0005;
pub const DIAGNOSTIC_BONUS: f64 = 0.002;
pub const TEMPERATURE_BONUS: f64 = 0.001;
/// Exclusive upper bound of the random market-fluctuation term
pub const MAX_JITTER: f64 = 0.0005;

pub const SPEED_BONUS_THRESHOLD_KMPH: f64 = 60.0;
pub const HOT_ENGINE_THRESHOLD_C: f64 = 100.0;
pub const COLD_ENGINE_THRESHOLD_C: f64 = 50.0;

/// Each term that went into one reward
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub base: f64,
    pub speed_bonus: f64,
    pub diagnostic_bonus: f64,
    pub temperature_bonus: f64,
    pub jitter: f64,
}

impl RewardBreakdown {
    /// Score a sample with the given market-fluctuation term
    pub fn for_sample(sample: &TelemetrySample, jitter: f64) -> Self {
        let speed_bonus = if sample.speed_kmph.0 > SPEED_BONUS_THRESHOLD_KMPH {
            SPEED_BONUS
        } else {
            0.0
        };

        let diagnostic_bonus = if sample.dtc_code.is_some() {
            DIAGNOSTIC_BONUS
        } else {
            0.0
        };

        let temp = sample.engine_temp_c.0;
        let temperature_bonus = if temp > HOT_ENGINE_THRESHOLD_C || temp < COLD_ENGINE_THRESHOLD_C {
            TEMPERATURE_BONUS
        } else {
            0.0
        };

        Self {
            base: BASE_RATE,
            speed_bonus,
            diagnostic_bonus,
            temperature_bonus,
            jitter,
        }
    }

    /// Sum of the terms that depend only on the sample
    pub fn deterministic(&self) -> f64 {
        self.base + self.speed_bonus + self.diagnostic_bonus + self.temperature_bonus
    }

    /// Final reward, rounded to 4 decimal places
    pub fn total(&self) -> f64 {
        round4(self.deterministic() + self.jitter)
    }
}

/// Round half away from zero to 4 decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Score one sample, drawing the market fluctuation from `rng`
pub fn compute_reward_with<R: Rng + ?Sized>(sample: &TelemetrySample, rng: &mut R) -> f64 {
    let jitter = rng.gen_range(0.0..MAX_JITTER);
    RewardBreakdown::for_sample(sample, jitter).total()
}

/// Score one sample using the thread-local RNG
pub fn compute_reward(sample: &TelemetrySample) -> f64 {
    compute_reward_with(sample, &mut rand::thread_rng())
}

/// Reward terms for display on an earnings screen
#[derive(Debug, Clone, Serialize)]
pub struct RateCard {
    pub base_rate: f64,
    pub speed_bonus: f64,
    pub speed_bonus_threshold_kmph: f64,
    pub diagnostic_bonus: f64,
    pub temperature_bonus: f64,
    pub hot_engine_threshold_c: f64,
    pub cold_engine_threshold_c: f64,
    pub max_market_fluctuation: f64,
}

impl RateCard {
    pub fn current() -> Self {
        Self {
            base_rate: BASE_RATE,
            speed_bonus: SPEED_BONUS,
            speed_bonus_threshold_kmph: SPEED_BONUS_THRESHOLD_KMPH,
            diagnostic_bonus: DIAGNOSTIC_BONUS,
            temperature_bonus: TEMPERATURE_BONUS,
            hot_engine_threshold_c: HOT_ENGINE_THRESHOLD_C,
            cold_engine_threshold_c: COLD_ENGINE_THRESHOLD_C,
            max_market_fluctuation: MAX_JITTER,
        }
    }
}
