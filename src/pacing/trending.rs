//! Trending-mode pacing: platform-driven trade sizing, burst schedules and
//! timing-window recommendations.
//!
//! Each tracked DEX platform has minimum volume/transaction thresholds, an
//! optimal single-trade size and a data-refresh cadence. The calculator maps
//! a [`TrendingConfig`] onto those constraints: it sizes trades around the
//! platform optimum, and for the high-visibility intensities derives burst
//! windows aligned to the platform's refresh cadence. Pure and deterministic
//! given the caller's RNG and clock.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// DEX tracking platform targeted by a trending campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingPlatform {
    Dexscreener,
    Dextools,
    Jupiter,
    Birdeye,
    Solscan,
}

impl fmt::Display for TrendingPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendingPlatform::Dexscreener => "dexscreener",
            TrendingPlatform::Dextools => "dextools",
            TrendingPlatform::Jupiter => "jupiter",
            TrendingPlatform::Birdeye => "birdeye",
            TrendingPlatform::Solscan => "solscan",
        })
    }
}

/// Platform-specific trending thresholds and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Minimum 1h volume (USD) before the platform considers a token
    pub min_volume_1h: f64,
    /// Minimum 24h volume (USD) for sustained trending
    pub min_volume_24h: f64,
    /// Minimum transaction count
    pub min_transactions: u32,
    /// Preferred individual trade size (USD)
    pub optimal_trade_size_usd: f64,
    /// How often the platform refreshes its data, in seconds
    pub refresh_cadence_secs: u32,
}

impl TrendingPlatform {
    /// Threshold profile for this platform.
    pub fn profile(&self) -> PlatformProfile {
        match self {
            TrendingPlatform::Dexscreener => PlatformProfile {
                min_volume_1h: 5_000.0,
                min_volume_24h: 50_000.0,
                min_transactions: 100,
                optimal_trade_size_usd: 500.0,
                refresh_cadence_secs: 300,
            },
            TrendingPlatform::Dextools => PlatformProfile {
                min_volume_1h: 3_000.0,
                min_volume_24h: 25_000.0,
                min_transactions: 75,
                optimal_trade_size_usd: 300.0,
                refresh_cadence_secs: 180,
            },
            TrendingPlatform::Jupiter => PlatformProfile {
                min_volume_1h: 2_000.0,
                min_volume_24h: 15_000.0,
                min_transactions: 50,
                optimal_trade_size_usd: 1_000.0,
                refresh_cadence_secs: 120,
            },
            TrendingPlatform::Birdeye => PlatformProfile {
                min_volume_1h: 4_000.0,
                min_volume_24h: 35_000.0,
                min_transactions: 80,
                optimal_trade_size_usd: 400.0,
                refresh_cadence_secs: 240,
            },
            TrendingPlatform::Solscan => PlatformProfile {
                min_volume_1h: 1_000.0,
                min_volume_24h: 10_000.0,
                min_transactions: 30,
                optimal_trade_size_usd: 200.0,
                refresh_cadence_secs: 60,
            },
        }
    }

    /// Preferred UTC start hours, weekend discount and pre-peak buildup.
    fn timing_profile(&self) -> (&'static [u32], &'static [u32], f64, u32) {
        match self {
            TrendingPlatform::Dextools => (&[14, 15, 16, 17, 18], &[1, 2, 3, 4, 5, 6], 0.8, 30),
            TrendingPlatform::Jupiter => (
                &[12, 13, 14, 15, 16, 17, 18, 19],
                &[2, 3, 4, 5],
                0.9,
                45,
            ),
            // Dexscreener values double as the default for the rest
            _ => (&[13, 14, 15, 16, 17], &[2, 3, 4, 5, 6], 0.7, 60),
        }
    }
}

/// Named aggressiveness preset for a trending campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingIntensity {
    /// Subtle, long-term trending
    Organic,
    /// Fast, high-volume trending
    Aggressive,
    /// Gradual, low-detection trending
    Stealth,
    /// Maximum visibility
    Viral,
}

impl TrendingIntensity {
    /// `(volume, speed, randomness)` multipliers.
    pub fn multipliers(&self) -> (f64, f64, f64) {
        match self {
            TrendingIntensity::Organic => (1.0, 1.0, 0.8),
            TrendingIntensity::Aggressive => (1.5, 2.0, 0.3),
            TrendingIntensity::Stealth => (0.7, 0.5, 1.2),
            TrendingIntensity::Viral => (2.0, 3.0, 0.2),
        }
    }

    /// Only the high-visibility intensities get burst schedules.
    pub fn uses_bursts(&self) -> bool {
        matches!(self, TrendingIntensity::Aggressive | TrendingIntensity::Viral)
    }
}

impl fmt::Display for TrendingIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendingIntensity::Organic => "organic",
            TrendingIntensity::Aggressive => "aggressive",
            TrendingIntensity::Stealth => "stealth",
            TrendingIntensity::Viral => "viral",
        })
    }
}

/// Immutable input for the trending calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingConfig {
    pub platform: TrendingPlatform,
    pub intensity: TrendingIntensity,
    /// Target 24h volume in USD
    pub target_volume_24h: f64,
    /// Target transaction count over the window
    pub target_transactions: u32,
    /// Maximum tolerated price impact per trade, percent
    pub price_impact_tolerance: f64,
    /// Window to achieve the targets, in hours
    pub time_window_hours: u32,
    /// Simulate multiple independent traders
    pub use_multiple_wallets: bool,
    /// Inject occasional synthetic failures for organic appearance
    pub include_failed_txs: bool,
}

/// One amplification window inside a trending plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstWindow {
    /// Minutes from job start
    pub start_offset_minutes: f64,
    pub duration_minutes: f64,
    /// Overall amplification for the window
    pub intensity_multiplier: f64,
    /// Applied to the trade size inside the window
    pub trade_size_multiplier: f64,
    /// Applied to the trade frequency inside the window
    pub frequency_multiplier: f64,
}

impl BurstWindow {
    pub fn end_offset_minutes(&self) -> f64 {
        self.start_offset_minutes + self.duration_minutes
    }

    pub fn contains(&self, offset_minutes: f64) -> bool {
        offset_minutes >= self.start_offset_minutes && offset_minutes < self.end_offset_minutes()
    }
}

/// Advisory timing metadata returned alongside a plan. Never enforced by
/// the execution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRecommendation {
    /// Preferred UTC hours of day to run the campaign
    pub preferred_hours: Vec<u32>,
    /// Penalty multiplier when starting inside a low-activity hour
    pub off_hours_multiplier: f64,
    /// Bonus multiplier when starting inside a preferred hour
    pub peak_hours_multiplier: f64,
    /// Discount applied on weekends
    pub weekend_multiplier: f64,
    /// Minutes of volume buildup recommended before the peak
    pub buildup_minutes: u32,
    /// Combined multiplier for the supplied clock time
    pub current_multiplier: f64,
    /// Whether the supplied clock time falls inside a preferred hour
    pub start_now: bool,
}

/// Burst schedule carried by a trending job; consulted once per loop
/// iteration to scale delay and trade size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingPlan {
    /// Total campaign window in minutes
    pub window_minutes: f64,
    pub bursts: Vec<BurstWindow>,
}

impl TrendingPlan {
    /// The burst window covering the given offset, if any.
    pub fn burst_at(&self, offset_minutes: f64) -> Option<&BurstWindow> {
        self.bursts.iter().find(|b| b.contains(offset_minutes))
    }
}

/// Full output of the trending calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingParameters {
    /// Possibly adjusted toward the platform optimum
    pub target_transactions: u32,
    /// Possibly adjusted toward the platform optimum
    pub average_trade_size_usd: f64,
    /// Base interval between trade pairs, minutes
    pub trade_interval_minutes: f64,
    /// Jitter weight inherited from the intensity preset
    pub randomness_factor: f64,
    /// Maximum tolerated price impact per trade, percent
    pub price_impact_limit: f64,
    pub platform_profile: PlatformProfile,
    pub plan: TrendingPlan,
    pub timing: TimingRecommendation,
}

/// Derive trading parameters, burst schedule and timing advice for a
/// trending campaign.
///
/// Fails with `InvalidParameters` for zero targets or an empty window
/// rather than silently producing an empty plan.
pub fn calculate_parameters<R: Rng + ?Sized>(
    config: &TrendingConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> EngineResult<TrendingParameters> {
    if config.target_volume_24h <= 0.0 {
        return Err(EngineError::invalid(
            "target_volume_24h",
            "must be positive",
        ));
    }
    if config.target_transactions == 0 {
        return Err(EngineError::invalid(
            "target_transactions",
            "must be at least 1",
        ));
    }
    if config.time_window_hours == 0 {
        return Err(EngineError::invalid(
            "time_window_hours",
            "must be at least 1",
        ));
    }

    let profile = config.platform.profile();
    let (volume_mult, speed_mult, randomness) = config.intensity.multipliers();
    let window_minutes = f64::from(config.time_window_hours) * 60.0;

    let mut target_txs = config.target_transactions;
    let mut avg_trade_size =
        config.target_volume_24h / f64::from(target_txs) * volume_mult;
    let mut interval_minutes = window_minutes / f64::from(target_txs) / speed_mult;

    // Pull the trade size toward the platform optimum when it deviates by
    // more than 50%; trade count is re-derived to preserve the volume target.
    let optimal = profile.optimal_trade_size_usd;
    if (avg_trade_size - optimal).abs() > optimal * 0.5 {
        target_txs = ((config.target_volume_24h / optimal).round() as u32).max(1);
        avg_trade_size = optimal;
        interval_minutes = window_minutes / f64::from(target_txs);
    }

    let bursts = burst_schedule(config, &profile, window_minutes, rng);
    let timing = timing_recommendation(config.platform, now);

    Ok(TrendingParameters {
        target_transactions: target_txs,
        average_trade_size_usd: avg_trade_size,
        trade_interval_minutes: interval_minutes,
        randomness_factor: randomness,
        price_impact_limit: config.price_impact_tolerance,
        platform_profile: profile,
        plan: TrendingPlan {
            window_minutes,
            bursts,
        },
        timing,
    })
}

/// Burst windows aligned to the platform refresh cadence, clipped to the
/// campaign window. Empty for intensities without bursts.
fn burst_schedule<R: Rng + ?Sized>(
    config: &TrendingConfig,
    profile: &PlatformProfile,
    window_minutes: f64,
    rng: &mut R,
) -> Vec<BurstWindow> {
    if !config.intensity.uses_bursts() {
        return Vec::new();
    }

    let cadence_minutes = f64::from(profile.refresh_cadence_secs) / 60.0;
    let burst_count = ((window_minutes / cadence_minutes).floor() as u32).max(1);

    let mut windows = Vec::new();
    for i in 0..burst_count {
        let start = f64::from(i) * cadence_minutes;
        if start >= window_minutes {
            break;
        }
        let duration = (cadence_minutes / 2.0).min(30.0).min(window_minutes - start);
        let intensity = match config.intensity {
            TrendingIntensity::Viral => rng.gen_range(1.5..3.0),
            _ => rng.gen_range(1.2..2.0),
        };
        windows.push(BurstWindow {
            start_offset_minutes: start,
            duration_minutes: duration,
            intensity_multiplier: intensity,
            trade_size_multiplier: intensity * 0.8,
            frequency_multiplier: intensity * 1.2,
        });
    }
    windows
}

fn timing_recommendation(platform: TrendingPlatform, now: DateTime<Utc>) -> TimingRecommendation {
    let (preferred, avoid, weekend_multiplier, buildup_minutes) = platform.timing_profile();
    const OFF_HOURS_MULTIPLIER: f64 = 0.5;
    const PEAK_HOURS_MULTIPLIER: f64 = 1.3;

    let hour = now.hour();
    let is_weekend = now.weekday().number_from_monday() >= 6;

    let mut multiplier = 1.0;
    if avoid.contains(&hour) {
        multiplier *= OFF_HOURS_MULTIPLIER;
    } else if preferred.contains(&hour) {
        multiplier *= PEAK_HOURS_MULTIPLIER;
    }
    if is_weekend {
        multiplier *= weekend_multiplier;
    }

    TimingRecommendation {
        preferred_hours: preferred.to_vec(),
        off_hours_multiplier: OFF_HOURS_MULTIPLIER,
        peak_hours_multiplier: PEAK_HOURS_MULTIPLIER,
        weekend_multiplier,
        buildup_minutes,
        current_multiplier: multiplier,
        start_now: preferred.contains(&hour),
    }
}
