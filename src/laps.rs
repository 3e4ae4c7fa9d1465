//! # Fixed-Distance Laps
//!
//! Splits an activity's trackpoints into consecutive laps of (by default) 1 km.
//!
//! A lap starts at the first trackpoint not yet assigned and closes at the
//! first trackpoint whose distance from the lap's own start reaches the lap
//! distance. Whatever remains when the stream ends becomes a final, possibly
//! shorter lap. Aggregates are computed once per finished slice, so the laps
//! partition the input exactly and borrow it rather than copying.

use chrono::{DateTime, SecondsFormat};
use log::debug;
use serde::Serialize;

use crate::pace::format_pace;
use crate::trackpoint::Trackpoint;

/// Configuration for lap segmentation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LapConfig {
    /// Distance at which a lap closes, in kilometres.
    /// Default: 1.0
    pub lap_distance_km: f64,
}

impl Default for LapConfig {
    fn default() -> Self {
        Self { lap_distance_km: 1.0 }
    }
}

/// A contiguous, distance-bounded slice of an activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lap<'a> {
    /// 0-based lap index
    pub sequence: u32,
    /// RFC 3339 time of the lap's first trackpoint
    pub start_time: String,
    /// Seconds between the lap's first and last trackpoint
    pub total_time: f64,
    /// Distance covered within this lap (not cumulative)
    pub distance_km: f64,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub avg_heart_rate_bpm: f64,
    pub max_heart_rate_bpm: f64,
    pub avg_pace: String,
    pub trackpoints: &'a [Trackpoint],
}

impl<'a> Lap<'a> {
    /// Build a lap from a non-empty slice.
    fn from_slice(sequence: u32, trackpoints: &'a [Trackpoint]) -> Self {
        let first = &trackpoints[0];
        let last = &trackpoints[trackpoints.len() - 1];
        let count = trackpoints.len() as f64;

        let speeds = trackpoints.iter().map(|tp| tp.speed.unwrap_or(0.0));
        let heart_rates = trackpoints.iter().map(|tp| tp.heart_rate_bpm.unwrap_or(0.0));

        let avg_speed = speeds.clone().sum::<f64>() / count;
        let avg_heart_rate_bpm = heart_rates.clone().sum::<f64>() / count;

        Self {
            sequence,
            start_time: start_time(first.epoch_ms),
            total_time: ((last.epoch_ms - first.epoch_ms) as f64 / 1000.0).max(0.0),
            distance_km: relative_km(first, last),
            avg_speed,
            max_speed: speeds.fold(0.0, f64::max),
            avg_heart_rate_bpm,
            max_heart_rate_bpm: heart_rates.fold(0.0, f64::max),
            avg_pace: format_pace(avg_speed),
            trackpoints,
        }
    }
}

fn relative_km(first: &Trackpoint, current: &Trackpoint) -> f64 {
    current.distance_km.unwrap_or(0.0) - first.distance_km.unwrap_or(0.0)
}

fn start_time(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Split trackpoints into 1 km laps.
///
/// # Example
/// ```
/// use run_analyzer::{segment_laps, Trackpoint};
///
/// let trackpoints: Vec<Trackpoint> = (0..30)
///     .map(|i| Trackpoint {
///         sequence: i + 1,
///         distance_km: Some(i as f64 * 0.1),
///         ..Trackpoint::default()
///     })
///     .collect();
///
/// let laps = segment_laps(&trackpoints);
/// assert_eq!(laps.len(), 3);
/// assert_eq!(laps[0].trackpoints.len(), 11);
/// ```
pub fn segment_laps(trackpoints: &[Trackpoint]) -> Vec<Lap<'_>> {
    segment_laps_with_config(trackpoints, &LapConfig::default())
}

/// Split trackpoints into laps of `config.lap_distance_km`.
pub fn segment_laps_with_config<'a>(trackpoints: &'a [Trackpoint], config: &LapConfig) -> Vec<Lap<'a>> {
    let mut laps = Vec::new();
    let mut start = 0;

    for end in 0..trackpoints.len() {
        if relative_km(&trackpoints[start], &trackpoints[end]) >= config.lap_distance_km {
            laps.push(Lap::from_slice(laps.len() as u32, &trackpoints[start..=end]));
            start = end + 1;
        }
    }

    if start < trackpoints.len() {
        laps.push(Lap::from_slice(laps.len() as u32, &trackpoints[start..]));
    }

    debug!("Segmented {} trackpoints into {} laps", trackpoints.len(), laps.len());
    laps
}
