//! Whole-activity summary.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::geo_utils::{compute_center, polyline_length, track_positions};
use crate::laps::segment_laps;
use crate::pace::format_pace;
use crate::{Bounds, GpsPoint};

/// Headline numbers for one parsed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivitySummary {
    pub activity_id: String,
    pub sport: String,
    /// Device distance at the last trackpoint
    pub total_distance_km: f64,
    pub elapsed_seconds: Option<u64>,
    pub elapsed_hhmmss: Option<String>,
    pub avg_speed: f64,
    pub avg_pace: String,
    pub avg_heart_rate_bpm: f64,
    pub max_heart_rate_bpm: f64,
    pub trackpoint_count: u32,
    /// Number of 1 km laps
    pub lap_count: u32,
    /// Haversine length of the positioned trackpoints
    pub gps_distance_meters: f64,
    pub bounds: Option<Bounds>,
    pub center: Option<GpsPoint>,
}

impl ActivitySummary {
    pub fn from_activity(activity: &Activity) -> Self {
        let trackpoints = &activity.trackpoints;
        let count = trackpoints.len().max(1) as f64;

        let avg_speed = trackpoints.iter().map(|tp| tp.speed.unwrap_or(0.0)).sum::<f64>() / count;
        let heart_rates = trackpoints.iter().map(|tp| tp.heart_rate_bpm.unwrap_or(0.0));
        let last = activity.last_trackpoint();

        let positions = track_positions(trackpoints);
        let bounds = Bounds::from_points(&positions);

        let summary = Self {
            activity_id: activity.activity_id.clone(),
            sport: activity.sport.clone(),
            total_distance_km: last.and_then(|tp| tp.distance_km).unwrap_or(0.0),
            elapsed_seconds: last.and_then(|tp| tp.elapsed_seconds),
            elapsed_hhmmss: last.and_then(|tp| tp.elapsed_hhmmss.clone()),
            avg_speed,
            avg_pace: format_pace(avg_speed),
            avg_heart_rate_bpm: heart_rates.clone().sum::<f64>() / count,
            max_heart_rate_bpm: heart_rates.fold(0.0, f64::max),
            trackpoint_count: trackpoints.len() as u32,
            lap_count: segment_laps(trackpoints).len() as u32,
            gps_distance_meters: polyline_length(&positions),
            bounds,
            center: bounds.map(|_| compute_center(&positions)),
        };

        debug!(
            "Summary for {}: {:.2} km over {} trackpoints, {} laps",
            summary.activity_id, summary.total_distance_km, summary.trackpoint_count, summary.lap_count
        );
        summary
    }
}
