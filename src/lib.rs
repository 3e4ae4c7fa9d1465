//! # Run Analyzer
//!
//! Analysis engine for running activities exported as TCX.
//!
//! This library provides:
//! - Activity parsing from raw TCX text or an xml2js-style document tree, with per-trackpoint
//!   derived physics (speed fallback, unit conversions, elapsed time)
//! - Fixed-distance (1 km) lap segmentation
//! - Workout interval matching: find the best occurrence of a structured
//!   effort/recovery workout inside a recorded run
//!
//! ## Features
//!
//! - **`parallel`** - Parallel interval candidate and chain search with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use run_analyzer::{parse_activity, segment_laps, find_best_match, IntervalSpec};
//! use serde_json::json;
//!
//! let document = json!({
//!     "TrainingCenterDatabase": {
//!         "Activities": {
//!             "Activity": {
//!                 "$": { "Sport": "Running" },
//!                 "Id": "2024-05-01T07:00:00Z",
//!                 "Lap": {
//!                     "Track": {
//!                         "Trackpoint": [
//!                             { "Time": "2024-05-01T07:00:00Z", "DistanceMeters": "0" },
//!                             { "Time": "2024-05-01T07:01:00Z", "DistanceMeters": "200" },
//!                             { "Time": "2024-05-01T07:02:00Z", "DistanceMeters": "400" },
//!                         ]
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let activity = parse_activity(&document).unwrap();
//! let laps = segment_laps(&activity.trackpoints);
//! assert_eq!(laps.len(), 1);
//!
//! let spec = IntervalSpec { time_span_s: 60, ..IntervalSpec::default() };
//! let best = find_best_match(&activity.trackpoints, &[spec], 0).unwrap();
//! assert_eq!(best[0].distance_covered, 200.0);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{AnalyzerError, Result};

// Trackpoint derivation (raw sample -> derived physics)
pub mod trackpoint;
pub use trackpoint::{
    ElapsedTime, RawTrackpoint, Trackpoint,
    DEFAULT_EPOCH_TIMESTAMP, INVALID_EPOCH_MS, parse_epoch_ms,
};

// Activity parsing from the TCX document tree
pub mod activity;
pub use activity::{
    Activity, Author, Creator, ParseWarning, parse_activity, parse_activity_str, parse_activity_xml,
};

// Raw TCX text to document tree
pub mod xml;
pub use xml::xml_to_tree;

// Pace formatting
pub mod pace;
pub use pace::{NO_PACE, format_duration, format_pace};

// Fixed-distance laps
pub mod laps;
pub use laps::{Lap, LapConfig, segment_laps, segment_laps_with_config};

// Workout interval matching
pub mod intervals;
pub use intervals::{
    CalculatedInterval, ExpandedPlan, IntervalSearchConfig, IntervalSpec, PaceTrend,
    expand_specs, find_best_match, find_best_match_with_config, pace_trends,
};

// Whole-activity summary
pub mod summary;
pub use summary::ActivitySummary;

pub mod geo_utils;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RunAnalyzerRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use run_analyzer::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// GeoJSON point geometry (`{"type": "Point", "coordinates": [lng, lat]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoJsonLocation {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`, GeoJSON axis order
    pub coordinates: Vec<f64>,
}

impl GeoJsonLocation {
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: vec![longitude, latitude],
        }
    }

    /// Convert back to a GPS point. `None` if the coordinates are not a pair.
    pub fn to_gps_point(&self) -> Option<GpsPoint> {
        match self.coordinates.as_slice() {
            [lng, lat] => Some(GpsPoint::new(*lat, *lng)),
            _ => None,
        }
    }
}

impl From<GpsPoint> for GeoJsonLocation {
    fn from(p: GpsPoint) -> Self {
        GeoJsonLocation::point(p.latitude, p.longitude)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Lap with its member trackpoints given as an index range into the
    /// activity's trackpoints (FFI records cannot borrow).
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiLap {
        pub sequence: u32,
        pub start_time: String,
        pub total_time: f64,
        pub distance_km: f64,
        pub avg_speed: f64,
        pub max_speed: f64,
        pub avg_heart_rate_bpm: f64,
        pub max_heart_rate_bpm: f64,
        pub avg_pace: String,
        pub first_trackpoint_index: u32,
        pub last_trackpoint_index: u32,
    }

    /// Parse a TCX document tree given as JSON text.
    /// Returns `None` (and logs the reason) for malformed documents.
    #[uniffi::export]
    pub fn ffi_parse_activity(document_json: String) -> Option<Activity> {
        init_logging();
        match parse_activity_str(&document_json) {
            Ok(activity) => {
                info!(
                    "[RunAnalyzerRust] Parsed activity {} ({} trackpoints, {} warnings)",
                    activity.activity_id,
                    activity.trackpoints.len(),
                    activity.warnings.len()
                );
                Some(activity)
            }
            Err(e) => {
                warn!("[RunAnalyzerRust] Failed to parse activity: {}", e);
                None
            }
        }
    }

    /// Parse raw TCX (XML) text.
    /// Returns `None` (and logs the reason) for malformed XML or documents.
    #[uniffi::export]
    pub fn ffi_parse_activity_xml(tcx: String) -> Option<Activity> {
        init_logging();
        let start = std::time::Instant::now();
        match parse_activity_xml(&tcx) {
            Ok(activity) => {
                info!(
                    "[RunAnalyzerRust] Parsed TCX activity {} ({} trackpoints, {} warnings) in {:?}",
                    activity.activity_id,
                    activity.trackpoints.len(),
                    activity.warnings.len(),
                    start.elapsed()
                );
                Some(activity)
            }
            Err(e) => {
                warn!("[RunAnalyzerRust] Failed to parse TCX: {}", e);
                None
            }
        }
    }

    /// Split trackpoints into fixed-distance laps.
    #[uniffi::export]
    pub fn ffi_segment_laps(trackpoints: Vec<Trackpoint>, config: LapConfig) -> Vec<FfiLap> {
        init_logging();
        let start = std::time::Instant::now();

        let mut next_index = 0u32;
        let laps: Vec<FfiLap> = segment_laps_with_config(&trackpoints, &config)
            .into_iter()
            .map(|lap| {
                let first = next_index;
                next_index += lap.trackpoints.len() as u32;
                FfiLap {
                    sequence: lap.sequence,
                    start_time: lap.start_time,
                    total_time: lap.total_time,
                    distance_km: lap.distance_km,
                    avg_speed: lap.avg_speed,
                    max_speed: lap.max_speed,
                    avg_heart_rate_bpm: lap.avg_heart_rate_bpm,
                    max_heart_rate_bpm: lap.max_heart_rate_bpm,
                    avg_pace: lap.avg_pace,
                    first_trackpoint_index: first,
                    last_trackpoint_index: next_index.saturating_sub(1),
                }
            })
            .collect();

        info!("[RunAnalyzerRust] Segmented {} trackpoints into {} laps in {:?}",
              trackpoints.len(), laps.len(), start.elapsed());
        laps
    }

    /// Find the best-matching interval chain for a workout.
    #[uniffi::export]
    pub fn ffi_find_best_match(
        trackpoints: Vec<Trackpoint>,
        specs: Vec<IntervalSpec>,
        start_index: u32,
        config: IntervalSearchConfig,
    ) -> Option<Vec<CalculatedInterval>> {
        init_logging();
        info!(
            "[RunAnalyzerRust] find_best_match: {} trackpoints, {} specs, start {}",
            trackpoints.len(),
            specs.len(),
            start_index
        );
        let start = std::time::Instant::now();
        let result = find_best_match_with_config(&trackpoints, &specs, start_index as usize, &config);
        info!("[RunAnalyzerRust] Interval search finished in {:?}", start.elapsed());
        result
    }

    /// Whole-activity summary (distance, time, pace, heart rate, bounds).
    #[uniffi::export]
    pub fn ffi_summarize_activity(activity: Activity) -> ActivitySummary {
        init_logging();
        ActivitySummary::from_activity(&activity)
    }

    #[uniffi::export]
    pub fn ffi_pace_trends(intervals: Vec<CalculatedInterval>) -> Vec<PaceTrend> {
        pace_trends(&intervals)
    }

    #[uniffi::export]
    pub fn ffi_format_pace(speed: f64) -> String {
        format_pace(speed)
    }

    /// Get default lap configuration.
    #[uniffi::export]
    pub fn default_lap_config() -> LapConfig {
        LapConfig::default()
    }

    /// Get default interval search configuration.
    #[uniffi::export]
    pub fn default_interval_search_config() -> IntervalSearchConfig {
        IntervalSearchConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
