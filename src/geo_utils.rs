//! # Geographic Utilities
//!
//! Distance and extent of the part of a run that has a GPS fix. Trackpoints
//! recorded indoors or before the fix carry no position and are skipped by
//! [`track_positions`]. Coordinates are WGS84 degrees.
//!
//! ```rust
//! use run_analyzer::{GpsPoint, geo_utils};
//!
//! let out_and_back = vec![
//!     GpsPoint::new(51.500, -0.1278),
//!     GpsPoint::new(51.509, -0.1278),
//!     GpsPoint::new(51.500, -0.1278),
//! ];
//!
//! let length = geo_utils::polyline_length(&out_and_back);
//! assert!((length - 2000.0).abs() < 10.0);
//!
//! let bounds = geo_utils::compute_bounds(&out_and_back);
//! assert_eq!(bounds.max_lat, 51.509);
//! ```

use geo::{Distance, Haversine, Point};

use crate::trackpoint::Trackpoint;
use crate::{Bounds, GpsPoint};

// =============================================================================
// Distance
// =============================================================================

/// Great-circle distance in meters between two fixes.
///
/// # Example
///
/// ```rust
/// use run_analyzer::{GpsPoint, geo_utils};
///
/// // Two fixes 0.009 degrees of latitude apart are ~1 km
/// let start = GpsPoint::new(51.500, -0.1278);
/// let turn = GpsPoint::new(51.509, -0.1278);
/// assert!((geo_utils::haversine_distance(&start, &turn) - 1000.0).abs() < 5.0);
/// ```
#[inline]
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    Haversine::distance(Point::new(a.longitude, a.latitude), Point::new(b.longitude, b.latitude))
}

/// Distance along the fixes in order; 0 for fewer than two.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .iter()
        .zip(points.iter().skip(1))
        .map(|(a, b)| haversine_distance(a, b))
        .sum()
}

/// Fixes of the trackpoints that have one, dropping out-of-range coordinates.
pub fn track_positions(trackpoints: &[Trackpoint]) -> Vec<GpsPoint> {
    trackpoints
        .iter()
        .filter_map(|tp| tp.position)
        .filter(GpsPoint::is_valid)
        .collect()
}

// =============================================================================
// Extent
// =============================================================================

/// Smallest box holding every fix.
///
/// Empty input gives an inverted box; [`Bounds::from_points`] returns `None`
/// for that case instead.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let inverted = Bounds {
        min_lat: f64::MAX,
        max_lat: f64::MIN,
        min_lng: f64::MAX,
        max_lng: f64::MIN,
    };
    points.iter().fold(inverted, |b, p| Bounds {
        min_lat: b.min_lat.min(p.latitude),
        max_lat: b.max_lat.max(p.latitude),
        min_lng: b.min_lng.min(p.longitude),
        max_lng: b.max_lng.max(p.longitude),
    })
}

/// Mean of the fixes, or (0, 0) for none. Plain averaging is accurate enough
/// over the extent of one run.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }
    let (lat, lng) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.latitude, lng + p.longitude));
    let n = points.len() as f64;
    GpsPoint::new(lat / n, lng / n)
}

// =============================================================================
// Unit Tests
// =============================================================================
