//! # Trackpoint Derivation
//!
//! Turns one raw TCX sample into a [`Trackpoint`] in two phases:
//!
//! 1. [`Trackpoint::derive`] reads the whitelisted raw fields, parses the
//!    timestamp and fills in a missing speed from the previous trackpoint.
//! 2. [`Trackpoint::enrich`] adds unit conversions, elapsed time and the
//!    GeoJSON location once the activity's starting epoch is known.
//!
//! Raw samples come from an xml2js-style document tree where every leaf is
//! usually a string (`"AltitudeMeters": "12.4"`). [`RawTrackpoint`] absorbs
//! that looseness once, at the boundary: numeric leaves accept strings or
//! numbers, nested elements that fail to deserialize become `None`, and
//! namespace prefixes (`ns3:TPX`) are dropped from element names.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{GeoJsonLocation, GpsPoint};

/// Timestamp used when a sample carries no time element.
pub const DEFAULT_EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00.000Z";

/// Epoch value of a trackpoint whose timestamp could not be parsed.
pub const INVALID_EPOCH_MS: i64 = -1;

pub const FEET_PER_METER: f64 = 3.280839895013123;
pub const MILES_PER_KILOMETER: f64 = 0.621371192237334;
pub const YARDS_PER_MILE: f64 = 1760.0;

const MILLISECONDS_PER_SECOND: f64 = 1000.0;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_MINUTE: u64 = 60;

// =============================================================================
// Raw Sample
// =============================================================================

/// One `<Trackpoint>` element as found in the document tree.
///
/// Only these fields are read; anything else in the element is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTrackpoint {
    #[serde(rename = "Time", default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(rename = "Position", default, deserialize_with = "lenient_node")]
    pub position: Option<RawPosition>,
    #[serde(rename = "AltitudeMeters", default, deserialize_with = "lenient_f64")]
    pub altitude_meters: Option<f64>,
    #[serde(rename = "DistanceMeters", default, deserialize_with = "lenient_f64")]
    pub distance_meters: Option<f64>,
    #[serde(rename = "HeartRateBpm", default, deserialize_with = "lenient_node")]
    pub heart_rate_bpm: Option<RawHeartRate>,
    #[serde(rename = "Cadence", default, deserialize_with = "lenient_f64")]
    pub cadence: Option<f64>,
    #[serde(rename = "Extensions", default, deserialize_with = "lenient_node")]
    pub extensions: Option<RawExtensions>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPosition {
    #[serde(rename = "LatitudeDegrees", default, deserialize_with = "lenient_f64")]
    pub latitude_degrees: Option<f64>,
    #[serde(rename = "LongitudeDegrees", default, deserialize_with = "lenient_f64")]
    pub longitude_degrees: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawHeartRate {
    #[serde(rename = "Value", default, deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawExtensions {
    #[serde(rename = "TPX", default, deserialize_with = "lenient_node")]
    pub tpx: Option<RawTpx>,
}

/// Garmin `TPX` trackpoint extension.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTpx {
    #[serde(rename = "Speed", default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(rename = "RunCadence", default, deserialize_with = "lenient_f64")]
    pub run_cadence: Option<f64>,
    #[serde(rename = "Watts", default, deserialize_with = "lenient_f64")]
    pub watts: Option<f64>,
}

impl RawTrackpoint {
    /// Deserialize a trackpoint element from the document tree.
    ///
    /// Returns `None` only when the node is not an element at all (e.g. a bare
    /// string); field-level problems never fail the whole sample.
    pub fn from_value(node: &Value) -> Option<Self> {
        serde_json::from_value(strip_namespaces(node)).ok()
    }

    fn tpx(&self) -> Option<&RawTpx> {
        self.extensions.as_ref().and_then(|ext| ext.tpx.as_ref())
    }
}

/// Drop `prefix:` from element names so `ns3:TPX` reads as `TPX`.
pub(crate) fn strip_namespaces(node: &Value) -> Value {
    match node {
        Value::Object(map) => {
            let stripped: Map<String, Value> = map
                .iter()
                .map(|(key, value)| {
                    let local = key.rsplit_once(':').map_or(key.as_str(), |(_, local)| local);
                    (local.to_string(), strip_namespaces(value))
                })
                .collect();
            Value::Object(stripped)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_namespaces).collect()),
        other => other.clone(),
    }
}

// =============================================================================
// Lenient Field Deserializers
// =============================================================================

/// A leaf value: a number, a string, or an xml2js text node (`{"_": "..."}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Leaf {
    Number(serde_json::Number),
    Text(String),
    Node {
        #[serde(rename = "_")]
        text: String,
    },
    Other(IgnoredAny),
}

impl Leaf {
    fn into_f64(self) -> Option<f64> {
        let value = match self {
            Leaf::Number(n) => n.as_f64(),
            Leaf::Text(text) | Leaf::Node { text } => text.trim().parse::<f64>().ok(),
            Leaf::Other(_) => None,
        };
        value.filter(|v| v.is_finite())
    }

    fn into_string(self) -> Option<String> {
        match self {
            Leaf::Number(n) => Some(n.to_string()),
            Leaf::Text(text) | Leaf::Node { text } => Some(text),
            Leaf::Other(_) => None,
        }
    }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Leaf::deserialize(deserializer)?.into_f64())
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Leaf::deserialize(deserializer)?.into_string())
}

/// Deserialize a nested element, turning any shape mismatch into `None`.
pub(crate) fn lenient_node<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parse an ISO-8601 timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 (`2024-05-01T07:00:00.000Z`, `2024-05-01T09:00:00+02:00`),
/// naive date-times with a `T` or a space separator (`2024-05-01T07:00:00`,
/// `2024-05-01 07:00:00`) and bare dates (`2024-05-01`, read as midnight).
/// Forms without an offset are always read as UTC, never as the host's
/// local time, so results do not depend on where the analysis runs.
pub fn parse_epoch_ms(timestamp: &str) -> Option<i64> {
    let trimmed = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Elapsed time split into hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime {
    /// Whole elapsed seconds (rounded)
    pub total_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl ElapsedTime {
    /// Build from a millisecond delta; the sign is ignored.
    pub fn from_millis(elapsed_ms: i64) -> Self {
        let total_seconds = (elapsed_ms.unsigned_abs() as f64 / MILLISECONDS_PER_SECOND).round() as u64;
        let hours = total_seconds / SECONDS_PER_HOUR;
        let rem = total_seconds % SECONDS_PER_HOUR;
        Self {
            total_seconds,
            hours,
            minutes: rem / SECONDS_PER_MINUTE,
            seconds: rem % SECONDS_PER_MINUTE,
        }
    }

    pub fn as_hhmmss(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

// =============================================================================
// Derived Trackpoint
// =============================================================================

/// One recorded sample with its derived physics.
///
/// `sequence` is 1-based and dense within an activity. Fields in the second
/// group stay `None` until [`Trackpoint::enrich`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Trackpoint {
    pub sequence: u32,
    /// Raw timestamp string (or [`DEFAULT_EPOCH_TIMESTAMP`] when absent)
    pub timestamp: String,
    /// Epoch milliseconds; 0 for a missing time, [`INVALID_EPOCH_MS`] when unparseable
    pub epoch_ms: i64,
    pub position: Option<GpsPoint>,
    pub altitude_meters: Option<f64>,
    pub distance_meters: f64,
    pub heart_rate_bpm: Option<f64>,
    pub cadence: Option<f64>,
    pub watts: Option<f64>,
    /// Meters per second, from the TPX extension or derived from the previous trackpoint
    pub speed: Option<f64>,

    pub altitude_feet: Option<f64>,
    pub distance_km: Option<f64>,
    pub distance_miles: Option<f64>,
    pub distance_yards: Option<f64>,
    /// Seconds since the activity's first trackpoint
    pub elapsed_seconds: Option<u64>,
    pub elapsed_hhmmss: Option<String>,
    pub location: Option<GeoJsonLocation>,
}

impl Trackpoint {
    /// Derive a trackpoint from a raw sample.
    ///
    /// `previous` is the last trackpoint already added to the activity; it is
    /// only used to fill in speed when the sample has none (or reports 0).
    pub fn derive(raw: &RawTrackpoint, sequence: u32, previous: Option<&Trackpoint>) -> Self {
        let timestamp = raw
            .time
            .clone()
            .unwrap_or_else(|| DEFAULT_EPOCH_TIMESTAMP.to_string());

        let epoch_ms = match parse_epoch_ms(&timestamp) {
            Some(ms) => ms,
            None => {
                warn!("Trackpoint {}: unparseable timestamp {:?}", sequence, timestamp);
                INVALID_EPOCH_MS
            }
        };

        let position = raw.position.as_ref().and_then(|p| {
            match (p.latitude_degrees, p.longitude_degrees) {
                (Some(lat), Some(lng)) => Some(GpsPoint::new(lat, lng)),
                _ => None,
            }
        });

        let tpx = raw.tpx();

        let mut trackpoint = Self {
            sequence,
            timestamp,
            epoch_ms,
            position,
            altitude_meters: raw.altitude_meters,
            distance_meters: raw.distance_meters.unwrap_or(0.0),
            heart_rate_bpm: raw.heart_rate_bpm.as_ref().and_then(|hr| hr.value),
            cadence: tpx.and_then(|t| t.run_cadence).or(raw.cadence),
            watts: tpx.and_then(|t| t.watts),
            speed: tpx.and_then(|t| t.speed),
            ..Self::default()
        };

        if trackpoint.speed.map_or(true, |s| s == 0.0) {
            trackpoint.speed = previous.and_then(|prev| trackpoint.speed_since(prev));
        }

        trackpoint
    }

    /// Average speed between `previous` and this trackpoint.
    ///
    /// Requires valid epochs on both and a strictly positive time delta.
    pub fn speed_since(&self, previous: &Trackpoint) -> Option<f64> {
        if !self.has_valid_epoch() || !previous.has_valid_epoch() {
            return None;
        }
        let delta_seconds = (self.epoch_ms - previous.epoch_ms) as f64 / MILLISECONDS_PER_SECOND;
        if delta_seconds > 0.0 {
            Some((self.distance_meters - previous.distance_meters) / delta_seconds)
        } else {
            None
        }
    }

    /// Post-processing pass: unit conversions, elapsed time and location.
    pub fn enrich(&mut self, starting_epoch_ms: i64) {
        self.altitude_feet = self.altitude_meters.map(|m| m * FEET_PER_METER);

        let km = self.distance_meters / 1000.0;
        let miles = km * MILES_PER_KILOMETER;
        self.distance_km = Some(km);
        self.distance_miles = Some(miles);
        self.distance_yards = Some(miles * YARDS_PER_MILE);

        if self.has_valid_epoch() && starting_epoch_ms > 0 {
            let elapsed = ElapsedTime::from_millis(self.epoch_ms - starting_epoch_ms);
            self.elapsed_seconds = Some(elapsed.total_seconds);
            self.elapsed_hhmmss = Some(elapsed.as_hhmmss());
        } else {
            self.elapsed_seconds = None;
            self.elapsed_hhmmss = None;
        }

        self.location = self.position.map(GeoJsonLocation::from);
    }

    /// Whether `epoch_ms` came from a real timestamp.
    pub fn has_valid_epoch(&self) -> bool {
        self.epoch_ms > 0
    }

    pub fn latitude(&self) -> f64 {
        self.position.map_or(0.0, |p| p.latitude)
    }

    pub fn longitude(&self) -> f64 {
        self.position.map_or(0.0, |p| p.longitude)
    }
}

// =============================================================================
// Tests
// =============================================================================
