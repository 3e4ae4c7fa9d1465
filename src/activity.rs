//! # Activity Parsing
//!
//! Walks a TCX document tree and builds an [`Activity`]:
//!
//! ```text
//! TrainingCenterDatabase
//! ├── Author                       (optional)
//! └── Activities
//!     └── Activity  ($.Sport, Id, Creator)
//!         └── Lap   (one object or an array)
//!             └── Track (one object or an array)
//!                 └── Trackpoint (one object or an array)
//! ```
//!
//! The tree is the JSON produced by an xml2js-style converter: attributes sit
//! under `"$"`, element text under `"_"` when the element also has attributes,
//! and repeated elements become arrays while single ones stay objects.
//! [`parse_activity_xml`] builds that tree from raw TCX text with
//! [`crate::xml::xml_to_tree`].
//!
//! Missing structural containers are a hard [`AnalyzerError::MalformedActivity`];
//! everything else (metadata, individual trackpoint fields) is best effort.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalyzerError, Result};
use crate::xml::xml_to_tree;
use crate::trackpoint::{lenient_node, lenient_string, strip_namespaces, RawTrackpoint, Trackpoint, INVALID_EPOCH_MS};

/// Software that wrote the export (`TrainingCenterDatabase.Author`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Author {
    pub name: String,
    pub part_number: String,
    pub lang: String,
    pub build_major: String,
    pub build_minor: String,
    pub version_major: String,
    pub version_minor: String,
}

/// Device that recorded the activity (`Activity.Creator`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Creator {
    pub name: String,
    pub product_id: String,
    pub unit_id: String,
    pub build_major: String,
    pub build_minor: String,
    pub version_major: String,
    pub version_minor: String,
}

/// Non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ParseWarning {
    /// The trackpoint was kept with `epoch_ms` = [`INVALID_EPOCH_MS`].
    UnparseableTimestamp { sequence: u32, raw: String },
    /// The trackpoint node was not an element; an empty sample was derived.
    UnreadableTrackpoint { sequence: u32 },
}

/// One complete recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Activity {
    pub activity_id: String,
    pub sport: String,
    pub author: Author,
    pub creator: Creator,
    /// Trackpoints of all laps in document order, `sequence` 1..=N
    pub trackpoints: Vec<Trackpoint>,
    /// Epoch of the first trackpoint (0 when there are none)
    pub starting_epoch_ms: i64,
    pub warnings: Vec<ParseWarning>,
}

impl Activity {
    pub fn first_trackpoint(&self) -> Option<&Trackpoint> {
        self.trackpoints.first()
    }

    pub fn last_trackpoint(&self) -> Option<&Trackpoint> {
        self.trackpoints.last()
    }

    /// Derive and append one raw sample, chaining from the last added trackpoint.
    fn push_raw(&mut self, node: &Value) {
        let sequence = self.trackpoints.len() as u32 + 1;
        let raw = match RawTrackpoint::from_value(node) {
            Some(raw) => raw,
            None => {
                warn!("Trackpoint {}: not an element, deriving an empty sample", sequence);
                self.warnings.push(ParseWarning::UnreadableTrackpoint { sequence });
                RawTrackpoint::default()
            }
        };

        let trackpoint = Trackpoint::derive(&raw, sequence, self.trackpoints.last());
        if trackpoint.epoch_ms == INVALID_EPOCH_MS {
            self.warnings.push(ParseWarning::UnparseableTimestamp {
                sequence,
                raw: trackpoint.timestamp.clone(),
            });
        }
        self.trackpoints.push(trackpoint);
    }

    /// Post-processing pass over the complete sequence.
    fn enrich_trackpoints(&mut self) {
        self.starting_epoch_ms = self.trackpoints.first().map_or(0, |tp| tp.epoch_ms);
        let start = self.starting_epoch_ms;
        for trackpoint in &mut self.trackpoints {
            trackpoint.enrich(start);
        }
    }
}

// =============================================================================
// Metadata Records
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawVersion {
    #[serde(rename = "VersionMajor", default, deserialize_with = "lenient_string")]
    version_major: Option<String>,
    #[serde(rename = "VersionMinor", default, deserialize_with = "lenient_string")]
    version_minor: Option<String>,
    #[serde(rename = "BuildMajor", default, deserialize_with = "lenient_string")]
    build_major: Option<String>,
    #[serde(rename = "BuildMinor", default, deserialize_with = "lenient_string")]
    build_minor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBuild {
    #[serde(rename = "Version", default, deserialize_with = "lenient_node")]
    version: Option<RawVersion>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuthor {
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(rename = "LangID", default, deserialize_with = "lenient_string")]
    lang: Option<String>,
    #[serde(rename = "PartNumber", default, deserialize_with = "lenient_string")]
    part_number: Option<String>,
    #[serde(rename = "Build", default, deserialize_with = "lenient_node")]
    build: Option<RawBuild>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCreator {
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(rename = "UnitId", default, deserialize_with = "lenient_string")]
    unit_id: Option<String>,
    #[serde(rename = "ProductID", default, deserialize_with = "lenient_string")]
    product_id: Option<String>,
    #[serde(rename = "Version", default, deserialize_with = "lenient_node")]
    version: Option<RawVersion>,
}

impl From<RawAuthor> for Author {
    fn from(raw: RawAuthor) -> Self {
        let version = raw.build.and_then(|b| b.version).unwrap_or_default();
        Self {
            name: raw.name.unwrap_or_default(),
            part_number: raw.part_number.unwrap_or_default(),
            lang: raw.lang.unwrap_or_default(),
            build_major: version.build_major.unwrap_or_default(),
            build_minor: version.build_minor.unwrap_or_default(),
            version_major: version.version_major.unwrap_or_default(),
            version_minor: version.version_minor.unwrap_or_default(),
        }
    }
}

impl From<RawCreator> for Creator {
    fn from(raw: RawCreator) -> Self {
        let version = raw.version.unwrap_or_default();
        Self {
            name: raw.name.unwrap_or_default(),
            product_id: raw.product_id.unwrap_or_default(),
            unit_id: raw.unit_id.unwrap_or_default(),
            build_major: version.build_major.unwrap_or_default(),
            build_minor: version.build_minor.unwrap_or_default(),
            version_major: version.version_major.unwrap_or_default(),
            version_minor: version.version_minor.unwrap_or_default(),
        }
    }
}

/// Deserialize an optional metadata record, falling back to defaults.
fn metadata<R, T>(node: Option<&Value>, what: &str) -> T
where
    R: serde::de::DeserializeOwned + Into<T>,
    T: Default,
{
    let Some(node) = node.filter(|n| !n.is_null()) else {
        return T::default();
    };
    match serde_json::from_value::<R>(strip_namespaces(node)) {
        Ok(raw) => raw.into(),
        Err(e) => {
            warn!("Ignoring unreadable {} metadata: {}", what, e);
            T::default()
        }
    }
}

// =============================================================================
// Tree Navigation
// =============================================================================

fn child<'a>(node: &'a Value, name: &str) -> Result<&'a Value> {
    node.get(name)
        .filter(|v| v.is_object() || v.is_array())
        .ok_or_else(|| AnalyzerError::MalformedActivity(format!("missing <{}> element", name)))
}

/// Like [`child`], but an empty element (`<Track/>`, read as `""`) has no children.
fn children_or_empty<'a>(node: &'a Value, name: &str) -> Result<Vec<&'a Value>> {
    match node.get(name) {
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Vec::new()),
        _ => Ok(one_or_many(child(node, name)?)),
    }
}

/// A single element or an array of them, in document order.
fn one_or_many(node: &Value) -> Vec<&Value> {
    match node {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn text_of(node: Option<&Value>) -> String {
    match node {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) => map
            .get("_")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a TCX document tree into an [`Activity`].
///
/// Fails only when the TrainingCenterDatabase, Activities, Activity, Lap or
/// Track containers are missing. When the document holds several activities,
/// the first one is parsed.
///
/// # Example
/// ```
/// use run_analyzer::parse_activity;
/// use serde_json::json;
///
/// let doc = json!({ "TrainingCenterDatabase": { "Activities": {} } });
/// assert!(parse_activity(&doc).is_err());
/// ```
pub fn parse_activity(document: &Value) -> Result<Activity> {
    let database = child(document, "TrainingCenterDatabase")?;
    let activities = child(database, "Activities")?;
    let activity_node = one_or_many(child(activities, "Activity")?)
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::MalformedActivity("empty <Activity> list".to_string()))?;
    if activity_node.is_array() {
        return Err(AnalyzerError::MalformedActivity("nested <Activity> list".to_string()));
    }

    let mut activity = Activity {
        activity_id: text_of(activity_node.get("Id")),
        sport: activity_node
            .get("$")
            .and_then(|attrs| attrs.get("Sport"))
            .map(|sport| text_of(Some(sport)))
            .unwrap_or_default(),
        author: metadata::<RawAuthor, Author>(database.get("Author"), "author"),
        creator: metadata::<RawCreator, Creator>(activity_node.get("Creator"), "creator"),
        ..Activity::default()
    };

    let laps = one_or_many(child(activity_node, "Lap")?);
    debug!("Activity {}: {} lap element(s)", activity.activity_id, laps.len());

    for lap in laps {
        for track in children_or_empty(lap, "Track")? {
            // An empty <Track/> has no Trackpoint child
            let Some(points) = track.get("Trackpoint").filter(|p| !p.is_null()) else {
                continue;
            };
            for node in one_or_many(points) {
                activity.push_raw(node);
            }
        }
    }

    activity.enrich_trackpoints();

    info!(
        "Parsed activity {} ({}): {} trackpoints, {} warnings",
        activity.activity_id,
        activity.sport,
        activity.trackpoints.len(),
        activity.warnings.len()
    );

    Ok(activity)
}

/// Parse a TCX document tree given as JSON text.
pub fn parse_activity_str(document_json: &str) -> Result<Activity> {
    let document: Value = serde_json::from_str(document_json)?;
    parse_activity(&document)
}

/// Parse raw TCX (XML) text, as written by a device or exported by a
/// training platform.
///
/// # Example
/// ```
/// use run_analyzer::parse_activity_xml;
///
/// let tcx = r#"<TrainingCenterDatabase>
///   <Activities>
///     <Activity Sport="Running">
///       <Id>2024-05-01T07:00:00Z</Id>
///       <Lap StartTime="2024-05-01T07:00:00Z">
///         <Track>
///           <Trackpoint><Time>2024-05-01T07:00:00Z</Time><DistanceMeters>0</DistanceMeters></Trackpoint>
///           <Trackpoint><Time>2024-05-01T07:01:00Z</Time><DistanceMeters>200</DistanceMeters></Trackpoint>
///         </Track>
///       </Lap>
///     </Activity>
///   </Activities>
/// </TrainingCenterDatabase>"#;
///
/// let activity = parse_activity_xml(tcx).unwrap();
/// assert_eq!(activity.sport, "Running");
/// assert_eq!(activity.trackpoints.len(), 2);
/// ```
pub fn parse_activity_xml(tcx: &str) -> Result<Activity> {
    let document = xml_to_tree(tcx)?;
    parse_activity(&document)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trackpoint(time: &str, meters: f64) -> Value {
        json!({
            "Time": time,
            "Position": { "LatitudeDegrees": "51.5", "LongitudeDegrees": "-0.12" },
            "DistanceMeters": meters.to_string(),
            "HeartRateBpm": { "Value": "150" }
        })
    }

    fn document(laps: Value) -> Value {
        json!({
            "TrainingCenterDatabase": {
                "$": { "xmlns": "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2" },
                "Activities": {
                    "Activity": {
                        "$": { "Sport": "Running" },
                        "Id": "2024-05-01T07:00:00.000Z",
                        "Lap": laps,
                        "Creator": {
                            "$": { "xsi:type": "Device_t" },
                            "Name": "Forerunner 255",
                            "UnitId": "3412345678",
                            "ProductID": "3992",
                            "Version": {
                                "VersionMajor": "19", "VersionMinor": "18",
                                "BuildMajor": "0", "BuildMinor": "0"
                            }
                        }
                    }
                },
                "Author": {
                    "$": { "xsi:type": "Application_t" },
                    "Name": "Connect Api",
                    "Build": { "Version": { "VersionMajor": "0", "VersionMinor": "0", "BuildMajor": "0", "BuildMinor": "0" } },
                    "LangID": "en",
                    "PartNumber": "006-D2449-00"
                }
            }
        })
    }

    #[test]
    fn test_parse_single_lap() {
        let doc = document(json!({
            "$": { "StartTime": "2024-05-01T07:00:00.000Z" },
            "Track": { "Trackpoint": [
                trackpoint("2024-05-01T07:00:00.000Z", 0.0),
                trackpoint("2024-05-01T07:00:05.000Z", 15.0),
                trackpoint("2024-05-01T07:00:10.000Z", 30.0),
            ]}
        }));

        let activity = parse_activity(&doc).unwrap();
        assert_eq!(activity.activity_id, "2024-05-01T07:00:00.000Z");
        assert_eq!(activity.sport, "Running");
        assert_eq!(activity.trackpoints.len(), 3);
        assert_eq!(activity.starting_epoch_ms, activity.trackpoints[0].epoch_ms);
        assert!(activity.warnings.is_empty());

        let last = activity.last_trackpoint().unwrap();
        assert_eq!(last.elapsed_hhmmss.as_deref(), Some("00:00:10"));
        assert!((last.speed.unwrap() - 3.0).abs() < 1e-9);
        assert!(last.location.is_some());
    }

    #[test]
    fn test_parse_multiple_laps_flatten_in_order() {
        let doc = document(json!([
            { "Track": { "Trackpoint": [
                trackpoint("2024-05-01T07:00:00Z", 0.0),
                trackpoint("2024-05-01T07:00:05Z", 15.0),
            ]}},
            { "Track": { "Trackpoint": trackpoint("2024-05-01T07:00:10Z", 30.0) }},
            { "Track": [
                { "Trackpoint": [trackpoint("2024-05-01T07:00:15Z", 45.0)] },
                { "Trackpoint": [trackpoint("2024-05-01T07:00:20Z", 60.0)] },
            ]},
        ]));

        let activity = parse_activity(&doc).unwrap();
        let sequences: Vec<u32> = activity.trackpoints.iter().map(|tp| tp.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

        let distances: Vec<f64> = activity.trackpoints.iter().map(|tp| tp.distance_meters).collect();
        assert_eq!(distances, vec![0.0, 15.0, 30.0, 45.0, 60.0]);

        // Speed fallback chains across lap boundaries
        assert!((activity.trackpoints[2].speed.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_metadata() {
        let doc = document(json!({ "Track": { "Trackpoint": [trackpoint("2024-05-01T07:00:00Z", 0.0)] } }));
        let activity = parse_activity(&doc).unwrap();

        assert_eq!(activity.creator.name, "Forerunner 255");
        assert_eq!(activity.creator.unit_id, "3412345678");
        assert_eq!(activity.creator.product_id, "3992");
        assert_eq!(activity.creator.version_major, "19");
        assert_eq!(activity.author.name, "Connect Api");
        assert_eq!(activity.author.lang, "en");
        assert_eq!(activity.author.part_number, "006-D2449-00");
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let doc = json!({
            "TrainingCenterDatabase": { "Activities": { "Activity": {
                "Lap": { "Track": { "Trackpoint": [trackpoint("2024-05-01T07:00:00Z", 0.0)] } }
            }}}
        });
        let activity = parse_activity(&doc).unwrap();
        assert_eq!(activity.sport, "");
        assert_eq!(activity.activity_id, "");
        assert_eq!(activity.author, Author::default());
        assert_eq!(activity.creator, Creator::default());
    }

    #[test]
    fn test_unreadable_metadata_keeps_readable_fields() {
        let doc = json!({
            "TrainingCenterDatabase": {
                "Author": {
                    "Name": "Connect Api",
                    "Build": { "Version": "broken" },
                    "LangID": "en"
                },
                "Activities": { "Activity": {
                    "Creator": { "Name": "Watch", "UnitId": "123", "Version": "broken" },
                    "Lap": { "Track": { "Trackpoint": [trackpoint("2024-05-01T07:00:00Z", 0.0)] } }
                }}
            }
        });
        let activity = parse_activity(&doc).unwrap();

        assert_eq!(activity.creator.name, "Watch");
        assert_eq!(activity.creator.unit_id, "123");
        assert_eq!(activity.creator.version_major, "");
        assert_eq!(activity.author.name, "Connect Api");
        assert_eq!(activity.author.lang, "en");
        assert_eq!(activity.author.build_major, "");
    }

    #[test]
    fn test_metadata_that_is_not_an_element_is_ignored() {
        let doc = json!({
            "TrainingCenterDatabase": {
                "Author": "",
                "Activities": { "Activity": {
                    "Creator": 42,
                    "Lap": { "Track": { "Trackpoint": [trackpoint("2024-05-01T07:00:00Z", 0.0)] } }
                }}
            }
        });
        let activity = parse_activity(&doc).unwrap();
        assert_eq!(activity.author, Author::default());
        assert_eq!(activity.creator, Creator::default());
    }

    #[test]
    fn test_missing_containers_are_malformed() {
        let cases = vec![
            json!({}),
            json!({ "TrainingCenterDatabase": {} }),
            json!({ "TrainingCenterDatabase": { "Activities": {} } }),
            json!({ "TrainingCenterDatabase": { "Activities": { "Activity": {} } } }),
            json!({ "TrainingCenterDatabase": { "Activities": { "Activity": { "Lap": {} } } } }),
            json!({ "TrainingCenterDatabase": { "Activities": { "Activity": { "Lap": "" } } } }),
        ];
        for doc in cases {
            let err = parse_activity(&doc).unwrap_err();
            assert!(matches!(err, AnalyzerError::MalformedActivity(_)), "{doc}");
        }
    }

    #[test]
    fn test_invalid_json_text() {
        let err = parse_activity_str("<TrainingCenterDatabase/>").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidDocument(_)));
    }

    #[test]
    fn test_empty_track_yields_no_trackpoints() {
        let doc = document(json!({ "Track": {} }));
        let activity = parse_activity(&doc).unwrap();
        assert!(activity.trackpoints.is_empty());
        assert_eq!(activity.starting_epoch_ms, 0);
        assert!(activity.first_trackpoint().is_none());
    }

    #[test]
    fn test_bad_timestamp_is_kept_with_warning() {
        let doc = document(json!({ "Track": { "Trackpoint": [
            trackpoint("2024-05-01T07:00:00Z", 0.0),
            json!({ "Time": "", "DistanceMeters": "10" }),
            json!({ "DistanceMeters": "20" }),
            "stray text",
        ]}}));

        let activity = parse_activity(&doc).unwrap();
        assert_eq!(activity.trackpoints.len(), 4);
        assert_eq!(activity.trackpoints[1].epoch_ms, INVALID_EPOCH_MS);
        assert_eq!(activity.trackpoints[2].epoch_ms, 0);
        assert_eq!(activity.trackpoints[3].sequence, 4);
        assert_eq!(
            activity.warnings,
            vec![
                ParseWarning::UnparseableTimestamp { sequence: 2, raw: String::new() },
                ParseWarning::UnreadableTrackpoint { sequence: 4 },
            ]
        );
    }

    const TCX_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase
  xsi:schemaLocation="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd"
  xmlns:ns3="http://www.garmin.com/xmlschemas/ActivityExtension/v2"
  xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2"
  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#;

    fn tcx_trackpoint(time: &str, meters: u32, speed: &str) -> String {
        format!(
            "<Trackpoint>\
               <Time>{time}</Time>\
               <Position><LatitudeDegrees>51.5</LatitudeDegrees><LongitudeDegrees>-0.12</LongitudeDegrees></Position>\
               <AltitudeMeters>12.0</AltitudeMeters>\
               <DistanceMeters>{meters}.0</DistanceMeters>\
               <HeartRateBpm><Value>150</Value></HeartRateBpm>\
               <Extensions><ns3:TPX><ns3:Speed>{speed}</ns3:Speed><ns3:RunCadence>88</ns3:RunCadence></ns3:TPX></Extensions>\
             </Trackpoint>"
        )
    }

    fn tcx(laps: &str) -> String {
        format!(
            r#"{TCX_HEADER}
  <Activities>
    <Activity Sport="Running">
      <Id>2024-05-01T07:00:00.000Z</Id>
      {laps}
      <Creator xsi:type="Device_t">
        <Name>Forerunner 255</Name>
        <UnitId>3412345678</UnitId>
        <ProductID>3992</ProductID>
        <Version><VersionMajor>19</VersionMajor><VersionMinor>18</VersionMinor><BuildMajor>0</BuildMajor><BuildMinor>0</BuildMinor></Version>
      </Creator>
    </Activity>
  </Activities>
  <Author xsi:type="Application_t">
    <Name>Connect Api</Name>
    <Build><Version><VersionMajor>0</VersionMajor><VersionMinor>0</VersionMinor></Version></Build>
    <LangID>en</LangID>
    <PartNumber>006-D2449-00</PartNumber>
  </Author>
</TrainingCenterDatabase>"#
        )
    }

    #[test]
    fn test_parse_tcx_single_lap() {
        let text = tcx(&format!(
            r#"<Lap StartTime="2024-05-01T07:00:00.000Z">
                 <TotalTimeSeconds>10.0</TotalTimeSeconds>
                 <Track>{}{}{}</Track>
               </Lap>"#,
            tcx_trackpoint("2024-05-01T07:00:00.000Z", 0, "0.0"),
            tcx_trackpoint("2024-05-01T07:00:05.000Z", 15, "3.5"),
            tcx_trackpoint("2024-05-01T07:00:10.000Z", 30, "2.9"),
        ));

        let activity = parse_activity_xml(&text).unwrap();
        assert_eq!(activity.activity_id, "2024-05-01T07:00:00.000Z");
        assert_eq!(activity.sport, "Running");
        assert_eq!(activity.trackpoints.len(), 3);
        assert!(activity.warnings.is_empty());

        assert_eq!(activity.creator.name, "Forerunner 255");
        assert_eq!(activity.creator.product_id, "3992");
        assert_eq!(activity.creator.version_minor, "18");
        assert_eq!(activity.author.name, "Connect Api");
        assert_eq!(activity.author.part_number, "006-D2449-00");

        let second = &activity.trackpoints[1];
        assert_eq!(second.speed, Some(3.5));
        assert_eq!(second.cadence, Some(88.0));
        assert_eq!(second.heart_rate_bpm, Some(150.0));
        assert_eq!(second.altitude_meters, Some(12.0));
        assert_eq!(second.latitude(), 51.5);
        assert_eq!(second.distance_meters, 15.0);

        // TPX speed of 0 falls back to the derived speed (no previous: none)
        assert_eq!(activity.trackpoints[0].speed, None);
        assert_eq!(
            activity.last_trackpoint().unwrap().elapsed_hhmmss.as_deref(),
            Some("00:00:10")
        );
    }

    #[test]
    fn test_parse_tcx_multiple_laps() {
        let text = tcx(&format!(
            r#"<Lap StartTime="2024-05-01T07:00:00Z"><Track>{}{}</Track></Lap>
               <Lap StartTime="2024-05-01T07:00:10Z"><Track>{}</Track><Track/></Lap>
               <Lap StartTime="2024-05-01T07:00:15Z"><Track>{}</Track><Track>{}</Track></Lap>"#,
            tcx_trackpoint("2024-05-01T07:00:00Z", 0, "3.0"),
            tcx_trackpoint("2024-05-01T07:00:05Z", 15, "3.0"),
            tcx_trackpoint("2024-05-01T07:00:10Z", 30, "3.0"),
            tcx_trackpoint("2024-05-01T07:00:15Z", 45, "3.0"),
            tcx_trackpoint("2024-05-01T07:00:20Z", 60, "3.0"),
        ));

        let activity = parse_activity_xml(&text).unwrap();
        let sequences: Vec<u32> = activity.trackpoints.iter().map(|tp| tp.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

        let distances: Vec<f64> = activity.trackpoints.iter().map(|tp| tp.distance_meters).collect();
        assert_eq!(distances, vec![0.0, 15.0, 30.0, 45.0, 60.0]);
        assert_eq!(activity.trackpoints[4].elapsed_seconds, Some(20));
    }

    #[test]
    fn test_parse_tcx_errors() {
        let err = parse_activity_xml("<TrainingCenterDatabase><Activities>").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidXml(_)));

        let err = parse_activity_xml(&format!("{TCX_HEADER}</TrainingCenterDatabase>")).unwrap_err();
        assert!(matches!(err, AnalyzerError::MalformedActivity(_)));

        let err = parse_activity_xml(&tcx("<Lap/>")).unwrap_err();
        assert!(matches!(err, AnalyzerError::MalformedActivity(_)));
    }

    #[test]
    fn test_empty_track_element_is_skipped() {
        let doc = document(json!({ "Track": "" }));
        let activity = parse_activity(&doc).unwrap();
        assert!(activity.trackpoints.is_empty());
    }

    #[test]
    fn test_parse_from_text() {
        let doc = document(json!({ "Track": { "Trackpoint": [trackpoint("2024-05-01T07:00:00Z", 0.0)] } }));
        let activity = parse_activity_str(&doc.to_string()).unwrap();
        assert_eq!(activity.trackpoints.len(), 1);
        assert_eq!(activity.trackpoints[0].elapsed_seconds, Some(0));
    }
}
