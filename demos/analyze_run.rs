//! Analyze a synthetic interval session: laps, summary and best interval match.
//!
//! Run with: cargo run --example analyze_run

use chrono::{DateTime, Duration, SecondsFormat};
use run_analyzer::{
    find_best_match, format_duration, pace_trends, parse_activity, segment_laps,
    ActivitySummary, IntervalSpec,
};
use serde_json::{json, Value};

/// 10 min warm-up jog, then 4 x (2 min fast / 1 min easy), one sample every 5 s.
fn session() -> Value {
    let start = DateTime::parse_from_rfc3339("2024-05-01T07:00:00Z").expect("valid start time");
    let mut meters = 0.0;

    let trackpoints: Vec<Value> = (0..=1320)
        .step_by(5)
        .map(|t: i64| {
            let in_block = t >= 600 && (t - 600) % 180 < 120 && t < 600 + 4 * 180;
            let speed = if in_block { 4.5 } else { 2.8 };
            if t > 0 {
                meters += speed * 5.0;
            }
            let time = (start + Duration::seconds(t)).to_rfc3339_opts(SecondsFormat::Secs, true);
            json!({
                "Time": time,
                "Position": {
                    "LatitudeDegrees": format!("{:.6}", 51.5 + meters / 111_195.0),
                    "LongitudeDegrees": "-0.127800"
                },
                "DistanceMeters": format!("{:.1}", meters),
                "HeartRateBpm": { "Value": format!("{}", if in_block { 172 } else { 138 }) },
                "Extensions": { "ns3:TPX": { "ns3:Speed": format!("{}", speed) } }
            })
        })
        .collect();

    json!({
        "TrainingCenterDatabase": {
            "Activities": {
                "Activity": {
                    "$": { "Sport": "Running" },
                    "Id": "2024-05-01T07:00:00Z",
                    "Lap": { "Track": { "Trackpoint": trackpoints } }
                }
            }
        }
    })
}

fn main() {
    let activity = parse_activity(&session()).expect("well-formed session");

    let summary = ActivitySummary::from_activity(&activity);
    println!("Run Analysis\n");
    println!("Activity {} ({})", summary.activity_id, summary.sport);
    println!("  {:.2} km in {} ({} /km avg)",
        summary.total_distance_km,
        summary.elapsed_hhmmss.as_deref().unwrap_or("--"),
        summary.avg_pace);
    println!("  HR avg {:.0} / max {:.0} bpm", summary.avg_heart_rate_bpm, summary.max_heart_rate_bpm);
    println!("  GPS distance {:.0} m over {} trackpoints\n", summary.gps_distance_meters, summary.trackpoint_count);

    println!("Laps:");
    for lap in segment_laps(&activity.trackpoints) {
        println!("  #{:<2} {:.2} km  {:>5.0} s  {} /km  HR {:.0}",
            lap.sequence + 1, lap.distance_km, lap.total_time, lap.avg_pace, lap.avg_heart_rate_bpm);
    }

    let specs = [IntervalSpec {
        time_span_s: 120,
        recovery_span_s: 60,
        repeat_count: 4,
        recovery_at_start_s: None,
    }];
    println!("\nWorkout: {} x {} fast / {} easy",
        specs[0].repeat_count,
        format_duration(specs[0].time_span_s),
        format_duration(specs[0].recovery_span_s));

    match find_best_match(&activity.trackpoints, &specs, 0) {
        Some(chain) => {
            let trends = pace_trends(&chain);
            for (interval, trend) in chain.iter().zip(trends) {
                println!("  {}. {} -> {}  {:.0} m  {} /km  HR {:.0}  {:?}",
                    interval.position + 1,
                    interval.first_trackpoint.elapsed_hhmmss.as_deref().unwrap_or("--"),
                    interval.last_trackpoint.elapsed_hhmmss.as_deref().unwrap_or("--"),
                    interval.distance_covered,
                    interval.avg_pace,
                    interval.avg_heart_rate,
                    trend);
            }
        }
        None => println!("  No intervals found"),
    }
}
