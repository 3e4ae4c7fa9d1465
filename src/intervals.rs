//! # Workout Interval Matching
//!
//! Finds the best occurrence of a structured workout (effort blocks separated
//! by recoveries, each block possibly repeated) inside a recorded run.
//!
//! ## Algorithm
//! 1. Expand the specs into one effort span and one preceding recovery per
//!    repetition.
//! 2. Build a candidate effort window at every start trackpoint, using the
//!    first effort span for all of them.
//! 3. From every candidate, chain forward: the next member is the earliest
//!    later candidate that starts at least the required recovery after the
//!    previous member ended. Incomplete chains are dropped.
//! 4. Keep the complete chain with the largest total distance. On ties the
//!    first chain found wins.
//!
//! Candidate windows start at increasing trackpoints, so on a time-ordered
//! stream their start epochs are sorted and the forward search is a binary
//! search. Streams with out-of-order timestamps fall back to a linear scan,
//! which selects the same candidate.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::pace::format_pace;
use crate::trackpoint::Trackpoint;

/// One block of a workout, as authored by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct IntervalSpec {
    /// Effort duration in seconds
    #[serde(default)]
    pub time_span_s: u32,
    /// Recovery before each repetition after the first, in seconds
    #[serde(default)]
    pub recovery_span_s: u32,
    /// Number of repetitions. 0 counts as 1.
    #[serde(default)]
    pub repeat_count: u32,
    /// Recovery before this block's first repetition, when it differs from
    /// `recovery_span_s`
    #[serde(default)]
    pub recovery_at_start_s: Option<u32>,
}

impl IntervalSpec {
    /// Effective repetition count.
    pub fn repetitions(&self) -> u32 {
        self.repeat_count.max(1)
    }
}

/// Specs flattened into one entry per repetition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedPlan {
    /// Effort span of each expanded position, in seconds
    pub time_spans: Vec<u32>,
    /// Recovery required before each expanded position, in seconds (0 for position 0)
    pub recovery_spans: Vec<u32>,
    /// Index of the spec each position came from
    pub spec_indices: Vec<usize>,
}

impl ExpandedPlan {
    /// Number of expanded positions (the length of a complete chain).
    pub fn len(&self) -> usize {
        self.time_spans.len()
    }

    /// True when there is nothing to match.
    pub fn is_empty(&self) -> bool {
        self.time_spans.is_empty()
    }
}

/// Flatten specs into per-repetition effort and recovery spans.
///
/// # Example
/// ```
/// use run_analyzer::{expand_specs, IntervalSpec};
///
/// let warmup = IntervalSpec { time_span_s: 300, ..IntervalSpec::default() };
/// let reps = IntervalSpec {
///     time_span_s: 60,
///     recovery_span_s: 90,
///     repeat_count: 3,
///     recovery_at_start_s: Some(120),
/// };
///
/// let plan = expand_specs(&[warmup, reps]);
/// assert_eq!(plan.time_spans, vec![300, 60, 60, 60]);
/// assert_eq!(plan.recovery_spans, vec![0, 120, 90, 90]);
/// ```
pub fn expand_specs(specs: &[IntervalSpec]) -> ExpandedPlan {
    let mut plan = ExpandedPlan::default();

    for (spec_index, spec) in specs.iter().enumerate() {
        for rep in 0..spec.repetitions() {
            let recovery = if plan.is_empty() {
                0
            } else if rep == 0 {
                spec.recovery_at_start_s.unwrap_or(spec.recovery_span_s)
            } else {
                spec.recovery_span_s
            };

            plan.time_spans.push(spec.time_span_s);
            plan.recovery_spans.push(recovery);
            plan.spec_indices.push(spec_index);
        }
    }

    plan
}

/// Safety limits for the interval search.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct IntervalSearchConfig {
    /// Maximum number of candidates tried as the first member of a chain.
    /// `None` tries every candidate.
    /// Default: None
    pub max_chain_starts: Option<u32>,
}

/// One matched effort within a workout chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CalculatedInterval {
    /// Spec of the first expanded position (shared by every member of a chain)
    pub spec: IntervalSpec,
    /// 0-based position within the chain
    pub position: u32,
    pub first_trackpoint_index: u32,
    pub last_trackpoint_index: u32,
    pub first_trackpoint: Trackpoint,
    pub last_trackpoint: Trackpoint,
    pub avg_heart_rate: f64,
    pub avg_speed: f64,
    pub avg_pace: String,
    pub max_heart_rate: f64,
    /// Meters, never negative
    pub distance_covered: f64,
}

/// Direction of pace change between consecutive intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum PaceTrend {
    First,
    Faster,
    Slower,
    Unchanged,
}

/// Compare each interval's average speed with the one before it.
pub fn pace_trends(intervals: &[CalculatedInterval]) -> Vec<PaceTrend> {
    intervals
        .iter()
        .enumerate()
        .map(|(i, interval)| {
            if i == 0 {
                return PaceTrend::First;
            }
            let previous = intervals[i - 1].avg_speed;
            if interval.avg_speed > previous {
                PaceTrend::Faster
            } else if interval.avg_speed < previous {
                PaceTrend::Slower
            } else {
                PaceTrend::Unchanged
            }
        })
        .collect()
}

// ============================================================================
// Candidates
// ============================================================================

/// Effort window starting at one trackpoint.
#[derive(Debug, Clone)]
struct Candidate {
    first: usize,
    last: usize,
    first_epoch_ms: i64,
    last_epoch_ms: i64,
    avg_speed: f64,
    avg_heart_rate: f64,
    max_heart_rate: f64,
    distance_covered: f64,
}

impl Candidate {
    fn at(trackpoints: &[Trackpoint], first: usize, span_ms: i64) -> Self {
        let epoch_start = trackpoints[first].epoch_ms;
        let last = trackpoints[first..]
            .iter()
            .position(|tp| tp.epoch_ms - epoch_start >= span_ms)
            .map(|offset| first + offset)
            .unwrap_or(trackpoints.len() - 1);

        let window = &trackpoints[first..=last];
        let count = window.len() as f64;
        let heart_rates = window.iter().map(|tp| tp.heart_rate_bpm.unwrap_or(0.0));

        Self {
            first,
            last,
            first_epoch_ms: epoch_start,
            last_epoch_ms: trackpoints[last].epoch_ms,
            avg_speed: window.iter().map(|tp| tp.speed.unwrap_or(0.0)).sum::<f64>() / count,
            avg_heart_rate: heart_rates.clone().sum::<f64>() / count,
            max_heart_rate: heart_rates.fold(0.0, f64::max),
            distance_covered: (trackpoints[last].distance_meters
                - trackpoints[first].distance_meters)
                .max(0.0),
        }
    }

    fn to_interval(&self, trackpoints: &[Trackpoint], spec: &IntervalSpec, position: usize) -> CalculatedInterval {
        CalculatedInterval {
            spec: spec.clone(),
            position: position as u32,
            first_trackpoint_index: self.first as u32,
            last_trackpoint_index: self.last as u32,
            first_trackpoint: trackpoints[self.first].clone(),
            last_trackpoint: trackpoints[self.last].clone(),
            avg_heart_rate: self.avg_heart_rate,
            avg_speed: self.avg_speed,
            avg_pace: format_pace(self.avg_speed),
            max_heart_rate: self.max_heart_rate,
            distance_covered: self.distance_covered,
        }
    }
}

#[cfg(feature = "parallel")]
fn build_candidates(trackpoints: &[Trackpoint], start_index: usize, span_ms: i64) -> Vec<Candidate> {
    use rayon::prelude::*;

    (start_index..trackpoints.len())
        .into_par_iter()
        .map(|i| Candidate::at(trackpoints, i, span_ms))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_candidates(trackpoints: &[Trackpoint], start_index: usize, span_ms: i64) -> Vec<Candidate> {
    (start_index..trackpoints.len())
        .map(|i| Candidate::at(trackpoints, i, span_ms))
        .collect()
}

// ============================================================================
// Chains
// ============================================================================

/// Candidate indices of a complete chain and their summed distance.
#[derive(Debug, Clone)]
struct Chain {
    members: Vec<usize>,
    total_distance: f64,
}

/// Earliest candidate after `current` starting at or after `min_epoch_ms`.
fn next_member(candidates: &[Candidate], current: usize, min_epoch_ms: i64, sorted: bool) -> Option<usize> {
    let rest = &candidates[current + 1..];
    let offset = if sorted {
        Some(rest.partition_point(|c| c.first_epoch_ms < min_epoch_ms)).filter(|&o| o < rest.len())
    } else {
        rest.iter().position(|c| c.first_epoch_ms >= min_epoch_ms)
    };
    offset.map(|o| current + 1 + o)
}

fn build_chain(candidates: &[Candidate], start: usize, recovery_spans: &[u32], sorted: bool) -> Option<Chain> {
    let mut members = Vec::with_capacity(recovery_spans.len());
    members.push(start);
    let mut current = start;

    for &recovery in &recovery_spans[1..] {
        let min_epoch_ms = candidates[current].last_epoch_ms + recovery as i64 * 1000;
        current = next_member(candidates, current, min_epoch_ms, sorted)?;
        members.push(current);
    }

    let total_distance = members.iter().map(|&m| candidates[m].distance_covered).sum();
    Some(Chain { members, total_distance })
}

#[cfg(feature = "parallel")]
fn build_chains(candidates: &[Candidate], starts: usize, recovery_spans: &[u32], sorted: bool) -> Vec<Chain> {
    use rayon::prelude::*;

    (0..starts)
        .into_par_iter()
        .filter_map(|start| build_chain(candidates, start, recovery_spans, sorted))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_chains(candidates: &[Candidate], starts: usize, recovery_spans: &[u32], sorted: bool) -> Vec<Chain> {
    (0..starts)
        .filter_map(|start| build_chain(candidates, start, recovery_spans, sorted))
        .collect()
}

/// First chain with the largest total distance.
fn select_best(chains: Vec<Chain>) -> Option<Chain> {
    let mut best: Option<Chain> = None;
    for chain in chains {
        let better = best
            .as_ref()
            .map_or(true, |b| chain.total_distance > b.total_distance);
        if better {
            best = Some(chain);
        }
    }
    best
}

// ============================================================================
// Search
// ============================================================================

/// Find the best-matching chain of intervals for a workout.
///
/// Returns one `CalculatedInterval` per expanded repetition, or `None` when
/// the workout does not fit anywhere after `start_index`.
///
/// # Example
/// ```
/// use run_analyzer::{find_best_match, IntervalSpec, Trackpoint};
///
/// // 10/3 m/s for three minutes
/// let trackpoints: Vec<Trackpoint> = (0..4)
///     .map(|i| Trackpoint {
///         sequence: i + 1,
///         epoch_ms: i as i64 * 60_000,
///         distance_meters: i as f64 * 200.0,
///         ..Trackpoint::default()
///     })
///     .collect();
///
/// let spec = IntervalSpec { time_span_s: 120, repeat_count: 1, ..IntervalSpec::default() };
/// let best = find_best_match(&trackpoints, &[spec], 0).unwrap();
/// assert_eq!(best.len(), 1);
/// assert_eq!(best[0].last_trackpoint_index, 2);
/// assert_eq!(best[0].distance_covered, 400.0);
/// ```
pub fn find_best_match(
    trackpoints: &[Trackpoint],
    specs: &[IntervalSpec],
    start_index: usize,
) -> Option<Vec<CalculatedInterval>> {
    find_best_match_with_config(trackpoints, specs, start_index, &IntervalSearchConfig::default())
}

/// Find the best-matching chain with explicit search limits.
pub fn find_best_match_with_config(
    trackpoints: &[Trackpoint],
    specs: &[IntervalSpec],
    start_index: usize,
    config: &IntervalSearchConfig,
) -> Option<Vec<CalculatedInterval>> {
    let plan = expand_specs(specs);
    if trackpoints.is_empty() || plan.is_empty() || start_index >= trackpoints.len() {
        debug!(
            "No interval search: {} trackpoints, {} expanded positions, start {}",
            trackpoints.len(),
            plan.len(),
            start_index
        );
        return None;
    }

    let span_ms = plan.time_spans[0] as i64 * 1000;
    let candidates = build_candidates(trackpoints, start_index, span_ms);
    let sorted = candidates
        .windows(2)
        .all(|pair| pair[0].first_epoch_ms <= pair[1].first_epoch_ms);

    let starts = match config.max_chain_starts {
        Some(limit) => candidates.len().min(limit as usize),
        None => candidates.len(),
    };

    let chains = build_chains(&candidates, starts, &plan.recovery_spans, sorted);
    debug!(
        "{} candidates ({}), {} complete chains of length {}",
        candidates.len(),
        if sorted { "sorted" } else { "unsorted" },
        chains.len(),
        plan.len()
    );

    let Some(best) = select_best(chains) else {
        info!("No complete interval chain of length {}", plan.len());
        return None;
    };
    info!(
        "Best interval chain starts at trackpoint {} covering {:.1} m",
        candidates[best.members[0]].first, best.total_distance
    );

    let spec = &specs[plan.spec_indices[0]];
    Some(
        best.members
            .iter()
            .enumerate()
            .map(|(position, &m)| candidates[m].to_interval(trackpoints, spec, position))
            .collect(),
    )
}
