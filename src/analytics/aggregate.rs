//! Pure aggregation over normalized messages.
//!
//! Nothing here fails or mutates its input. Missing fields were defaulted by
//! the normalizer, so every function is total over any slice of `Message`.

#![allow(missing_docs)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::model::{Direction, DirectionFilter, Message, Outcome};
use crate::window::ranges::PeriodType;
use crate::window::series::{SeriesSkeleton, breakdown_skeleton, continuity_skeleton};

// ──────────────────── result types ────────────────────

/// Success/failure tally for one direction of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub success: u64,
    pub fail: u64,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Successful => self.success += 1,
            Outcome::Failed => self.fail += 1,
            Outcome::Other => {}
        }
    }

    pub const fn total(&self) -> u64 {
        self.success + self.fail
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub key: String,
    pub display_label: String,
    pub inward: OutcomeCounts,
    pub outward: OutcomeCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRanking {
    #[serde(rename = "type")]
    pub type_name: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub successful: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub success_rate_int: Option<u64>,
}

/// Error taxonomy over failed messages. Categories overlap: one message
/// with two error fields set counts in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStatistics {
    pub field_errors: u64,
    pub not_supported_errors: u64,
    pub invalid_errors: u64,
    pub other_errors: u64,
    pub total_errors: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCounts {
    pub success_count: u64,
    pub fail_count: u64,
    pub inward_count: u64,
    pub outward_count: u64,
    /// `success_count + fail_count`
    pub total_count: u64,
    pub success_percentage: u64,
    pub fail_percentage: u64,
}

// ──────────────────── time series ────────────────────

/// Rolling chart series (7 days, 52 ISO weeks, or 12 months) ending at `now`.
///
/// The output length depends only on `period`. Records outside the window,
/// without a date, or with an unrecognized direction touch no bucket.
pub fn build_time_series(
    messages: &[Message],
    period: PeriodType,
    direction: &DirectionFilter,
    now: DateTime<Utc>,
) -> Vec<TimeBucket> {
    fill_buckets(&continuity_skeleton(period, now), messages, direction)
}

/// Buckets inside the current period: hours of today, days of this week, or
/// days of this month.
pub fn build_breakdown(
    messages: &[Message],
    period: PeriodType,
    direction: &DirectionFilter,
    now: DateTime<Utc>,
) -> Vec<TimeBucket> {
    fill_buckets(&breakdown_skeleton(period, now), messages, direction)
}

fn fill_buckets(
    skeleton: &SeriesSkeleton,
    messages: &[Message],
    direction: &DirectionFilter,
) -> Vec<TimeBucket> {
    let mut buckets: Vec<TimeBucket> = skeleton
        .slots
        .iter()
        .map(|slot| TimeBucket {
            key: slot.key.clone(),
            display_label: slot.label.clone(),
            inward: OutcomeCounts::default(),
            outward: OutcomeCounts::default(),
        })
        .collect();
    let index: HashMap<String, usize> = skeleton
        .slots
        .iter()
        .enumerate()
        .map(|(i, slot)| (slot.key.clone(), i))
        .collect();

    for message in messages {
        if !direction.matches(&message.direction) {
            continue;
        }
        let Some(date) = message.date.filter(|d| skeleton.window.contains(*d)) else {
            continue;
        };
        let Some(&slot) = index.get(&skeleton.key_for(date)) else {
            continue;
        };
        let bucket = &mut buckets[slot];
        match message.flow() {
            Some(Direction::Inward) => bucket.inward.record(message.outcome()),
            Some(Direction::Outward) => bucket.outward.record(message.outcome()),
            None => {}
        }
    }
    buckets
}

// ──────────────────── rankings ────────────────────

/// Top `limit` MT types by count, descending. Equal counts keep the order in
/// which each type was first seen.
pub fn rank_types(messages: &[Message], limit: usize, include_stats: bool) -> Vec<TypeRanking> {
    #[derive(Default)]
    struct Tally {
        count: u64,
        successful: u64,
        failed: u64,
    }

    let mut order: Vec<(String, Tally)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for message in messages {
        let label = message.type_label();
        let slot = match index.get(label) {
            Some(&slot) => slot,
            None => {
                index.insert(label.to_string(), order.len());
                order.push((label.to_string(), Tally::default()));
                order.len() - 1
            }
        };
        let tally = &mut order[slot].1;
        tally.count += 1;
        match message.outcome() {
            Outcome::Successful => tally.successful += 1,
            Outcome::Failed => tally.failed += 1,
            Outcome::Other => {}
        }
    }

    // `sort_by` is stable: ties stay in first-seen order.
    order.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    order.truncate(limit);

    order
        .into_iter()
        .map(|(type_name, tally)| TypeRanking {
            type_name,
            count: tally.count,
            successful: include_stats.then_some(tally.successful),
            failed: include_stats.then_some(tally.failed),
            success_rate_int: include_stats.then(|| percent(tally.successful, tally.count)),
        })
        .collect()
}

/// `round(part / whole * 100)`, half rounding up, `0` when `whole == 0`.
pub const fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        (part * 200 + whole) / (whole * 2)
    }
}

// ──────────────────── error taxonomy ────────────────────

pub fn error_statistics(messages: &[Message]) -> ErrorStatistics {
    let mut stats = ErrorStatistics::default();
    for message in messages.iter().filter(|m| m.outcome() == Outcome::Failed) {
        stats.total_errors += 1;
        let field = !is_blank(&message.field_error);
        let not_supported = !is_blank(&message.not_supported_error);
        let invalid = !is_blank(&message.invalid_error);
        if field {
            stats.field_errors += 1;
        }
        if not_supported {
            stats.not_supported_errors += 1;
        }
        if invalid {
            stats.invalid_errors += 1;
        }
        // Unclassified failures count as "other" even without an otherError value.
        if !is_blank(&message.other_error) || !(field || not_supported || invalid) {
            stats.other_errors += 1;
        }
    }
    stats
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ──────────────────── completion counts ────────────────────

/// Success/fail counts restricted to `direction`; inward/outward counts over
/// every record.
pub fn completion_and_direction_counts(
    messages: &[Message],
    direction: &DirectionFilter,
) -> CompletionCounts {
    let mut counts = CompletionCounts::default();
    for message in messages {
        match message.flow() {
            Some(Direction::Inward) => counts.inward_count += 1,
            Some(Direction::Outward) => counts.outward_count += 1,
            None => {}
        }
        if !direction.matches(&message.direction) {
            continue;
        }
        match message.outcome() {
            Outcome::Successful => counts.success_count += 1,
            Outcome::Failed => counts.fail_count += 1,
            Outcome::Other => {}
        }
    }
    counts.total_count = counts.success_count + counts.fail_count;
    counts.success_percentage = percent(counts.success_count, counts.total_count);
    counts.fail_percentage = percent(counts.fail_count, counts.total_count);
    counts
}
