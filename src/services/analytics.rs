//! Mood analytics: bucket entries by calendar day and summarise a window.
//!
//! Entries without a score still count towards every count
//! (`entryCount`, `totalEntries`, `dailyAverage`) but never towards an
//! average. Entries without a mood label are skipped by the mode.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

/// Trailing window the caller fetched entries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    SevenDays,
    FifteenDays,
    #[default]
    ThirtyDays,
}

impl Period {
    /// Unrecognised labels fall back to 30 days.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("7d") => Period::SevenDays,
            Some("15d") => Period::FifteenDays,
            _ => Period::ThirtyDays,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Period::SevenDays => 7,
            Period::FifteenDays => 15,
            Period::ThirtyDays => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::SevenDays => "7d",
            Period::FifteenDays => "15d",
            Period::ThirtyDays => "30d",
        }
    }

    /// Earliest `created_at` included when the window ends at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.days())
    }
}

/// What the aggregator needs to know about an entry.
pub trait MoodSample {
    fn created_at(&self) -> DateTime<Utc>;
    fn mood_score(&self) -> Option<f64>;
    fn mood_label(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub date: NaiveDate,
    /// `None` when no entry of the day carries a score.
    pub average_score: Option<f64>,
    pub entry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_entries: usize,
    pub average_score: f64,
    pub most_frequent_mood: Option<String>,
    pub daily_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsResult {
    pub timeline: Vec<TimelinePoint>,
    pub stats: OverallStats,
}

struct DailyBucket {
    date: NaiveDate,
    total_score: f64,
    scored: u32,
    count: u32,
}

/// Aggregator pinned to one UTC offset for day truncation.
#[derive(Debug, Clone, Copy)]
pub struct MoodAggregator {
    offset: FixedOffset,
}

impl Default for MoodAggregator {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl MoodAggregator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn date_key(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn aggregate<E: MoodSample>(&self, entries: &[E], period: Period) -> AnalyticsResult {
        let mut buckets: Vec<DailyBucket> = Vec::new();
        let mut bucket_index: HashMap<NaiveDate, usize> = HashMap::new();

        let mut score_sum = 0.0;
        let mut scored = 0usize;

        // Labels in first-seen order with their counts.
        let mut moods: Vec<(&str, usize)> = Vec::new();
        let mut mood_index: HashMap<&str, usize> = HashMap::new();

        for entry in entries {
            let date = self.date_key(entry.created_at());
            let idx = *bucket_index.entry(date).or_insert_with(|| {
                buckets.push(DailyBucket {
                    date,
                    total_score: 0.0,
                    scored: 0,
                    count: 0,
                });
                buckets.len() - 1
            });
            let bucket = &mut buckets[idx];
            bucket.count += 1;

            if let Some(score) = entry.mood_score() {
                bucket.total_score += score;
                bucket.scored += 1;
                score_sum += score;
                scored += 1;
            }

            if let Some(label) = entry.mood_label() {
                let i = *mood_index.entry(label).or_insert_with(|| {
                    moods.push((label, 0));
                    moods.len() - 1
                });
                moods[i].1 += 1;
            }
        }

        let timeline = buckets
            .iter()
            .map(|b| TimelinePoint {
                date: b.date,
                average_score: (b.scored > 0).then(|| round1(b.total_score / b.scored as f64)),
                entry_count: b.count,
            })
            .collect();

        // Strict `>` keeps the earliest-seen label on ties.
        let mut most_frequent: Option<(&str, usize)> = None;
        for &(label, count) in &moods {
            if most_frequent.map_or(true, |(_, best)| count > best) {
                most_frequent = Some((label, count));
            }
        }

        let total_entries = entries.len();
        let stats = OverallStats {
            total_entries,
            average_score: if scored > 0 {
                round1(score_sum / scored as f64)
            } else {
                0.0
            },
            most_frequent_mood: most_frequent.map(|(label, _)| label.to_string()),
            daily_average: round1(total_entries as f64 / period.days() as f64),
        };

        AnalyticsResult { timeline, stats }
    }
}

/// Aggregate with UTC day boundaries.
#[cfg(test)]
pub fn aggregate<E: MoodSample>(entries: &[E], period: Period) -> AnalyticsResult {
    MoodAggregator::default().aggregate(entries, period)
}

/// Half-up rounding to one decimal place for non-negative values.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
