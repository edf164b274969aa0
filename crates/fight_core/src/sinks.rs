//! Scene log and statistics sinks.
//!
//! Resolvers report human-readable outcomes through [`SceneLog`] and
//! damage numbers through [`StatisticHolder`]. Both are plain sinks:
//! nothing in the engine ever branches on their contents, so a
//! [`NoopLog`] is always a valid substitute for headless runs.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::unit::Team;

/// Append-only sink for human-readable fight narration.
pub trait SceneLog {
    /// Append one line to the log.
    fn update_log(&mut self, message: &str);

    /// The accumulated log, one line per entry.
    fn log(&self) -> String;

    /// Whether any line has been appended since construction.
    fn has_been_updated(&self) -> bool;
}

/// Scene log that records every line in memory.
///
/// Each line is also emitted at `debug` level so headless runs can
/// surface the narration through the tracing subscriber.
#[derive(Debug, Clone, Default)]
pub struct RecordedLog {
    lines: Vec<String>,
}

impl RecordedLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded lines in append order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl SceneLog for RecordedLog {
    fn update_log(&mut self, message: &str) {
        tracing::debug!(target: "fight::scene", "{message}");
        self.lines.push(message.to_owned());
    }

    fn log(&self) -> String {
        self.lines.join("\n")
    }

    fn has_been_updated(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Scene log that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

impl SceneLog for NoopLog {
    fn update_log(&mut self, _message: &str) {}

    fn log(&self) -> String {
        String::new()
    }

    fn has_been_updated(&self) -> bool {
        false
    }
}

/// Generic append-with-merge statistics collection.
///
/// The caller's `identify` closure decides whether a new item merges
/// into an existing entry; `combine` produces the merged entry. This
/// lets the same holder either accumulate repeated entries (same unit
/// and lap) or keep them separate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticHolder<T> {
    items: Vec<T>,
}

impl<T> StatisticHolder<T> {
    /// Create an empty holder.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item, merging it into the first entry `identify` matches.
    pub fn add<Fi, Fc>(&mut self, item: T, identify: Fi, combine: Fc)
    where
        Fi: Fn(&T, &T) -> bool,
        Fc: Fn(&T, &T) -> T,
    {
        if let Some(existing) = self.items.iter_mut().find(|entry| identify(entry, &item)) {
            *existing = combine(existing, &item);
        } else {
            self.items.push(item);
        }
    }

    /// All entries, sorted by the supplied comparator.
    #[must_use]
    pub fn get<F>(&self, compare: F) -> Vec<T>
    where
        T: Clone,
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut items = self.items.clone();
        items.sort_by(compare);
        items
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the holder is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One damage ledger entry: who dealt how much, for which team, on
/// which lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageStatistic {
    /// Display name of the damage dealer.
    pub unit_name: String,
    /// Team of the damage dealer.
    pub team: Team,
    /// Lap on which the damage landed.
    pub lap: u32,
    /// Damage dealt.
    pub damage: f64,
}

impl DamageStatistic {
    /// Identity: same unit on the same lap.
    #[must_use]
    pub fn same_unit_and_lap(a: &Self, b: &Self) -> bool {
        a.unit_name == b.unit_name && a.lap == b.lap
    }

    /// Combine: accumulate damage, keep identity fields.
    #[must_use]
    pub fn accumulate(a: &Self, b: &Self) -> Self {
        Self {
            unit_name: a.unit_name.clone(),
            team: a.team,
            lap: a.lap,
            damage: a.damage + b.damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_log_accumulates() {
        let mut log = RecordedLog::new();
        assert!(!log.has_been_updated());

        log.update_log("first");
        log.update_log("second");

        assert!(log.has_been_updated());
        assert_eq!(log.log(), "first\nsecond");
        assert_eq!(log.lines().len(), 2);
    }

    #[test]
    fn test_noop_log_discards() {
        let mut log = NoopLog;
        log.update_log("ignored");
        assert!(!log.has_been_updated());
        assert!(log.log().is_empty());
    }

    #[test]
    fn test_statistics_merge_same_unit_and_lap() {
        let mut stats = StatisticHolder::new();
        let entry = |damage: f64, lap: u32| DamageStatistic {
            unit_name: "Griffin".to_owned(),
            team: Team::Upper,
            lap,
            damage,
        };

        stats.add(
            entry(10.0, 1),
            DamageStatistic::same_unit_and_lap,
            DamageStatistic::accumulate,
        );
        stats.add(
            entry(5.0, 1),
            DamageStatistic::same_unit_and_lap,
            DamageStatistic::accumulate,
        );
        stats.add(
            entry(7.0, 2),
            DamageStatistic::same_unit_and_lap,
            DamageStatistic::accumulate,
        );

        let sorted = stats.get(|a, b| a.lap.cmp(&b.lap));
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].damage, 15.0);
        assert_eq!(sorted[1].damage, 7.0);
    }

    #[test]
    fn test_statistics_keep_separate_without_identity() {
        let mut stats = StatisticHolder::new();
        for damage in [1.0, 2.0, 3.0] {
            stats.add(
                DamageStatistic {
                    unit_name: "Wolf".to_owned(),
                    team: Team::Lower,
                    lap: 1,
                    damage,
                },
                |_, _| false,
                DamageStatistic::accumulate,
            );
        }
        assert_eq!(stats.len(), 3);
    }
}
