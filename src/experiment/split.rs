// src/experiment/split.rs
//! Subject/day grouping and deterministic k-fold splits over trials
//!
//! Folds are contiguous blocks of the sorted trial list. With `T` trials and
//! `k` folds every fold holds `T / k` trials and the first `T % k` folds take
//! one extra, so fold sizes differ by at most one. Nothing here is random:
//! the same records and `k` always give the same splits.

use crate::error::{ForceError, ForceResult};
use crate::recording::RecordingIdentity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// (subject, day) grouping key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub subject_id: String,
    pub day: NaiveDate,
}

impl GroupKey {
    pub fn of(record: &RecordingIdentity) -> Self {
        Self {
            subject_id: record.subject_id().to_string(),
            day: record.day(),
        }
    }

    pub fn day_token(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subject_id, self.day_token())
    }
}

/// One train/test partition of a group's trials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub index: usize,
    pub train: Vec<RecordingIdentity>,
    pub test: Vec<RecordingIdentity>,
}

/// Sorted records with one file per (subject, day, trial)
///
/// Several files of the same trial (e.g. `_features` and
/// `_filtered_features`) would otherwise count as separate trials and could
/// land on both sides of a split. The first file in identity order is kept.
pub fn unique_trials(records: &[RecordingIdentity]) -> Vec<RecordingIdentity> {
    let mut trials = records.to_vec();
    trials.sort();
    trials.dedup_by(|later, kept| {
        let same_trial = later.subject_id() == kept.subject_id()
            && later.day() == kept.day()
            && later.trial() == kept.trial();
        if same_trial && later.raw_path() != kept.raw_path() {
            warn!(
                "Duplicate file for trial {}: using {}, ignoring {}",
                kept,
                kept.raw_path(),
                later.raw_path()
            );
        }
        same_trial
    });
    trials
}

/// Group records by (subject, day); each group is sorted, one file per trial
pub fn group_by_subject_and_day(
    records: &[RecordingIdentity],
) -> BTreeMap<GroupKey, Vec<RecordingIdentity>> {
    let mut groups: BTreeMap<GroupKey, Vec<RecordingIdentity>> = BTreeMap::new();
    for record in unique_trials(records) {
        groups.entry(GroupKey::of(&record)).or_default().push(record);
    }
    groups
}

/// `k` splits of one group, fold `i` being the test side of split `i`
pub fn make_splits(group: &[RecordingIdentity], k: usize) -> ForceResult<Vec<Split>> {
    let trials = unique_trials(group);
    let total = trials.len();
    if k == 0 || total < k {
        let (subject, day) = trials
            .first()
            .map(|r| (r.subject_id().to_string(), r.day_token()))
            .unwrap_or_default();
        return Err(ForceError::InsufficientTrials {
            subject,
            day,
            trials: total,
            splits: k,
        });
    }

    let base = total / k;
    let remainder = total % k;
    let mut splits = Vec::with_capacity(k);
    let mut start = 0;
    for index in 0..k {
        let size = base + usize::from(index < remainder);
        let end = start + size;
        let train = trials[..start]
            .iter()
            .chain(trials[end..].iter())
            .cloned()
            .collect();
        splits.push(Split {
            index,
            train,
            test: trials[start..end].to_vec(),
        });
        start = end;
    }
    Ok(splits)
}

/// Splits of every (subject, day) group
#[derive(Debug, Default)]
pub struct GroupSplits {
    pub splits: BTreeMap<GroupKey, Vec<Split>>,
    /// Groups that could not be split, with the reason
    pub failures: BTreeMap<GroupKey, ForceError>,
}

/// Group `records` and split every group; a failing group leaves the others intact
pub fn splits_for_records(records: &[RecordingIdentity], k: usize) -> GroupSplits {
    let mut result = GroupSplits::default();
    for (key, group) in group_by_subject_and_day(records) {
        match make_splits(&group, k) {
            Ok(splits) => {
                result.splits.insert(key, splits);
            }
            Err(e) => {
                warn!("Skipping group {}: {}", key, e);
                result.failures.insert(key, e);
            }
        }
    }
    result
}
