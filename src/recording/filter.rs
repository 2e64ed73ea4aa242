// src/recording/filter.rs
//! Whitelist/blacklist selection of recordings by attribute

use super::identity::RecordingIdentity;
use crate::error::{ForceError, ForceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute of a recording identity that filters can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAttribute {
    Subject,
    Day,
    Kind,
    Protocol,
}

impl RecordAttribute {
    /// Attribute value of `record`, rendered the way filters compare it
    pub fn value_of(&self, record: &RecordingIdentity) -> String {
        match self {
            RecordAttribute::Subject => record.subject_id().to_string(),
            RecordAttribute::Day => record.day_token(),
            RecordAttribute::Kind => record.kind().to_string(),
            RecordAttribute::Protocol => record.protocol().to_string(),
        }
    }
}

impl fmt::Display for RecordAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordAttribute::Subject => "subject",
            RecordAttribute::Day => "day",
            RecordAttribute::Kind => "kind",
            RecordAttribute::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Attribute → accepted (or rejected) values
pub type AttributeLists = BTreeMap<RecordAttribute, Vec<String>>;

/// Record filter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFilter {
    #[serde(default)]
    pub whitelists: AttributeLists,
    #[serde(default)]
    pub blacklists: AttributeLists,
}

impl RecordFilter {
    pub fn new(whitelists: AttributeLists, blacklists: AttributeLists) -> ForceResult<Self> {
        let filter = Self { whitelists, blacklists };
        filter.validate()?;
        Ok(filter)
    }

    /// Reject a whitelist and a blacklist on the same attribute
    pub fn validate(&self) -> ForceResult<()> {
        let conflicts: Vec<String> = self
            .whitelists
            .keys()
            .filter(|attr| self.blacklists.contains_key(attr))
            .map(|attr| attr.to_string())
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(ForceError::config(
                "record_filter",
                format!(
                    "whitelist and blacklist both given for: {}",
                    conflicts.join(", ")
                ),
            ))
        }
    }

    /// Whether a single record passes every list
    pub fn accepts(&self, record: &RecordingIdentity) -> bool {
        let whitelisted = self
            .whitelists
            .iter()
            .all(|(attr, values)| values.contains(&attr.value_of(record)));
        let blacklisted = self
            .blacklists
            .iter()
            .any(|(attr, values)| values.contains(&attr.value_of(record)));
        whitelisted && !blacklisted
    }

    /// Keep accepted records, preserving input order
    pub fn apply(&self, records: &[RecordingIdentity]) -> ForceResult<Vec<RecordingIdentity>> {
        self.validate()?;
        Ok(records
            .iter()
            .filter(|record| self.accepts(record))
            .cloned()
            .collect())
    }
}

/// Filter records with optional whitelists and blacklists
pub fn filter(
    records: &[RecordingIdentity],
    whitelists: Option<&AttributeLists>,
    blacklists: Option<&AttributeLists>,
) -> ForceResult<Vec<RecordingIdentity>> {
    let filter = RecordFilter::new(
        whitelists.cloned().unwrap_or_default(),
        blacklists.cloned().unwrap_or_default(),
    )?;
    filter.apply(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RecordingIdentity> {
        [
            "emg_force-01-sequential-2018-05-11-10-00-00-000.json",
            "emg_force-02-sequential-2018-05-11-10-00-00-000.json",
            "emg_force-01-mvc-2018-05-11-09-00-00-000.json",
            "emg_force-03-repeats_long-2018-05-12-10-00-00-000.json",
        ]
        .iter()
        .map(|n| RecordingIdentity::parse(n).unwrap())
        .collect()
    }

    fn lists(attr: RecordAttribute, values: &[&str]) -> AttributeLists {
        let mut map = AttributeLists::new();
        map.insert(attr, values.iter().map(|v| v.to_string()).collect());
        map
    }

    #[test]
    fn test_no_filters_pass_everything() {
        let all = records();
        assert_eq!(filter(&all, None, None).unwrap(), all);
    }

    #[test]
    fn test_whitelist_preserves_order() {
        let all = records();
        let wl = lists(RecordAttribute::Subject, &["03", "01"]);
        let kept = filter(&all, Some(&wl), None).unwrap();

        assert_eq!(kept, vec![all[0].clone(), all[2].clone(), all[3].clone()]);
    }

    #[test]
    fn test_blacklist_excludes() {
        let all = records();
        let bl = lists(RecordAttribute::Kind, &["mvc"]);
        let kept = filter(&all, None, Some(&bl)).unwrap();
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.is_raw()));
    }

    #[test]
    fn test_lists_on_different_attributes_combine() {
        let all = records();
        let wl = lists(RecordAttribute::Day, &["2018-05-11"]);
        let bl = lists(RecordAttribute::Subject, &["02"]);
        let kept = filter(&all, Some(&wl), Some(&bl)).unwrap();
        assert_eq!(kept, vec![all[0].clone(), all[2].clone()]);
    }

    #[test]
    fn test_conflicting_lists_rejected() {
        let all = records();
        let wl = lists(RecordAttribute::Subject, &["01"]);
        let bl = lists(RecordAttribute::Subject, &["02"]);
        assert!(matches!(
            filter(&all, Some(&wl), Some(&bl)),
            Err(ForceError::Config { .. })
        ));
    }

    #[test]
    fn test_filter_from_toml() {
        let parsed: RecordFilter = toml::from_str(
            r#"
[whitelists]
subject = ["01", "02"]

[blacklists]
protocol = ["repeats_long"]
"#,
        )
        .unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.apply(&records()).unwrap().len(), 3);
    }
}
