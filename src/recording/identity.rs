// src/recording/identity.rs
//! Recording identity parsed from structured filenames
//!
//! Filenames follow the layout
//! `<experiment>-<subject>-<protocol>-<YYYY>-<MM>-<DD>-<hh>-<mm>-<ss>-<ms>`,
//! optionally followed by processing suffixes on the last token
//! (`..._filtered_features`) and a file extension.

use crate::error::{ForceError, ForceResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Number of hyphen-separated fields in a recording stem
pub const NAME_FIELD_COUNT: usize = 10;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Kind of recording, derived from the protocol token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    /// Regular trial recording
    Raw,
    /// Sensor bias calibration
    Bias,
    /// Maximum-voluntary-contraction calibration
    Mvc,
}

impl RecordingKind {
    fn from_protocol(protocol: &str) -> Self {
        match protocol {
            "mvc" => RecordingKind::Mvc,
            "bias" => RecordingKind::Bias,
            _ => RecordingKind::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingKind::Raw => "raw",
            RecordingKind::Bias => "bias",
            RecordingKind::Mvc => "mvc",
        }
    }
}

impl fmt::Display for RecordingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of one recording file
///
/// Field order defines the ordering: subject, day, kind, then trial tokens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordingIdentity {
    subject_id: String,
    day: NaiveDate,
    kind: RecordingKind,
    protocol: String,
    time: String,
    experiment: String,
    raw_path: String,
}

impl RecordingIdentity {
    /// Parse a recording path
    pub fn parse(path: impl AsRef<Path>) -> ForceResult<Self> {
        let path = path.as_ref();
        let malformed = |reason: String| ForceError::MalformedName {
            path: path.display().to_string(),
            reason,
        };

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| malformed("file name is missing or not UTF-8".to_string()))?;
        let stem = file_name.split_once('.').map_or(file_name, |(stem, _)| stem);

        let tokens: Vec<&str> = stem.split('-').collect();
        if tokens.len() != NAME_FIELD_COUNT {
            return Err(malformed(format!(
                "expected {} hyphen-separated fields, found {}",
                NAME_FIELD_COUNT,
                tokens.len()
            )));
        }

        let experiment = tokens[0];
        let subject_id = tokens[1];
        let protocol = tokens[2];
        if experiment.is_empty() || protocol.is_empty() {
            return Err(malformed("empty experiment or protocol token".to_string()));
        }
        if subject_id.is_empty() || !subject_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(malformed(format!("invalid subject token '{}'", subject_id)));
        }

        let day = parse_day(&tokens[3..6]).map_err(malformed)?;

        // Processing suffixes hang off the millisecond token
        let millis = tokens[9].split_once('_').map_or(tokens[9], |(ms, _)| ms);
        let time_tokens = [tokens[6], tokens[7], tokens[8], millis];
        if time_tokens
            .iter()
            .any(|t| t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(malformed("time fields must be numeric".to_string()));
        }

        Ok(Self {
            subject_id: subject_id.to_string(),
            day,
            kind: RecordingKind::from_protocol(protocol),
            protocol: protocol.to_string(),
            time: time_tokens.join("-"),
            experiment: experiment.to_string(),
            raw_path: path.display().to_string(),
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Day formatted as `YYYY-MM-DD`
    pub fn day_token(&self) -> String {
        self.day.format(DAY_FORMAT).to_string()
    }

    pub fn kind(&self) -> RecordingKind {
        self.kind
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Trial token, unique within a (subject, day)
    pub fn trial(&self) -> String {
        format!("{}-{}", self.protocol, self.time)
    }

    pub fn is_raw(&self) -> bool {
        self.kind == RecordingKind::Raw
    }

    /// Canonical stem without suffixes or extension
    pub fn to_file_stem(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.experiment,
            self.subject_id,
            self.protocol,
            self.day_token(),
            self.time
        )
    }
}

impl fmt::Display for RecordingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_file_stem())
    }
}

fn parse_day(tokens: &[&str]) -> Result<NaiveDate, String> {
    let widths = [4, 2, 2];
    for (token, width) in tokens.iter().zip(widths) {
        if token.len() != width || !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid date token '{}'", token));
        }
    }
    NaiveDate::parse_from_str(&tokens.join("-"), DAY_FORMAT)
        .map_err(|e| format!("invalid date '{}': {}", tokens.join("-"), e))
}
