// src/processing/normalization.rs
//! MVC-based force normalization

use super::signal::SignalTable;
use crate::error::{ForceError, ForceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observed range of one force channel during the MVC recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    /// Map `value` into [0, 1]; a flat range maps everything to 0
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        (value.clamp(self.min, self.max) - self.min) / span
    }
}

/// Per-force-channel calibration, keyed by 1-based channel index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    channels: BTreeMap<usize, ChannelRange>,
}

impl CalibrationProfile {
    pub fn from_ranges(ranges: impl IntoIterator<Item = (usize, ChannelRange)>) -> Self {
        Self {
            channels: ranges.into_iter().collect(),
        }
    }

    pub fn range(&self, channel: usize) -> Option<&ChannelRange> {
        self.channels.get(&channel)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Derive a calibration profile from an MVC recording
pub fn build_calibration(mvc: &SignalTable, min_samples: usize) -> ForceResult<CalibrationProfile> {
    if mvc.len() < min_samples.max(1) {
        return Err(ForceError::Calibration {
            reason: format!(
                "MVC recording has {} samples, at least {} required",
                mvc.len(),
                min_samples.max(1)
            ),
        });
    }

    let mut ranges = BTreeMap::new();
    for (index, column) in mvc.force().columns().into_iter().enumerate() {
        let channel = index + 1;
        if column.iter().any(|v| !v.is_finite()) {
            return Err(ForceError::Calibration {
                reason: format!("MVC force channel {} contains non-finite values", channel),
            });
        }
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        ranges.insert(channel, ChannelRange { min, max });
    }

    Ok(CalibrationProfile { channels: ranges })
}

/// Rescale force channels of `raw` into [0, 1]; EMG passes through
pub fn normalize(raw: &SignalTable, profile: &CalibrationProfile) -> ForceResult<SignalTable> {
    let mut force = raw.force().clone();
    for (index, mut column) in force.columns_mut().into_iter().enumerate() {
        let channel = index + 1;
        let range = profile
            .range(channel)
            .ok_or(ForceError::MissingCalibration { channel })?;
        column.mapv_inplace(|v| range.normalize(v));
    }
    raw.with_force(force)
}
