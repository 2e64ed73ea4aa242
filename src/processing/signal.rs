// src/processing/signal.rs
//! Time-aligned multichannel recording table

use crate::error::{ForceError, ForceResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One recording: EMG channels, force channels and a label per sample
///
/// Rows of `emg` and `force` are samples. Timestamps are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    timestamps: Vec<f64>,
    emg: Array2<f64>,
    force: Array2<f64>,
    labels: Vec<i64>,
}

impl SignalTable {
    pub fn new(
        timestamps: Vec<f64>,
        emg: Array2<f64>,
        force: Array2<f64>,
        labels: Vec<i64>,
    ) -> ForceResult<Self> {
        let table = Self {
            timestamps,
            emg,
            force,
            labels,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check row counts and timestamp ordering
    pub fn validate(&self) -> ForceResult<()> {
        let n = self.timestamps.len();
        if self.emg.nrows() != n || self.force.nrows() != n || self.labels.len() != n {
            return Err(ForceError::shape_mismatch(
                "signal table rows",
                format!("{} rows in every column group", n),
                format!(
                    "emg {}, force {}, labels {}",
                    self.emg.nrows(),
                    self.force.nrows(),
                    self.labels.len()
                ),
            ));
        }

        if let Some(bad) = self.timestamps.iter().position(|t| !t.is_finite()) {
            return Err(ForceError::invalid_data(
                "timestamps",
                format!("non-finite timestamp at sample {}", bad),
            ));
        }

        if let Some(i) = self.timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ForceError::invalid_data(
                "timestamps",
                format!("not strictly increasing at sample {}", i + 1),
            ));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn emg_channel_count(&self) -> usize {
        self.emg.ncols()
    }

    pub fn force_channel_count(&self) -> usize {
        self.force.ncols()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn emg(&self) -> &Array2<f64> {
        &self.emg
    }

    pub fn force(&self) -> &Array2<f64> {
        &self.force
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Copy with EMG replaced; shape must be unchanged
    pub fn with_emg(&self, emg: Array2<f64>) -> ForceResult<Self> {
        if emg.dim() != self.emg.dim() {
            return Err(ForceError::shape_mismatch(
                "replacement emg",
                format!("{:?}", self.emg.dim()),
                format!("{:?}", emg.dim()),
            ));
        }
        Ok(Self {
            timestamps: self.timestamps.clone(),
            emg,
            force: self.force.clone(),
            labels: self.labels.clone(),
        })
    }

    /// Copy with force replaced; shape must be unchanged
    pub fn with_force(&self, force: Array2<f64>) -> ForceResult<Self> {
        if force.dim() != self.force.dim() {
            return Err(ForceError::shape_mismatch(
                "replacement force",
                format!("{:?}", self.force.dim()),
                format!("{:?}", force.dim()),
            ));
        }
        Ok(Self {
            timestamps: self.timestamps.clone(),
            emg: self.emg.clone(),
            force,
            labels: self.labels.clone(),
        })
    }
}
