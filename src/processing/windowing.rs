// src/processing/windowing.rs
//! Sliding-window feature extraction with force/label alignment
//!
//! A window covers samples `[start, start + length)`. Its force values and
//! label are read from the last sample of the window, so no window ever sees
//! force information from after the sample its label belongs to.

use super::signal::SignalTable;
use super::statistics::WindowStatistic;
use crate::error::{ForceError, ForceResult};
use ndarray::{s, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Window length and stride, in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub length: usize,
    pub stride: usize,
}

impl WindowConfig {
    pub fn new(length: usize, stride: usize) -> ForceResult<Self> {
        let config = Self { length, stride };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ForceResult<()> {
        if self.length == 0 {
            return Err(ForceError::config("windowing", "window length must be greater than 0"));
        }
        if self.stride == 0 {
            return Err(ForceError::config("windowing", "window stride must be greater than 0"));
        }
        Ok(())
    }

    /// Number of complete windows over `samples` samples
    pub fn window_count(&self, samples: usize) -> usize {
        if samples < self.length || self.stride == 0 {
            0
        } else {
            (samples - self.length) / self.stride + 1
        }
    }
}

/// One window's features and aligned targets
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    /// First sample of the window
    pub start: usize,
    /// Sample the force values and label are taken from
    pub reference: usize,
    /// Statistic-major: every channel of statistic 0, then statistic 1, ...
    pub features: Vec<f64>,
    pub force: Vec<f64>,
    pub label: i64,
}

/// Slide a window over `table`, computing `statistics` on every EMG channel
pub fn window_features(
    table: &SignalTable,
    config: &WindowConfig,
    statistics: &[WindowStatistic],
) -> ForceResult<Vec<FeatureWindow>> {
    config.validate()?;

    let emg = table.emg();
    let force = table.force();
    let count = config.window_count(table.len());
    let mut windows = Vec::with_capacity(count);

    for w in 0..count {
        let start = w * config.stride;
        let reference = start + config.length - 1;
        let segment = emg.slice(s![start..start + config.length, ..]);

        let mut features = Vec::with_capacity(statistics.len() * emg.ncols());
        for statistic in statistics {
            for channel in segment.columns() {
                features.push(statistic.compute(channel));
            }
        }

        windows.push(FeatureWindow {
            start,
            reference,
            features,
            force: force.row(reference).to_vec(),
            label: table.labels()[reference],
        });
    }

    Ok(windows)
}

/// Column name for channel `channel` (1-based) of feature `base`
pub fn column_name(base: &str, channel: usize) -> String {
    format!("{}_{}", base, channel)
}

/// Split `<base>_<channel>` into its parts
pub fn split_column_name(name: &str) -> Option<(&str, usize)> {
    let (base, channel) = name.rsplit_once('_')?;
    let channel = channel.parse().ok()?;
    (!base.is_empty()).then_some((base, channel))
}

/// Windowed feature table with named columns
///
/// EMG statistic columns come first (`<STAT>_<channel>`), followed by the
/// aligned force columns (`<force_feature_name>_<channel>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    data: Array2<f64>,
    labels: Vec<i64>,
    reference_indices: Vec<usize>,
}

impl FeatureTable {
    pub fn new(
        columns: Vec<String>,
        data: Array2<f64>,
        labels: Vec<i64>,
        reference_indices: Vec<usize>,
    ) -> ForceResult<Self> {
        let table = Self {
            columns,
            data,
            labels,
            reference_indices,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> ForceResult<()> {
        if self.data.ncols() != self.columns.len() {
            return Err(ForceError::shape_mismatch(
                "feature table columns",
                self.columns.len(),
                self.data.ncols(),
            ));
        }
        if self.labels.len() != self.data.nrows() || self.reference_indices.len() != self.data.nrows() {
            return Err(ForceError::shape_mismatch(
                "feature table rows",
                self.data.nrows(),
                format!(
                    "{} labels, {} reference indices",
                    self.labels.len(),
                    self.reference_indices.len()
                ),
            ));
        }
        let mut seen = HashSet::with_capacity(self.columns.len());
        if let Some(name) = self.columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ForceError::invalid_data(
                "feature table",
                format!("duplicate column '{}'", name),
            ));
        }
        Ok(())
    }

    /// Assemble windows produced by [`window_features`]
    pub fn from_windows(
        windows: &[FeatureWindow],
        statistics: &[WindowStatistic],
        emg_channels: usize,
        force_channels: usize,
        force_feature_name: &str,
    ) -> ForceResult<Self> {
        let mut columns = Vec::with_capacity(statistics.len() * emg_channels + force_channels);
        for statistic in statistics {
            for channel in 1..=emg_channels {
                columns.push(column_name(statistic.name(), channel));
            }
        }
        for channel in 1..=force_channels {
            columns.push(column_name(force_feature_name, channel));
        }

        let width = columns.len();
        let mut values = Vec::with_capacity(windows.len() * width);
        for (i, window) in windows.iter().enumerate() {
            if window.features.len() + window.force.len() != width {
                return Err(ForceError::shape_mismatch(
                    &format!("feature window {}", i),
                    width,
                    window.features.len() + window.force.len(),
                ));
            }
            values.extend_from_slice(&window.features);
            values.extend_from_slice(&window.force);
        }

        let data = Array2::from_shape_vec((windows.len(), width), values)
            .map_err(|e| ForceError::invalid_data("feature table", e.to_string()))?;

        Self::new(
            columns,
            data,
            windows.iter().map(|w| w.label).collect(),
            windows.iter().map(|w| w.reference).collect(),
        )
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn reference_indices(&self) -> &[usize] {
        &self.reference_indices
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<f64>> {
        self.column_index(name).map(|i| self.data.column(i))
    }

    /// Indices of every column whose base name is `base`, in table order
    pub fn columns_with_base(&self, base: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, name)| matches!(split_column_name(name), Some((b, _)) if b == base))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Window `table` and build its feature table in one step
pub fn extract_feature_table(
    table: &SignalTable,
    config: &WindowConfig,
    statistics: &[WindowStatistic],
    force_feature_name: &str,
) -> ForceResult<FeatureTable> {
    let windows = window_features(table, config, statistics)?;
    FeatureTable::from_windows(
        &windows,
        statistics,
        table.emg_channel_count(),
        table.force_channel_count(),
        force_feature_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp_table(samples: usize) -> SignalTable {
        let emg = Array2::from_shape_fn((samples, 2), |(i, c)| (i * (c + 1)) as f64);
        let force = Array2::from_shape_fn((samples, 1), |(i, _)| i as f64 * 10.0);
        SignalTable::new(
            (0..samples).map(|i| i as f64).collect(),
            emg,
            force,
            (0..samples as i64).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_window_count() {
        let config = WindowConfig::new(4, 2).unwrap();
        assert_eq!(config.window_count(10), 4);
        assert_eq!(config.window_count(4), 1);
        assert_eq!(config.window_count(3), 0);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(WindowConfig::new(0, 1).is_err());
        assert!(WindowConfig::new(4, 0).is_err());
    }

    #[test]
    fn test_force_taken_from_last_sample() {
        let table = ramp_table(10);
        let windows = window_features(&table, &WindowConfig::new(4, 3).unwrap(), &[WindowStatistic::Mean]).unwrap();

        assert_eq!(windows.len(), 3);
        for window in &windows {
            assert_eq!(window.reference, window.start + 3);
            assert_eq!(window.force, vec![window.reference as f64 * 10.0]);
            assert_eq!(window.label, window.reference as i64);
        }
        // mean of samples 3..7 on channel 1 and channel 2
        assert_eq!(windows[1].features, vec![4.5, 9.0]);
    }

    #[test]
    fn test_trailing_samples_dropped() {
        let table = ramp_table(11);
        let windows = window_features(&table, &WindowConfig::new(4, 4).unwrap(), &[WindowStatistic::Rms]).unwrap();
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w.reference < 11));
    }

    #[test]
    fn test_feature_table_columns() {
        let table = ramp_table(8);
        let features = extract_feature_table(
            &table,
            &WindowConfig::new(4, 2).unwrap(),
            &[WindowStatistic::Rms, WindowStatistic::Wl],
            "FORCE",
        )
        .unwrap();

        assert_eq!(features.columns(), &["RMS_1", "RMS_2", "WL_1", "WL_2", "FORCE_1"]);
        assert_eq!(features.n_rows(), 3);
        assert_eq!(features.columns_with_base("WL"), vec![2, 3]);
        assert_eq!(features.column("FORCE_1").unwrap().to_vec(), vec![30.0, 50.0, 70.0]);
        assert_eq!(features.reference_indices(), &[3, 5, 7]);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = FeatureTable::new(
            vec!["RMS_1".to_string(), "RMS_1".to_string()],
            Array2::zeros((2, 2)),
            vec![0, 1],
            vec![0, 1],
        );
        assert!(matches!(result, Err(ForceError::InvalidData { .. })));

        let statistics = [WindowStatistic::Rms];
        let windows = window_features(&ramp_table(10), &WindowConfig::new(4, 2).unwrap(), &statistics).unwrap();
        assert!(FeatureTable::from_windows(&windows, &statistics, 2, 1, "RMS").is_err());
        assert!(FeatureTable::from_windows(&windows, &statistics, 2, 1, "FORCE").is_ok());
    }

    #[test]
    fn test_split_column_name() {
        assert_eq!(split_column_name("RMS_3"), Some(("RMS", 3)));
        assert_eq!(split_column_name("MEAN_FREQ_12"), Some(("MEAN_FREQ", 12)));
        assert_eq!(split_column_name("RMS"), None);
        assert_eq!(split_column_name("_3"), None);
    }
}
