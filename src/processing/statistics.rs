// src/processing/statistics.rs
//! Time-domain window statistics for EMG channels

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amplitude below which a sample counts as zero for ZC/SSC
pub const CROSSING_THRESHOLD: f64 = 1e-9;

/// Per-channel statistic computed over one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WindowStatistic {
    /// Mean value
    Mean,
    /// Root mean square
    Rms,
    /// Mean absolute value
    Mav,
    /// Waveform length
    Wl,
    /// Zero crossings
    Zc,
    /// Slope sign changes
    Ssc,
    /// Population variance
    Var,
}

impl WindowStatistic {
    /// Column base name used in feature tables
    pub fn name(&self) -> &'static str {
        match self {
            WindowStatistic::Mean => "MEAN",
            WindowStatistic::Rms => "RMS",
            WindowStatistic::Mav => "MAV",
            WindowStatistic::Wl => "WL",
            WindowStatistic::Zc => "ZC",
            WindowStatistic::Ssc => "SSC",
            WindowStatistic::Var => "VAR",
        }
    }

    /// Evaluate over one channel's window; `data` must not be empty
    pub fn compute(&self, data: ArrayView1<f64>) -> f64 {
        let n = data.len() as f64;
        match self {
            WindowStatistic::Mean => data.sum() / n,
            WindowStatistic::Rms => (data.iter().map(|&x| x * x).sum::<f64>() / n).sqrt(),
            WindowStatistic::Mav => data.iter().map(|&x| x.abs()).sum::<f64>() / n,
            WindowStatistic::Wl => data
                .iter()
                .zip(data.iter().skip(1))
                .map(|(&a, &b)| (b - a).abs())
                .sum(),
            WindowStatistic::Zc => zero_crossings(data) as f64,
            WindowStatistic::Ssc => slope_sign_changes(data) as f64,
            WindowStatistic::Var => {
                let mean = data.sum() / n;
                data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n
            }
        }
    }
}

impl fmt::Display for WindowStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn zero_crossings(data: ArrayView1<f64>) -> u32 {
    let mut count = 0;
    for (&curr, &next) in data.iter().zip(data.iter().skip(1)) {
        if (curr >= CROSSING_THRESHOLD && next <= -CROSSING_THRESHOLD)
            || (curr <= -CROSSING_THRESHOLD && next >= CROSSING_THRESHOLD)
        {
            count += 1;
        }
    }
    count
}

fn slope_sign_changes(data: ArrayView1<f64>) -> u32 {
    if data.len() < 3 {
        return 0;
    }

    let mut count = 0;
    for i in 1..data.len() - 1 {
        let prev_slope = data[i] - data[i - 1];
        let next_slope = data[i + 1] - data[i];

        if (prev_slope > CROSSING_THRESHOLD && next_slope < -CROSSING_THRESHOLD)
            || (prev_slope < -CROSSING_THRESHOLD && next_slope > CROSSING_THRESHOLD)
        {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_amplitude_statistics() {
        let data = array![1.0, -2.0, 3.0, -4.0];
        let view = data.view();

        assert!((WindowStatistic::Mean.compute(view) - (-0.5)).abs() < 1e-12);
        assert!((WindowStatistic::Mav.compute(view) - 2.5).abs() < 1e-12);
        assert!((WindowStatistic::Rms.compute(view) - (30.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!((WindowStatistic::Wl.compute(view) - 15.0).abs() < 1e-12);
        assert!((WindowStatistic::Var.compute(view) - 7.25).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_statistics() {
        let data = array![1.0, -1.0, 1.0, -1.0, -2.0];
        assert_eq!(WindowStatistic::Zc.compute(data.view()), 3.0);
        assert_eq!(WindowStatistic::Ssc.compute(data.view()), 2.0);
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        let parsed: Vec<WindowStatistic> = serde_json::from_str(r#"["RMS","WL","ZC"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![WindowStatistic::Rms, WindowStatistic::Wl, WindowStatistic::Zc]
        );
        assert_eq!(parsed[0].name(), "RMS");
    }
}
