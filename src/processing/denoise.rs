// src/processing/denoise.rs
//! Denoising of EMG channels before windowing
//!
//! The filter design lives behind [`DenoiseFilter`]. Whatever the design,
//! [`apply_denoise_filter`] guarantees per-channel independent filtering and
//! an unchanged sample count and timebase.

use super::signal::SignalTable;
use crate::config::DenoiseConfig;
use crate::error::{ForceError, ForceResult};
use ndarray::Array1;

/// Filter applied to one channel at a time
pub trait DenoiseFilter {
    /// Filter a full channel; output must have the same length as the input
    fn filter_channel(&self, samples: &[f64]) -> ForceResult<Vec<f64>>;
    fn name(&self) -> &str;
}

/// Second-order section coefficients, normalised by a0
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Butterworth high-pass (Q = 1/sqrt(2))
    fn highpass(cutoff_hz: f64, sample_rate_hz: f64) -> ForceResult<Self> {
        if cutoff_hz <= 0.0 || cutoff_hz >= sample_rate_hz / 2.0 {
            return Err(ForceError::config(
                "denoise",
                format!(
                    "Invalid cutoff frequency: {} Hz (sample rate: {} Hz)",
                    cutoff_hz, sample_rate_hz
                ),
            ));
        }

        let omega = 2.0 * std::f64::consts::PI * cutoff_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / std::f64::consts::SQRT_2;

        let a0 = 1.0 + alpha;
        Ok(Self {
            b0: (1.0 + cos_omega) / 2.0 / a0,
            b1: -(1.0 + cos_omega) / a0,
            b2: (1.0 + cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        })
    }

    fn notch(center_hz: f64, sample_rate_hz: f64, q_factor: f64) -> ForceResult<Self> {
        if center_hz <= 0.0 || center_hz >= sample_rate_hz / 2.0 {
            return Err(ForceError::config(
                "denoise",
                format!("Invalid center frequency: {} Hz", center_hz),
            ));
        }
        if q_factor <= 0.0 {
            return Err(ForceError::config("denoise", format!("Invalid Q factor: {}", q_factor)));
        }

        let omega = 2.0 * std::f64::consts::PI * center_hz / sample_rate_hz;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q_factor);

        let a0 = 1.0 + alpha;
        Ok(Self {
            b0: 1.0 / a0,
            b1: -2.0 * cos_omega / a0,
            b2: 1.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        })
    }

    /// Run the difference equation over a whole channel from rest
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x0| {
                let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                x2 = x1;
                x1 = x0;
                y2 = y1;
                y1 = y0;
                y0
            })
            .collect()
    }
}

/// High-pass plus powerline notch cascade
#[derive(Debug, Clone)]
pub struct BiquadDenoiser {
    name: String,
    sections: Vec<Biquad>,
}

impl BiquadDenoiser {
    pub fn new(config: &DenoiseConfig, sample_rate_hz: f64) -> ForceResult<Self> {
        let mut sections = Vec::with_capacity(config.notch_frequencies_hz.len() + 1);
        // a zero cutoff switches the high-pass off
        if let Some(cutoff) = config.highpass_cutoff_hz.filter(|c| *c != 0.0) {
            sections.push(Biquad::highpass(cutoff, sample_rate_hz)?);
        }
        for &freq in &config.notch_frequencies_hz {
            sections.push(Biquad::notch(freq, sample_rate_hz, config.notch_q)?);
        }

        Ok(Self {
            name: format!(
                "Biquad-HP{:?}-Notch{:?}",
                config.highpass_cutoff_hz, config.notch_frequencies_hz
            ),
            sections,
        })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

impl DenoiseFilter for BiquadDenoiser {
    fn filter_channel(&self, samples: &[f64]) -> ForceResult<Vec<f64>> {
        Ok(self
            .sections
            .iter()
            .fold(samples.to_vec(), |signal, section| section.run(&signal)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Filter every EMG channel of `table` independently
pub fn apply_denoise_filter(table: &SignalTable, filter: &dyn DenoiseFilter) -> ForceResult<SignalTable> {
    let mut emg = table.emg().clone();
    for (index, mut column) in emg.columns_mut().into_iter().enumerate() {
        let filtered = filter.filter_channel(&column.to_vec())?;
        if filtered.len() != column.len() {
            return Err(ForceError::shape_mismatch(
                &format!("{} output on channel {}", filter.name(), index + 1),
                column.len(),
                filtered.len(),
            ));
        }
        column.assign(&Array1::from(filtered));
    }
    table.with_emg(emg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    fn config() -> DenoiseConfig {
        DenoiseConfig {
            highpass_cutoff_hz: Some(20.0),
            notch_frequencies_hz: vec![50.0],
            notch_q: 30.0,
        }
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_highpass_removes_dc_offset() {
        let denoiser = BiquadDenoiser::new(&config(), 1000.0).unwrap();
        let out = denoiser.filter_channel(&vec![1.0; 2000]).unwrap();
        assert!(out[1999].abs() < 1e-3);
    }

    #[test]
    fn test_notch_attenuates_powerline() {
        let notch_only = DenoiseConfig {
            highpass_cutoff_hz: None,
            notch_frequencies_hz: vec![50.0],
            notch_q: 10.0,
        };
        let denoiser = BiquadDenoiser::new(&notch_only, 1000.0).unwrap();
        let hum: Vec<f64> = (0..4000).map(|i| (2.0 * PI * 50.0 * i as f64 / 1000.0).sin()).collect();
        let out = denoiser.filter_channel(&hum).unwrap();
        assert!(rms(&out[2000..]) < 0.1 * rms(&hum[2000..]));
    }

    #[test]
    fn test_invalid_frequencies() {
        let bad = DenoiseConfig {
            highpass_cutoff_hz: Some(600.0),
            notch_frequencies_hz: vec![],
            notch_q: 30.0,
        };
        assert!(BiquadDenoiser::new(&bad, 1000.0).is_err());
    }

    #[test]
    fn test_zero_highpass_cutoff_is_off() {
        let off = DenoiseConfig {
            highpass_cutoff_hz: Some(0.0),
            notch_frequencies_hz: vec![50.0, 60.0],
            notch_q: 30.0,
        };
        let denoiser = BiquadDenoiser::new(&off, 1000.0).unwrap();
        assert_eq!(denoiser.section_count(), 2);

        let negative = DenoiseConfig {
            highpass_cutoff_hz: Some(-5.0),
            ..off
        };
        assert!(BiquadDenoiser::new(&negative, 1000.0).is_err());
    }

    #[test]
    fn test_apply_preserves_timebase_and_force() {
        let n = 500;
        let table = SignalTable::new(
            (0..n).map(|i| i as f64 / 1000.0).collect(),
            Array2::from_shape_fn((n, 3), |(i, c)| (i as f64 * 0.1 * (c + 1) as f64).sin() + 1.0),
            Array2::from_shape_fn((n, 2), |(i, _)| i as f64),
            vec![1; n],
        )
        .unwrap();

        let denoiser = BiquadDenoiser::new(&config(), 1000.0).unwrap();
        let filtered = apply_denoise_filter(&table, &denoiser).unwrap();

        assert_eq!(filtered.len(), n);
        assert_eq!(filtered.timestamps(), table.timestamps());
        assert_eq!(filtered.force(), table.force());
        assert_ne!(filtered.emg(), table.emg());
    }

    #[test]
    fn test_channels_filtered_independently() {
        let n = 300;
        let base = Array2::from_shape_fn((n, 2), |(i, c)| if c == 0 { (i as f64 * 0.3).sin() } else { 0.0 });
        let table = SignalTable::new(
            (0..n).map(|i| i as f64).collect(),
            base,
            Array2::zeros((n, 1)),
            vec![0; n],
        )
        .unwrap();

        let denoiser = BiquadDenoiser::new(&config(), 1000.0).unwrap();
        let filtered = apply_denoise_filter(&table, &denoiser).unwrap();
        assert!(filtered.emg().column(1).iter().all(|&v| v == 0.0));
    }
}
