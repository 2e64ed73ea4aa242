// tests/common/mod.rs
//! Synthetic recordings shared by the integration tests
#![allow(dead_code)]

use emg_force::config::{
    ExperimentConfig, FeatureSetConfig, RegressorConfig, TrajectoryConfig,
};
use emg_force::processing::{column_name, FeatureTable, SignalTable, WindowConfig, WindowStatistic};
use emg_force::recording::RecordingIdentity;
use emg_force::storage::{JsonTableStore, TableStore};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

pub const EMG_CHANNELS: usize = 4;
pub const FORCE_CHANNELS: usize = 10;
pub const SAMPLE_RATE_HZ: f64 = 1000.0;
pub const DAY: &str = "2018-05-11";

/// `emg_force-<subject>-<protocol>-<day>-10-<minute>-00-000.json`
pub fn recording_name(subject: &str, protocol: &str, day: &str, minute: u32) -> String {
    format!("emg_force-{}-{}-{}-10-{:02}-00-000.json", subject, protocol, day, minute)
}

pub fn identity(subject: &str, day: &str, minute: u32) -> RecordingIdentity {
    RecordingIdentity::parse(recording_name(subject, "sequential", day, minute)).unwrap()
}

/// Force follows slow sinusoids; EMG is a 120 Hz carrier whose amplitude
/// tracks the force of its finger, plus a little noise
pub fn synthetic_signal(samples: usize, seed: u64) -> SignalTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let phase: f64 = rng.gen_range(0.0..1.0);
    let time: Vec<f64> = (0..samples).map(|i| i as f64 / SAMPLE_RATE_HZ).collect();

    let force = Array2::from_shape_fn((samples, FORCE_CHANNELS), |(i, c)| {
        20.0 + 15.0 * (2.0 * std::f64::consts::PI * 0.5 * time[i] + phase + c as f64).sin()
    });
    let emg = Array2::from_shape_fn((samples, EMG_CHANNELS), |(i, c)| {
        let amplitude = force[[i, 2 * c]] / 35.0;
        let carrier = (2.0 * std::f64::consts::PI * 120.0 * time[i] + c as f64).sin();
        amplitude * carrier + 0.01 * rng.gen_range(-1.0..1.0)
    });
    let labels = (0..samples).map(|i| (i / 500) as i64).collect();

    SignalTable::new(time, emg, force, labels).unwrap()
}

/// Feature table whose force columns depend linearly on the RMS columns
pub fn feature_table(rows: usize, seed: u64) -> FeatureTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns = Vec::new();
    for statistic in ["RMS", "WL"] {
        for channel in 1..=EMG_CHANNELS {
            columns.push(column_name(statistic, channel));
        }
    }
    for channel in 1..=FORCE_CHANNELS {
        columns.push(column_name("FORCE", channel));
    }

    let mut data = Array2::zeros((rows, columns.len()));
    for r in 0..rows {
        let rms: Vec<f64> = (0..EMG_CHANNELS).map(|_| rng.gen_range(0.0..1.0)).collect();
        for c in 0..EMG_CHANNELS {
            data[[r, c]] = rms[c];
            data[[r, EMG_CHANNELS + c]] = rms[c] * 3.0 + rng.gen_range(0.0..0.1);
        }
        for f in 0..FORCE_CHANNELS {
            let source = rms[f % EMG_CHANNELS];
            data[[r, 2 * EMG_CHANNELS + f]] = 0.8 * source + 0.05 * rng.gen_range(-1.0..1.0);
        }
    }

    FeatureTable::new(columns, data, vec![0; rows], (0..rows).collect()).unwrap()
}

/// Write `trials` feature tables for one subject and day
pub fn write_feature_tables(dir: &Path, subject: &str, day: &str, trials: u32, rows: usize) -> Vec<PathBuf> {
    let store = JsonTableStore::new();
    (0..trials)
        .map(|minute| {
            let name = recording_name(subject, "sequential", day, minute)
                .replace(".json", "_features.json");
            let path = dir.join(name);
            store
                .save_features(&feature_table(rows, minute as u64 + 17), &path)
                .unwrap();
            path
        })
        .collect()
}

/// Raw recordings plus one MVC for a subject and day
pub fn write_raw_recordings(dir: &Path, subject: &str, day: &str, trials: u32, samples: usize) {
    let store = JsonTableStore::new();
    for minute in 0..trials {
        let path = dir.join(recording_name(subject, "sequential", day, minute + 10));
        store.save_signal(&synthetic_signal(samples, minute as u64), &path).unwrap();
    }
    let mvc = dir.join(recording_name(subject, "mvc", day, 0));
    store.save_signal(&synthetic_signal(samples, 99), &mvc).unwrap();
}

/// Small, fast configuration: Index trajectory, RMS features, LR
pub fn test_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.preprocessing.sample_rate_hz = SAMPLE_RATE_HZ;
    config.preprocessing.window = WindowConfig::new(64, 32).unwrap();
    config.preprocessing.statistics = vec![WindowStatistic::Rms, WindowStatistic::Wl];
    config.preprocessing.denoise.notch_frequencies_hz = vec![50.0];
    config.sweep.trajectories = vec![TrajectoryConfig {
        id: "Index".to_string(),
        channels: vec![3, 4],
    }];
    config.sweep.feature_sets = vec![FeatureSetConfig {
        id: "RMS".to_string(),
        features: vec!["RMS".to_string()],
    }];
    config.sweep.regressors = vec![RegressorConfig {
        id: "LR".to_string(),
        predictor: "LR".to_string(),
        args: toml::Table::new(),
    }];
    config
}
