// src/processing/mod.rs
//! Recording processing: denoising, MVC normalisation and windowing

pub mod denoise;
pub mod normalization;
pub mod prepare;
pub mod signal;
pub mod statistics;
pub mod windowing;

pub use denoise::{apply_denoise_filter, BiquadDenoiser, DenoiseFilter};
pub use normalization::{build_calibration, normalize, CalibrationProfile, ChannelRange};
pub use prepare::{feature_file_name, prepare_recording, prepare_recordings, select_mvc, PreparationSummary};
pub use signal::SignalTable;
pub use statistics::WindowStatistic;
pub use windowing::{
    column_name, extract_feature_table, split_column_name, window_features, FeatureTable,
    FeatureWindow, WindowConfig,
};
