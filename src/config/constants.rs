// src/config/constants.rs
//! Pipeline-wide configuration constants

/// Recording signal constants
pub mod signal {
    /// putEMG amplifier sampling rate
    pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 5120.0;
    pub const DEFAULT_FORCE_FEATURE_NAME: &str = "FORCE";
    pub const DEFAULT_FORCE_CHANNEL_COUNT: usize = 10;
    pub const MIN_MVC_SAMPLES: usize = 256;
}

/// Windowing constants
pub mod windowing {
    pub const DEFAULT_WINDOW_LENGTH: usize = 256;
    pub const DEFAULT_WINDOW_STRIDE: usize = 32;
}

/// Denoising filter constants
pub mod filters {
    pub const DEFAULT_HIGHPASS_CUTOFF_HZ: f64 = 20.0;
    pub const POWERLINE_FREQUENCIES_HZ: &[f64] = &[50.0, 100.0, 150.0, 200.0, 250.0];
    pub const DEFAULT_NOTCH_Q: f64 = 30.0;
}

/// Cross-validation sweep constants
pub mod sweep {
    pub const DEFAULT_SPLIT_COUNT: usize = 3;
    pub const MLP_DEFAULT_HIDDEN_UNITS: i64 = 100;
}

/// File system paths and naming
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "emg_force.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";
    pub const ENV_PREFIX: &str = "EMG_FORCE_";
    pub const ENV_SECTION_SEPARATOR: &str = "__";

    pub const TABLE_EXTENSION: &str = "json";
    pub const FEATURE_FILE_SUFFIX: &str = "_features";
    pub const RESULT_FILE_PREFIX: &str = "force_learn";
}
