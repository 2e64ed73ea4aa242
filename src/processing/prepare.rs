// src/processing/prepare.rs
//! Preparation stage: raw recording tables to windowed feature tables
//!
//! Each RAW recording is denoised, its force channels are normalised against
//! the subject's MVC calibration, and the result is windowed into a
//! `<stem>_features` table. The MVC recorded on the same day is preferred;
//! without one the subject's earliest MVC is used.

use super::denoise::{apply_denoise_filter, BiquadDenoiser, DenoiseFilter};
use super::normalization::{build_calibration, normalize, CalibrationProfile};
use super::signal::SignalTable;
use super::windowing::{extract_feature_table, FeatureTable};
use crate::config::{constants::paths, ExperimentConfig, PreprocessingConfig};
use crate::error::{ForceError, ForceResult, IntoForceError};
use crate::recording::{parse_all, RecordingIdentity, RecordingKind};
use crate::storage::{list_files, TableStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a preparation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparationSummary {
    pub prepared: Vec<PathBuf>,
    pub skipped: Vec<(RecordingIdentity, String)>,
}

/// `<stem>_features.<ext>`
pub fn feature_file_name(record: &RecordingIdentity, extension: &str) -> String {
    format!("{}{}.{}", record.to_file_stem(), paths::FEATURE_FILE_SUFFIX, extension)
}

/// Denoise, normalise and window one recording
pub fn prepare_recording(
    raw: &SignalTable,
    profile: &CalibrationProfile,
    denoiser: &dyn DenoiseFilter,
    config: &PreprocessingConfig,
) -> ForceResult<FeatureTable> {
    let filtered = apply_denoise_filter(raw, denoiser)?;
    let normalized = normalize(&filtered, profile)?;
    extract_feature_table(
        &normalized,
        &config.window,
        &config.statistics,
        &config.force_feature_name,
    )
}

/// MVC recording used to calibrate `record`
///
/// Prefers the subject's MVC from the same day. Unless `same_day_only` is
/// set, falls back to the subject's earliest MVC.
pub fn select_mvc<'a>(
    record: &RecordingIdentity,
    mvcs: &'a [RecordingIdentity],
    same_day_only: bool,
) -> Option<&'a RecordingIdentity> {
    let mut candidates: Vec<&RecordingIdentity> = mvcs
        .iter()
        .filter(|m| m.kind() == RecordingKind::Mvc && m.subject_id() == record.subject_id())
        .collect();
    candidates.sort();
    if let Some(same_day) = candidates.iter().find(|m| m.day() == record.day()) {
        return Some(*same_day);
    }
    if same_day_only {
        return None;
    }
    let fallback = candidates.first().copied()?;
    warn!(
        "No MVC on {} for subject {}: calibrating {} against {}",
        record.day_token(),
        record.subject_id(),
        record,
        fallback
    );
    Some(fallback)
}

/// Calibration profiles, built once per MVC recording
struct CalibrationCache<'a> {
    store: &'a dyn TableStore,
    min_samples: usize,
    profiles: BTreeMap<RecordingIdentity, Result<CalibrationProfile, String>>,
}

impl<'a> CalibrationCache<'a> {
    fn profile(&mut self, mvc: &RecordingIdentity) -> ForceResult<&CalibrationProfile> {
        let store = self.store;
        let min_samples = self.min_samples;
        let entry = self.profiles.entry(mvc.clone()).or_insert_with(|| {
            info!("Building calibration from {}", mvc);
            store
                .load_signal(Path::new(mvc.raw_path()))
                .and_then(|table| build_calibration(&table, min_samples))
                .map_err(|e| e.to_string())
        });
        entry.as_ref().map_err(|reason| ForceError::Calibration {
            reason: format!("{}: {}", mvc, reason),
        })
    }
}

/// Prepare every RAW recording of `input_dir` into `output_dir`
///
/// Recording-level failures are logged and reported in the summary; only
/// configuration and folder errors abort the pass.
pub fn prepare_recordings(
    config: &ExperimentConfig,
    input_dir: &Path,
    output_dir: &Path,
    store: &dyn TableStore,
) -> ForceResult<PreparationSummary> {
    config.validate()?;
    let pre = &config.preprocessing;
    let denoiser = BiquadDenoiser::new(&pre.denoise, pre.sample_rate_hz)?;
    std::fs::create_dir_all(output_dir).storage_err(output_dir)?;

    let records = parse_all(list_files(input_dir, store.extension())?.as_slice());
    let (mvcs, others): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.kind() == RecordingKind::Mvc);
    let raw: Vec<RecordingIdentity> = others.into_iter().filter(|r| r.is_raw()).collect();
    let selected = config.filter.apply(&raw)?;
    info!(
        "Preparing {} of {} RAW recordings ({} MVC available) with {}",
        selected.len(),
        raw.len(),
        mvcs.len(),
        denoiser.name()
    );

    let mut cache = CalibrationCache {
        store,
        min_samples: pre.min_mvc_samples,
        profiles: BTreeMap::new(),
    };
    let mut summary = PreparationSummary::default();

    for record in &selected {
        let result = select_mvc(record, &mvcs, pre.require_same_day_mvc)
            .ok_or_else(|| ForceError::Calibration {
                reason: if pre.require_same_day_mvc {
                    format!(
                        "no MVC recording for subject {} on {}",
                        record.subject_id(),
                        record.day_token()
                    )
                } else {
                    format!("no MVC recording for subject {}", record.subject_id())
                },
            })
            .and_then(|mvc| cache.profile(mvc).cloned())
            .and_then(|profile| {
                let raw_table = store.load_signal(Path::new(record.raw_path()))?;
                prepare_recording(&raw_table, &profile, &denoiser, pre)
            })
            .and_then(|features| {
                let path = output_dir.join(feature_file_name(record, store.extension()));
                store.save_features(&features, &path)?;
                Ok(path)
            });

        match result {
            Ok(path) => {
                info!("Prepared {}", path.display());
                summary.prepared.push(path);
            }
            Err(e) if e.is_contained() => {
                warn!("Skipping recording {}: {}", record, e);
                summary.skipped.push((record.clone(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}
