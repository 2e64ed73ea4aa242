// src/recording/mod.rs
//! Recording identities and selection

pub mod filter;
pub mod identity;

pub use filter::{filter, AttributeLists, RecordAttribute, RecordFilter};
pub use identity::{RecordingIdentity, RecordingKind, NAME_FIELD_COUNT};

use std::path::Path;
use tracing::warn;

/// Parse many paths, skipping (and logging) malformed names
pub fn parse_all<P: AsRef<Path>>(paths: &[P]) -> Vec<RecordingIdentity> {
    paths
        .iter()
        .filter_map(|path| match RecordingIdentity::parse(path) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Skipping recording: {}", e);
                None
            }
        })
        .collect()
}
