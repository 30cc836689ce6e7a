//! User preferences that reweight the quality score.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use streamscout_core::Resolution;
use streamscout_core::source::{ReleaseType, VideoCodec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HdrPreference {
    #[default]
    Any,
    Prefer,
    /// HDR counts against a source (SDR-only displays)
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPreference {
    #[default]
    Any,
    Surround,
    Stereo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachedPreference {
    /// Cached sources first, others follow
    #[default]
    PreferCached,
    /// Only cached sources, unless none is cached
    CachedOnly,
}

/// Target file size and how strongly closeness to it counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileSizePreference {
    pub target_bytes: u64,
    /// Multiplier on the size closeness points
    pub weight: f64,
}

impl FileSizePreference {
    pub fn new(target_bytes: u64) -> Self {
        Self {
            target_bytes,
            weight: 1.0,
        }
    }

    /// Target expressed in gigabytes (10^9 bytes).
    pub fn gigabytes(target: f64) -> Self {
        Self::new((target.max(0.0) * 1_000_000_000.0) as u64)
    }

    /// Absolute distance between `size_bytes` and the target.
    pub fn distance(&self, size_bytes: u64) -> u64 {
        size_bytes.abs_diff(self.target_bytes)
    }
}

/// How one user wants sources ordered.
///
/// Preferences shift the quality score; they never override the
/// dead-last or cached-first rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSortingPreferences {
    pub preferred_resolution: Option<Resolution>,
    /// Empty means no codec preference
    pub preferred_codecs: BTreeSet<VideoCodec>,
    /// Empty means no release type preference
    pub preferred_release_types: BTreeSet<ReleaseType>,
    pub hdr: HdrPreference,
    pub audio: AudioPreference,
    pub cached: CachedPreference,
    pub file_size: Option<FileSizePreference>,
}

impl UserSortingPreferences {
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.preferred_resolution = Some(resolution);
        self
    }

    pub fn with_codecs(mut self, codecs: impl IntoIterator<Item = VideoCodec>) -> Self {
        self.preferred_codecs = codecs.into_iter().collect();
        self
    }

    pub fn with_release_types(mut self, kinds: impl IntoIterator<Item = ReleaseType>) -> Self {
        self.preferred_release_types = kinds.into_iter().collect();
        self
    }

    pub fn with_hdr(mut self, hdr: HdrPreference) -> Self {
        self.hdr = hdr;
        self
    }

    pub fn with_audio(mut self, audio: AudioPreference) -> Self {
        self.audio = audio;
        self
    }

    pub fn cached_only(mut self) -> Self {
        self.cached = CachedPreference::CachedOnly;
        self
    }

    pub fn with_file_size(mut self, file_size: FileSizePreference) -> Self {
        self.file_size = Some(file_size);
        self
    }
}
