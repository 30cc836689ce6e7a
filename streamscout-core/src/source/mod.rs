//! Streaming source descriptions consumed by the ranking engine.
//!
//! A [`SourceMetadata`] describes one playable file offered by one provider:
//! where it comes from, its encode (resolution, dynamic range, codecs),
//! its release lineage, swarm health for peer-to-peer sources and whether a
//! debrid service already caches it.

pub mod release;

use serde::{Deserialize, Serialize};

pub use release::ReleaseName;

/// Vertical resolution tier of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Unknown,
    /// Anything below 480 lines
    Sd,
    P480,
    P720,
    P1080,
    P2160,
}

impl Resolution {
    /// Position on the resolution ladder; `None` when unknown.
    pub fn tier(&self) -> Option<u8> {
        match self {
            Resolution::Unknown => None,
            Resolution::Sd => Some(0),
            Resolution::P480 => Some(1),
            Resolution::P720 => Some(2),
            Resolution::P1080 => Some(3),
            Resolution::P2160 => Some(4),
        }
    }

    /// Known resolution strictly below 480p.
    pub fn is_below_480p(&self) -> bool {
        matches!(self, Resolution::Sd)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sd" => Ok(Resolution::Sd),
            "480p" | "576p" => Ok(Resolution::P480),
            "720p" => Ok(Resolution::P720),
            "1080p" => Ok(Resolution::P1080),
            "2160p" | "4k" | "uhd" => Ok(Resolution::P2160),
            other => Err(format!("unknown resolution '{other}'")),
        }
    }
}

/// How a provider delivers its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Plain HTTP stream
    Direct,
    /// BitTorrent swarm
    PeerToPeer,
    /// Premium host that downloads server side
    Debrid,
}

/// Observed reliability of a source provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityTier {
    #[default]
    Unknown = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Premium = 4,
}

impl ReliabilityTier {
    /// Ordinal in `0..=4`.
    pub fn ordinal(&self) -> u32 {
        *self as u32
    }

    /// Medium reliability or better.
    pub fn is_trusted(&self) -> bool {
        *self >= ReliabilityTier::Medium
    }
}

/// Provider that produced a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProvider {
    pub id: String,
    pub name: String,
    pub kind: ProviderKind,
    pub reliability: ReliabilityTier,
}

/// Picture quality of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityInfo {
    pub resolution: Resolution,
    pub hdr10: bool,
    pub hdr10_plus: bool,
    pub dolby_vision: bool,
}

impl QualityInfo {
    /// Any high dynamic range format present.
    pub fn is_hdr(&self) -> bool {
        self.hdr10 || self.hdr10_plus || self.dolby_vision
    }
}

/// Video codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    Av1,
    Hevc,
    Vp9,
    H264,
    Xvid,
    #[default]
    Unknown,
}

impl VideoCodec {
    /// Compression efficiency bonus in `0..=50`.
    pub fn efficiency_bonus(&self) -> u32 {
        match self {
            VideoCodec::Av1 => 50,
            VideoCodec::Hevc => 40,
            VideoCodec::Vp9 => 30,
            VideoCodec::H264 => 20,
            VideoCodec::Xvid => 5,
            VideoCodec::Unknown => 0,
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "av1" => Ok(VideoCodec::Av1),
            "hevc" | "x265" | "h265" => Ok(VideoCodec::Hevc),
            "vp9" => Ok(VideoCodec::Vp9),
            "avc" | "x264" | "h264" => Ok(VideoCodec::H264),
            "xvid" | "divx" => Ok(VideoCodec::Xvid),
            other => Err(format!("unknown codec '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecInfo {
    pub codec: VideoCodec,
    pub efficiency_bonus: u32,
}

impl CodecInfo {
    /// Codec with its table bonus.
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            codec,
            efficiency_bonus: codec.efficiency_bonus(),
        }
    }
}

/// Audio track format, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Atmos,
    TrueHd,
    DtsHdMa,
    Dts,
    DolbyDigitalPlus,
    DolbyDigital,
    Aac,
    #[default]
    Unknown,
}

impl AudioFormat {
    /// Audio quality bonus in `0..=50`.
    pub fn quality_bonus(&self) -> u32 {
        match self {
            AudioFormat::Atmos => 50,
            AudioFormat::TrueHd | AudioFormat::DtsHdMa => 45,
            AudioFormat::Dts => 30,
            AudioFormat::DolbyDigitalPlus => 25,
            AudioFormat::DolbyDigital => 20,
            AudioFormat::Aac => 10,
            AudioFormat::Unknown => 0,
        }
    }

    /// Multichannel, high bitrate formats.
    pub fn is_surround(&self) -> bool {
        !matches!(self, AudioFormat::Aac | AudioFormat::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioInfo {
    pub format: AudioFormat,
    pub quality_bonus: u32,
}

impl AudioInfo {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            quality_bonus: format.quality_bonus(),
        }
    }
}

/// Origin of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    Remux,
    BluRay,
    WebDl,
    WebRip,
    Hdtv,
    Dvd,
    Cam,
    #[default]
    Unknown,
}

impl ReleaseType {
    /// Source quality bonus in `0..=100`.
    pub fn quality_bonus(&self) -> u32 {
        match self {
            ReleaseType::Remux => 100,
            ReleaseType::BluRay => 80,
            ReleaseType::WebDl => 70,
            ReleaseType::WebRip => 55,
            ReleaseType::Hdtv => 35,
            ReleaseType::Dvd => 25,
            ReleaseType::Unknown => 10,
            ReleaseType::Cam => 0,
        }
    }
}

impl std::str::FromStr for ReleaseType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "").as_str() {
            "remux" => Ok(ReleaseType::Remux),
            "bluray" => Ok(ReleaseType::BluRay),
            "webdl" => Ok(ReleaseType::WebDl),
            "webrip" => Ok(ReleaseType::WebRip),
            "hdtv" => Ok(ReleaseType::Hdtv),
            "dvd" => Ok(ReleaseType::Dvd),
            "cam" => Ok(ReleaseType::Cam),
            other => Err(format!("unknown release type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub kind: ReleaseType,
    /// Scene or P2P group that produced the encode
    pub group: Option<String>,
    pub quality_bonus: u32,
}

impl ReleaseInfo {
    pub fn new(kind: ReleaseType, group: Option<String>) -> Self {
        Self {
            kind,
            group,
            quality_bonus: kind.quality_bonus(),
        }
    }
}

/// Swarm statistics, only meaningful for peer-to-peer sources.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthInfo {
    pub seeders: Option<u32>,
    pub leechers: Option<u32>,
    /// Fraction of pieces available in the swarm, `0.0..=1.0`
    pub availability: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Availability {
    /// Fully downloaded on a debrid service and instantly playable
    pub cached: bool,
    pub debrid_service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileInfo {
    pub size_bytes: Option<u64>,
    pub name: Option<String>,
}

/// Fully described streaming source supplied by a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub id: String,
    pub provider: SourceProvider,
    pub quality: QualityInfo,
    pub codec: CodecInfo,
    pub audio: AudioInfo,
    pub release: ReleaseInfo,
    pub health: HealthInfo,
    pub availability: Availability,
    pub file: FileInfo,
}

impl SourceMetadata {
    /// Creates a source with unknown encode details.
    pub fn new(id: impl Into<String>, provider: SourceProvider) -> Self {
        Self {
            id: id.into(),
            provider,
            quality: QualityInfo::default(),
            codec: CodecInfo::default(),
            audio: AudioInfo::default(),
            release: ReleaseInfo::new(ReleaseType::Unknown, None),
            health: HealthInfo::default(),
            availability: Availability::default(),
            file: FileInfo::default(),
        }
    }

    /// Creates a source whose encode details are parsed from a release name.
    pub fn from_release_name(id: impl Into<String>, provider: SourceProvider, name: &str) -> Self {
        let parsed = ReleaseName::parse(name);
        let mut source = Self::new(id, provider);
        source.quality = parsed.quality;
        source.codec = CodecInfo::new(parsed.codec);
        source.audio = AudioInfo::new(parsed.audio);
        source.release = ReleaseInfo::new(parsed.release_type, parsed.group);
        source.file.name = Some(name.to_string());
        source
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.quality.resolution = resolution;
        self
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = CodecInfo::new(codec);
        self
    }

    pub fn with_audio(mut self, format: AudioFormat) -> Self {
        self.audio = AudioInfo::new(format);
        self
    }

    pub fn with_release(mut self, kind: ReleaseType, group: Option<&str>) -> Self {
        self.release = ReleaseInfo::new(kind, group.map(str::to_string));
        self
    }

    pub fn with_swarm(mut self, seeders: u32, leechers: u32) -> Self {
        self.health.seeders = Some(seeders);
        self.health.leechers = Some(leechers);
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.file.size_bytes = Some(size_bytes);
        self
    }

    pub fn cached_on(mut self, service: impl Into<String>) -> Self {
        self.availability.cached = true;
        self.availability.debrid_service = Some(service.into());
        self
    }

    /// Zero seeders: nobody can serve the file.
    pub fn is_dead(&self) -> bool {
        self.health.seeders == Some(0)
    }

    pub fn is_cached(&self) -> bool {
        self.availability.cached
    }

    pub fn is_peer_to_peer(&self) -> bool {
        self.provider.kind == ProviderKind::PeerToPeer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SourceProvider {
        SourceProvider {
            id: "swarm".to_string(),
            name: "Swarm".to_string(),
            kind: ProviderKind::PeerToPeer,
            reliability: ReliabilityTier::High,
        }
    }

    #[test]
    fn test_dead_source_detection() {
        let dead = SourceMetadata::new("a", provider()).with_swarm(0, 12);
        let alive = SourceMetadata::new("b", provider()).with_swarm(1, 12);
        let unknown = SourceMetadata::new("c", provider());

        assert!(dead.is_dead());
        assert!(!alive.is_dead());
        assert!(!unknown.is_dead());
    }

    #[test]
    fn test_from_release_name_fills_descriptors() {
        let source = SourceMetadata::from_release_name(
            "a",
            provider(),
            "Dune.Part.Two.2024.2160p.BluRay.REMUX.DV.HDR.HEVC.TrueHD.Atmos.7.1-FraMeSToR",
        );

        assert_eq!(source.quality.resolution, Resolution::P2160);
        assert!(source.quality.dolby_vision);
        assert_eq!(source.codec.efficiency_bonus, 40);
        assert_eq!(source.audio.format, AudioFormat::Atmos);
        assert_eq!(source.release.kind, ReleaseType::Remux);
        assert_eq!(source.release.quality_bonus, 100);
        assert_eq!(source.release.group.as_deref(), Some("FraMeSToR"));
    }

    #[test]
    fn test_resolution_ladder() {
        assert!(Resolution::P2160 > Resolution::P1080);
        assert_eq!(Resolution::Unknown.tier(), None);
        assert!(Resolution::Sd.is_below_480p());
        assert!(!Resolution::Unknown.is_below_480p());
        assert_eq!("4k".parse::<Resolution>(), Ok(Resolution::P2160));
    }
}
