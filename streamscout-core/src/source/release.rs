//! Scene-style release name parsing.
//!
//! Extracts encode details from names like
//! `Inception.2010.1080p.BluRay.x264.DTS-GROUP` so adapters that only know
//! a file name can still produce a fully described source.

use std::sync::LazyLock;

use regex::Regex;

use super::{AudioFormat, QualityInfo, ReleaseType, Resolution, VideoCodec};

fn pattern(expression: &str) -> Regex {
    Regex::new(expression).expect("release name patterns are static and valid")
}

static RES_2160: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(2160p|4k|uhd)\b"));
static RES_1080: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b1080[pi]\b"));
static RES_720: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b720p\b"));
static RES_480: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(480p|576p)\b"));
static RES_SD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(360p|240p)\b"));

static DOLBY_VISION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)\b(dv|dovi|dolby[ .]?vision)\b"));
static HDR10_PLUS: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bhdr10(\+|plus)"));
static HDR: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bhdr(10)?\b"));

static AV1: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bav1\b"));
static HEVC: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(x265|h\.?265|hevc)\b"));
static VP9: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bvp9\b"));
static H264: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(x264|h\.?264|avc)\b"));
static XVID: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(xvid|divx)\b"));

static ATMOS: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\batmos\b"));
static TRUEHD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\btruehd\b"));
static DTS_HD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bdts-?(hd|x)"));
static DTS: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bdts\b"));
static DD_PLUS: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(ddp|dd\+|e-?ac-?3)"));
static DD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(dd|ac-?3)(\d|\b)"));
static AAC: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\baac"));

static REMUX: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bremux\b"));
static BLURAY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(blu-?ray|bdrip|brrip)\b"));
static WEB_DL: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bweb-?dl\b"));
static WEB_RIP: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\b(webrip|web)\b"));
static HDTV: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bhdtv\b"));
static DVD: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)\bdvd(rip|r|5|9)?\b"));
static CAM: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)\b(cam|camrip|hdcam|ts|hdts|telesync)\b"));

static SUFFIX_GROUP: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"-([A-Za-z0-9]+)(?:\.(?:mkv|mp4|avi|m4v|ts))?$"));
static PREFIX_GROUP: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\[([^\]]+)\]"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(19\d{2}|20\d{2})\b"));

/// Encode details recovered from a release name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseName {
    /// Title portion before the year or resolution, dots replaced by spaces
    pub title: String,
    pub year: Option<u16>,
    pub quality: QualityInfo,
    pub codec: VideoCodec,
    pub audio: AudioFormat,
    pub release_type: ReleaseType,
    pub group: Option<String>,
}

impl ReleaseName {
    /// Parses a release name. Unrecognized parts stay at their defaults.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        let resolution_match = [&RES_2160, &RES_1080, &RES_720, &RES_480, &RES_SD]
            .iter()
            .find_map(|regex| regex.find(name));

        let resolution = if RES_2160.is_match(name) {
            Resolution::P2160
        } else if RES_1080.is_match(name) {
            Resolution::P1080
        } else if RES_720.is_match(name) {
            Resolution::P720
        } else if RES_480.is_match(name) {
            Resolution::P480
        } else if RES_SD.is_match(name) {
            Resolution::Sd
        } else {
            Resolution::Unknown
        };

        let quality = QualityInfo {
            resolution,
            hdr10: HDR.is_match(name),
            hdr10_plus: HDR10_PLUS.is_match(name),
            dolby_vision: DOLBY_VISION.is_match(name),
        };

        let prefix_group = PREFIX_GROUP.captures(name).map(|caps| caps[1].to_string());
        let group = prefix_group.clone().or_else(|| {
            SUFFIX_GROUP
                .captures(name)
                .map(|caps| caps[1].to_string())
        });

        let year_match = YEAR.find(name);
        let year = year_match.and_then(|m| m.as_str().parse().ok());

        let title_end = [year_match.map(|m| m.start()), resolution_match.map(|m| m.start())]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(name.len());
        let title_start = PREFIX_GROUP.find(name).map(|m| m.end()).unwrap_or(0);
        let title = if title_start < title_end {
            clean_title(&name[title_start..title_end])
        } else {
            String::new()
        };

        Self {
            title,
            year,
            quality,
            codec: detect_codec(name),
            audio: detect_audio(name),
            release_type: detect_release_type(name),
            group,
        }
    }
}

fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == '(' || c.is_whitespace())
        .to_string()
}

fn detect_codec(name: &str) -> VideoCodec {
    if AV1.is_match(name) {
        VideoCodec::Av1
    } else if HEVC.is_match(name) {
        VideoCodec::Hevc
    } else if VP9.is_match(name) {
        VideoCodec::Vp9
    } else if H264.is_match(name) {
        VideoCodec::H264
    } else if XVID.is_match(name) {
        VideoCodec::Xvid
    } else {
        VideoCodec::Unknown
    }
}

fn detect_audio(name: &str) -> AudioFormat {
    if ATMOS.is_match(name) {
        AudioFormat::Atmos
    } else if TRUEHD.is_match(name) {
        AudioFormat::TrueHd
    } else if DTS_HD.is_match(name) {
        AudioFormat::DtsHdMa
    } else if DTS.is_match(name) {
        AudioFormat::Dts
    } else if DD_PLUS.is_match(name) {
        AudioFormat::DolbyDigitalPlus
    } else if DD.is_match(name) {
        AudioFormat::DolbyDigital
    } else if AAC.is_match(name) {
        AudioFormat::Aac
    } else {
        AudioFormat::Unknown
    }
}

fn detect_release_type(name: &str) -> ReleaseType {
    if REMUX.is_match(name) {
        ReleaseType::Remux
    } else if BLURAY.is_match(name) {
        ReleaseType::BluRay
    } else if WEB_DL.is_match(name) {
        ReleaseType::WebDl
    } else if WEB_RIP.is_match(name) {
        ReleaseType::WebRip
    } else if HDTV.is_match(name) {
        ReleaseType::Hdtv
    } else if DVD.is_match(name) {
        ReleaseType::Dvd
    } else if CAM.is_match(name) {
        ReleaseType::Cam
    } else {
        ReleaseType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bluray_encode() {
        let parsed = ReleaseName::parse("The.Matrix.1999.1080p.BluRay.x264.DTS-SPARKS");

        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));
        assert_eq!(parsed.quality.resolution, Resolution::P1080);
        assert!(!parsed.quality.is_hdr());
        assert_eq!(parsed.codec, VideoCodec::H264);
        assert_eq!(parsed.audio, AudioFormat::Dts);
        assert_eq!(parsed.release_type, ReleaseType::BluRay);
        assert_eq!(parsed.group.as_deref(), Some("SPARKS"));
    }

    #[test]
    fn test_parse_web_dl_with_hdr10_plus() {
        let parsed = ReleaseName::parse("Severance.S02E01.2160p.WEB-DL.DDP5.1.HDR10+.HEVC-FLUX.mkv");

        assert_eq!(parsed.title, "Severance S02E01");
        assert_eq!(parsed.quality.resolution, Resolution::P2160);
        assert!(parsed.quality.hdr10_plus);
        assert_eq!(parsed.audio, AudioFormat::DolbyDigitalPlus);
        assert_eq!(parsed.release_type, ReleaseType::WebDl);
        assert_eq!(parsed.codec, VideoCodec::Hevc);
        assert_eq!(parsed.group.as_deref(), Some("FLUX"));
    }

    #[test]
    fn test_parse_anime_prefix_group() {
        let parsed = ReleaseName::parse("[SubsPlease] Frieren - 12 (720p) [ABCD1234].mkv");

        assert_eq!(parsed.group.as_deref(), Some("SubsPlease"));
        assert_eq!(parsed.title, "Frieren - 12");
        assert_eq!(parsed.quality.resolution, Resolution::P720);
    }

    #[test]
    fn test_parse_cam_release() {
        let parsed = ReleaseName::parse("Some.Movie.2024.HDCAM.x264-NoGroup");

        assert_eq!(parsed.release_type, ReleaseType::Cam);
        assert_eq!(parsed.quality.resolution, Resolution::Unknown);
    }

    #[test]
    fn test_parse_unrecognized_name() {
        let parsed = ReleaseName::parse("home video");

        assert_eq!(parsed.title, "home video");
        assert_eq!(parsed.release_type, ReleaseType::Unknown);
        assert_eq!(parsed.codec, VideoCodec::Unknown);
        assert_eq!(parsed.group, None);
    }
}
