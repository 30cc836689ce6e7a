//! Quality and health scoring of a single source.

use streamscout_core::SourceMetadata;
use streamscout_core::config::{HealthScoring, RankingConfig};

use super::preferences::{AudioPreference, HdrPreference, UserSortingPreferences};

/// Swarm health in `0.0..=100.0`.
///
/// Sources without swarm data get the configured neutral value; dead
/// sources score 0.
pub fn health_score(source: &SourceMetadata, scoring: &HealthScoring) -> f64 {
    let Some(seeders) = source.health.seeders else {
        return scoring.unknown_health;
    };
    if seeders == 0 {
        return 0.0;
    }

    let saturation = f64::from(scoring.saturation_seeders.max(1));
    let logarithmic = (f64::from(seeders).ln_1p() / saturation.ln_1p()).min(1.0);
    let mut score = logarithmic * scoring.seeder_points;

    score += match source.health.leechers {
        Some(0) => scoring.strong_ratio_bonus,
        Some(leechers) => {
            let ratio = f64::from(seeders) / f64::from(leechers);
            if ratio >= 2.0 {
                scoring.strong_ratio_bonus
            } else if ratio >= 1.0 {
                scoring.even_ratio_bonus
            } else {
                0.0
            }
        }
        None => 0.0,
    };

    if let Some(availability) = source.health.availability {
        score += f64::from(availability.clamp(0.0, 1.0)) * scoring.availability_points;
    }

    score
}

/// Preference weighted quality score.
///
/// Resolution base, HDR, codec, audio and release bonuses, half the health
/// score, provider reliability and closeness to the preferred file size.
pub fn quality_score(source: &SourceMetadata, preferences: &UserSortingPreferences, config: &RankingConfig) -> f64 {
    let scaling = &config.preferences;

    let resolution = resolution_score(source, preferences, config);

    let hdr_bonus = f64::from(hdr_bonus(source, config));
    let hdr = match preferences.hdr {
        HdrPreference::Any => hdr_bonus,
        HdrPreference::Prefer => hdr_bonus * scaling.preferred_hdr_weight,
        HdrPreference::Avoid => -hdr_bonus,
    };

    let codec_weight = set_weight(
        preferences.preferred_codecs.is_empty(),
        preferences.preferred_codecs.contains(&source.codec.codec),
        scaling.matching_weight,
        scaling.other_weight,
    );
    let codec = f64::from(source.codec.efficiency_bonus) * codec_weight;

    let audio_weight = match preferences.audio {
        AudioPreference::Any => 1.0,
        AudioPreference::Surround if source.audio.format.is_surround() => scaling.matching_weight,
        AudioPreference::Surround => scaling.other_weight,
        AudioPreference::Stereo if source.audio.format.is_surround() => scaling.other_weight,
        AudioPreference::Stereo => scaling.matching_weight,
    };
    let audio = f64::from(source.audio.quality_bonus) * audio_weight;

    let release_weight = set_weight(
        preferences.preferred_release_types.is_empty(),
        preferences.preferred_release_types.contains(&source.release.kind),
        scaling.matching_weight,
        scaling.other_weight,
    );
    let release = f64::from(source.release.quality_bonus) * release_weight;

    let health = health_score(source, &config.health) / 2.0;
    let reliability = f64::from(source.provider.reliability.ordinal()) * config.reliability_points;

    let size = match (preferences.file_size, source.file.size_bytes) {
        (Some(preference), Some(size)) if preference.target_bytes > 0 => {
            let relative = preference.distance(size) as f64 / preference.target_bytes as f64;
            (1.0 - relative).max(0.0) * scaling.size_match_points * preference.weight
        }
        _ => 0.0,
    };

    resolution + hdr + codec + audio + release + health + reliability + size
}

/// Largest applicable dynamic range bonus.
pub fn hdr_bonus(source: &SourceMetadata, config: &RankingConfig) -> u32 {
    let bonuses = &config.hdr_bonuses;
    let quality = &source.quality;
    [
        (quality.dolby_vision, bonuses.dolby_vision),
        (quality.hdr10_plus, bonuses.hdr10_plus),
        (quality.hdr10, bonuses.hdr10),
    ]
    .into_iter()
    .filter_map(|(present, bonus)| present.then_some(bonus))
    .max()
    .unwrap_or(0)
}

fn resolution_score(source: &SourceMetadata, preferences: &UserSortingPreferences, config: &RankingConfig) -> f64 {
    let scores = &config.resolution_scores;
    let actual = source.quality.resolution;
    match (preferences.preferred_resolution, actual.tier()) {
        (Some(preferred), Some(actual_tier)) => match preferred.tier() {
            Some(preferred_tier) => {
                let steps = f64::from(actual_tier.abs_diff(preferred_tier));
                f64::from(scores.score_for(preferred)) - steps * config.preferences.resolution_step_penalty
            }
            None => f64::from(scores.score_for(actual)),
        },
        _ => f64::from(scores.score_for(actual)),
    }
}

fn set_weight(no_preference: bool, matches: bool, matching: f64, other: f64) -> f64 {
    if no_preference {
        1.0
    } else if matches {
        matching
    } else {
        other
    }
}
