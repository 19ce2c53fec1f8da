use crate::value::{OfTotal, Picture};
use serde::Serialize;

/// A gain value expressed both ways; spec.md §3 invariant:
/// `ratio = 10^(dB/20)`, kept consistent to within `1e-3` (spec.md §8
/// property 6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gain {
    pub db: f64,
    pub ratio: f64,
}

impl Gain {
    pub fn from_db(db: f64) -> Self {
        Gain {
            db,
            ratio: ratio_from_db(db),
        }
    }

    pub fn from_ratio(ratio: f64) -> Self {
        Gain {
            db: db_from_ratio(ratio),
            ratio,
        }
    }
}

/// `ratio = 10^(dB/20)` (spec.md §4.5 `ratio-from-db` coercion).
pub fn ratio_from_db(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// `dB = 20 * log10(ratio)` (spec.md §4.5 `db-from-ratio` coercion).
pub fn db_from_ratio(ratio: f64) -> f64 {
    20.0 * ratio.log10()
}

/// `rating_to_stars(r ∈ [0,1]) -> integer in {1..5}` = `1 + round(r * 4)`;
/// undefined input (out of range or non-finite) maps to `0` (spec.md §6).
pub fn rating_to_stars(rating: f64) -> u8 {
    if !(0.0..=1.0).contains(&rating) || rating.is_nan() {
        return 0;
    }
    (1.0 + (rating * 4.0).round()) as u8
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayGain {
    pub track_gain: Option<Gain>,
    pub track_peak: Option<f64>,
    pub album_gain: Option<Gain>,
    pub album_peak: Option<f64>,
    pub reference_loudness: Option<f64>,
    /// The "undo" pair some encoders store so a previously applied gain can
    /// be reverted: `(gain applied in dB, peak before gain was applied)`.
    pub undo: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MusicBrainzIds {
    pub track_id: Option<String>,
    pub release_id: Option<String>,
    pub artist_id: Vec<String>,
    pub release_artist_id: Vec<String>,
    pub release_group_id: Option<String>,
    pub work_id: Option<String>,
    pub disc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingEntry {
    pub source: Option<String>,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PodcastInfo {
    pub is_podcast: bool,
    pub url: Option<String>,
    pub episode_guid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TvInfo {
    pub show: Option<String>,
    pub network: Option<String>,
    pub episode: Option<u32>,
    pub season: Option<u32>,
}

/// Format-independent, normalized metadata record (spec.md §3 "Common
/// view"). Most fields are scalars; fields whose semantics permit multiple
/// occurrences are sequences.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommonView {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub artists: Vec<String>,
    pub albumartist: Option<String>,
    pub album: Option<String>,

    pub year: Option<i32>,
    pub date: Option<String>,
    pub originaldate: Option<String>,

    pub track: OfTotal,
    pub disk: OfTotal,

    pub genre: Vec<String>,
    pub picture: Vec<Picture>,
    pub comment: Option<String>,
    pub composer: Vec<String>,
    pub lyrics: Option<String>,

    pub sort_title: Option<String>,
    pub sort_artist: Option<String>,
    pub sort_album: Option<String>,
    pub sort_albumartist: Option<String>,
    pub sort_composer: Option<String>,

    pub work: Option<String>,
    pub contributors: Vec<Contributor>,

    pub ratings: Vec<RatingEntry>,
    pub bpm: Option<f64>,
    pub mood: Option<String>,
    pub media: Option<String>,
    pub catalog_number: Vec<String>,

    pub tv: TvInfo,
    pub podcast: PodcastInfo,

    pub release_status: Option<String>,
    pub release_type: Vec<String>,
    pub release_country: Option<String>,
    pub script: Option<String>,
    pub language: Option<String>,

    pub copyright: Option<String>,
    pub license: Option<String>,
    pub encoder: Option<String>,
    pub gapless: Option<bool>,

    pub barcode: Option<String>,
    pub isrc: Option<String>,
    pub musicbrainz: MusicBrainzIds,
    pub acoustid: Option<String>,
    pub acoustid_fingerprint: Option<String>,
    pub musicip_puid: Option<String>,

    pub replaygain: ReplayGain,
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_round_trips_within_tolerance() {
        let g = Gain::from_db(-6.0);
        assert!((g.ratio - 0.5012).abs() < 1e-3);
        let g2 = Gain::from_ratio(g.ratio);
        assert!((g2.db - g.db).abs() < 1e-3);
    }

    #[test]
    fn rating_to_stars_matches_spec_examples() {
        assert_eq!(rating_to_stars(0.0), 1);
        assert_eq!(rating_to_stars(1.0), 5);
        assert_eq!(rating_to_stars(0.5), 3);
    }

    #[test]
    fn rating_to_stars_undefined_for_out_of_range() {
        assert_eq!(rating_to_stars(-0.1), 0);
        assert_eq!(rating_to_stars(1.1), 0);
        assert_eq!(rating_to_stars(f64::NAN), 0);
    }
}
