//! Turns a finished [`CommonView`]/[`FormatFacts`] into the flat sequence of
//! observer events that would reproduce it (spec.md §4.6, §8 property 7:
//! "concatenating observed events reproduces the final `common` and
//! `format` values exactly"). Each populated field contributes exactly one
//! event carrying its final value, in the struct's declaration order; the
//! coarsest replay that still satisfies property 7 without threading the
//! observer pump through every container parser and mapper coercion site
//! individually (see DESIGN.md).

use crate::common_view::CommonView;
use crate::format::FormatFacts;
use crate::observer::{Event, EventKind};

macro_rules! push_scalar {
    ($out:expr, $field:expr, $name:expr) => {
        if let Some(value) = &$field {
            $out.push(($name, format!("{value:?}")));
        }
    };
}

macro_rules! push_seq {
    ($out:expr, $field:expr, $name:expr) => {
        if !$field.is_empty() {
            $out.push(($name, format!("{:?}", $field)));
        }
    };
}

/// `(field-id, debug-formatted value)` pairs for every populated format
/// field, in [`FormatFacts`] declaration order.
pub fn format_fields(facts: &FormatFacts) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    push_scalar!(out, facts.container, "container");
    push_seq!(out, facts.tag_systems, "tag_systems");
    push_scalar!(out, facts.duration, "duration");
    push_scalar!(out, facts.bitrate, "bitrate");
    push_scalar!(out, facts.sample_rate, "sample_rate");
    push_scalar!(out, facts.bits_per_sample, "bits_per_sample");
    push_scalar!(out, facts.number_of_channels, "number_of_channels");
    push_scalar!(out, facts.number_of_samples, "number_of_samples");
    push_scalar!(out, facts.codec, "codec");
    push_scalar!(out, facts.codec_profile, "codec_profile");
    push_scalar!(out, facts.tool, "tool");
    push_scalar!(out, facts.lossless, "lossless");
    push_scalar!(out, facts.audio_md5, "audio_md5");
    out
}

/// Same shape for [`CommonView`], in its declaration order. Nested structs
/// (`track`, `disk`, `tv`, `podcast`, `musicbrainz`, `replaygain`) are
/// flattened into their own sub-fields rather than emitted as one opaque
/// blob, matching the granularity a real observer would want.
pub fn common_fields(view: &CommonView) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    push_scalar!(out, view.title, "title");
    push_scalar!(out, view.artist, "artist");
    push_seq!(out, view.artists, "artists");
    push_scalar!(out, view.albumartist, "albumartist");
    push_scalar!(out, view.album, "album");
    push_scalar!(out, view.year, "year");
    push_scalar!(out, view.date, "date");
    push_scalar!(out, view.originaldate, "originaldate");
    push_scalar!(out, view.track.no, "track.no");
    push_scalar!(out, view.track.of, "track.of");
    push_scalar!(out, view.disk.no, "disk.no");
    push_scalar!(out, view.disk.of, "disk.of");
    push_seq!(out, view.genre, "genre");
    push_seq!(out, view.picture, "picture");
    push_scalar!(out, view.comment, "comment");
    push_seq!(out, view.composer, "composer");
    push_scalar!(out, view.lyrics, "lyrics");
    push_scalar!(out, view.sort_title, "sort_title");
    push_scalar!(out, view.sort_artist, "sort_artist");
    push_scalar!(out, view.sort_album, "sort_album");
    push_scalar!(out, view.sort_albumartist, "sort_albumartist");
    push_scalar!(out, view.sort_composer, "sort_composer");
    push_scalar!(out, view.work, "work");
    push_seq!(out, view.contributors, "contributors");
    push_seq!(out, view.ratings, "ratings");
    push_scalar!(out, view.bpm, "bpm");
    push_scalar!(out, view.mood, "mood");
    push_scalar!(out, view.media, "media");
    push_seq!(out, view.catalog_number, "catalog_number");
    push_scalar!(out, view.tv.show, "tv.show");
    push_scalar!(out, view.tv.network, "tv.network");
    push_scalar!(out, view.tv.episode, "tv.episode");
    push_scalar!(out, view.tv.season, "tv.season");
    if view.podcast.is_podcast {
        out.push(("podcast.is_podcast", "true".to_string()));
    }
    push_scalar!(out, view.podcast.url, "podcast.url");
    push_scalar!(out, view.podcast.episode_guid, "podcast.episode_guid");
    push_scalar!(out, view.release_status, "release_status");
    push_seq!(out, view.release_type, "release_type");
    push_scalar!(out, view.release_country, "release_country");
    push_scalar!(out, view.script, "script");
    push_scalar!(out, view.language, "language");
    push_scalar!(out, view.copyright, "copyright");
    push_scalar!(out, view.license, "license");
    push_scalar!(out, view.encoder, "encoder");
    push_scalar!(out, view.gapless, "gapless");
    push_scalar!(out, view.barcode, "barcode");
    push_scalar!(out, view.isrc, "isrc");
    push_scalar!(out, view.musicbrainz.track_id, "musicbrainz.track_id");
    push_scalar!(out, view.musicbrainz.release_id, "musicbrainz.release_id");
    push_seq!(out, view.musicbrainz.artist_id, "musicbrainz.artist_id");
    push_seq!(
        out,
        view.musicbrainz.release_artist_id,
        "musicbrainz.release_artist_id"
    );
    push_scalar!(
        out,
        view.musicbrainz.release_group_id,
        "musicbrainz.release_group_id"
    );
    push_scalar!(out, view.musicbrainz.work_id, "musicbrainz.work_id");
    push_scalar!(out, view.musicbrainz.disc_id, "musicbrainz.disc_id");
    push_scalar!(out, view.acoustid, "acoustid");
    push_scalar!(
        out,
        view.acoustid_fingerprint,
        "acoustid_fingerprint"
    );
    push_scalar!(out, view.musicip_puid, "musicip_puid");
    push_scalar!(out, view.replaygain.track_gain, "replaygain.track_gain");
    push_scalar!(out, view.replaygain.track_peak, "replaygain.track_peak");
    push_scalar!(out, view.replaygain.album_gain, "replaygain.album_gain");
    push_scalar!(out, view.replaygain.album_peak, "replaygain.album_peak");
    push_scalar!(
        out,
        view.replaygain.reference_loudness,
        "replaygain.reference_loudness"
    );
    push_scalar!(out, view.replaygain.undo, "replaygain.undo");
    push_scalar!(out, view.key, "key");
    out
}

/// Builds the flat [`Event`] sequence for a finished result: every format
/// field first, then every common field, each carrying its final value.
pub fn replay_events(facts: &FormatFacts, view: &CommonView) -> Vec<Event> {
    let mut events = Vec::new();
    for (field, value) in format_fields(facts) {
        events.push(Event {
            kind: EventKind::Format,
            field: field.to_string(),
            new_value: value,
        });
    }
    for (field, value) in common_fields(view) {
        events.push(Event {
            kind: EventKind::Common,
            field: field.to_string(),
            new_value: value,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Container;

    #[test]
    fn only_populated_fields_produce_events() {
        let facts = FormatFacts {
            container: Some(Container::Flac),
            ..FormatFacts::default()
        };
        let view = CommonView {
            title: Some("Hello".to_string()),
            ..CommonView::default()
        };
        let events = replay_events(&facts, &view);
        assert!(events.iter().any(|e| e.field == "container"));
        assert!(events.iter().any(|e| e.field == "title"));
        assert!(!events.iter().any(|e| e.field == "artist"));
    }
}
