//! Common-view mapper (spec.md §4.5): a static lookup from `(tag-system,
//! tag-id)` to `(common-field, coercion)`, expressed here as small
//! per-system dispatch tables plus a handful of shared coercion helpers,
//! rather than one sprawling match: "the system->id->common-field mapping
//! as data, not code" (spec.md §9).
//!
//! The mapper is a pure function of a [`NativeTagSet`]: running it twice on
//! the same input produces the same [`CommonView`] (spec.md §8 "Mapping
//! idempotence"). Observer notification is the driver's job, not this
//! module's; it replays the same per-tag dispatch the driver can snapshot
//! around.

use crate::common_view::{CommonView, Gain};
use crate::containers::id3v1;
use crate::error::Warning;
use crate::options::ParseOptions;
use crate::tag::{NativeTag, NativeTagSet, TagSystem};
use crate::value::{NativeValue, Picture};
use chrono::NaiveDate;

/// Runs every native tag through its tag system's dispatch table and
/// accumulates the result into a [`CommonView`] (spec.md §4.5).
pub fn map(native: &NativeTagSet, options: &ParseOptions) -> (CommonView, Vec<Warning>) {
    let mut state = State {
        view: CommonView::default(),
        warnings: Vec::new(),
    };
    for (system_name, tags) in native.systems() {
        let Some(system) = system_from_name(system_name) else {
            continue;
        };
        for tag in tags {
            dispatch(system, tag, &mut state, options);
        }
    }
    (state.view, state.warnings)
}

/// Inverse of [`TagSystem::as_str`]; `Matroska` has no parser yet so it
/// never appears in a populated [`NativeTagSet`], but is matched here for
/// completeness.
fn system_from_name(name: &str) -> Option<TagSystem> {
    Some(match name {
        "ID3v1" => TagSystem::Id3v1,
        "ID3v2.2" => TagSystem::Id3v22,
        "ID3v2.3" => TagSystem::Id3v23,
        "ID3v2.4" => TagSystem::Id3v24,
        "APEv2" => TagSystem::Apev2,
        "vorbis" => TagSystem::Vorbis,
        "iTunes" => TagSystem::ITunes,
        "asf" => TagSystem::Asf,
        "RIFF" => TagSystem::Riff,
        "AIFF" => TagSystem::Aiff,
        "matroska" => TagSystem::Matroska,
        _ => return None,
    })
}

struct State {
    view: CommonView,
    warnings: Vec<Warning>,
}

fn dispatch(system: TagSystem, tag: &NativeTag, state: &mut State, options: &ParseOptions) {
    match system {
        TagSystem::Id3v1 => id3v1_tag(tag, state),
        TagSystem::Id3v22 | TagSystem::Id3v23 | TagSystem::Id3v24 => id3v2_tag(tag, state, options),
        TagSystem::Apev2 => ape_tag(tag, state, options),
        TagSystem::Vorbis => vorbis_tag(tag, state, options),
        TagSystem::ITunes => itunes_tag(tag, state, options),
        TagSystem::Asf => asf_tag(tag, state),
        TagSystem::Riff => riff_tag(tag, state),
        TagSystem::Aiff => aiff_tag(tag, state),
        TagSystem::Matroska => {}
    }
}

// ---------------------------------------------------------------------
// Shared coercions (spec.md §4.5 closed coercion set)
// ---------------------------------------------------------------------

fn set_once<T: PartialEq>(slot: &mut Option<T>, value: T, warnings: &mut Vec<Warning>, field: &str) {
    match slot {
        None => *slot = Some(value),
        Some(existing) if *existing != value => {
            warnings.push(Warning::new(format!(
                "common.{field} already set, ignoring differing value"
            )));
        }
        Some(_) => {}
    }
}

fn push_unique<T: PartialEq>(seq: &mut Vec<T>, value: T) {
    if !seq.contains(&value) {
        seq.push(value);
    }
}

fn as_text(value: &NativeValue) -> Option<String> {
    match value {
        NativeValue::Text(s) => Some(s.clone()),
        NativeValue::Int(i) => Some(i.to_string()),
        NativeValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn to_int(value: &NativeValue) -> Option<i64> {
    match value {
        NativeValue::Int(i) => Some(*i),
        NativeValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_float(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
        .parse()
        .ok()
}

/// `ratio-from-db`: `"-6.00 dB"` -> a [`Gain`] with both forms populated
/// (spec.md §4.5).
fn parse_gain_db(text: &str) -> Option<Gain> {
    to_float(text).map(Gain::from_db)
}

/// `parse-date(yyyy | yyyy-mm | yyyy-mm-dd)` (spec.md §4.5): extracts the
/// 4-digit year and keeps the original text as `date`/`originaldate`,
/// validating full `yyyy-mm-dd` dates with `chrono` when present.
fn parse_date(text: &str) -> Option<(i32, String)> {
    let t = text.trim();
    if t.len() < 4 {
        return None;
    }
    let year: i32 = t.get(0..4)?.parse().ok()?;
    if t.len() >= 10 {
        let _ = NaiveDate::parse_from_str(&t[0..10], "%Y-%m-%d");
    }
    Some((year, t.to_string()))
}

/// `split-track-of-total`: `"3/12"` or `"3 of 12"` -> `(Some(3), Some(12))`.
fn split_of_total(text: &str) -> (Option<u32>, Option<u32>) {
    let text = text.trim();
    let sep = if text.contains('/') {
        "/"
    } else if text.contains(" of ") {
        " of "
    } else {
        return (text.parse().ok(), None);
    };
    let mut parts = text.splitn(2, sep);
    let no = parts.next().and_then(|s| s.trim().parse().ok());
    let of = parts.next().and_then(|s| s.trim().parse().ok());
    (no, of)
}

/// `genre-with-id3-refs`: resolves legacy `"(17)"`/`"(RX)"`/`"(CR)"`
/// references against the ID3v1 genre table, keeping any literal trailing
/// text as an additional genre (spec.md §4.5, §4.4 `TCON`).
fn genre_refs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(stripped) = rest.strip_prefix('(') {
        let Some(close) = stripped.find(')') else { break };
        let token = &stripped[..close];
        let name = match token {
            "RX" => Some("Remix".to_string()),
            "CR" => Some("Cover".to_string()),
            _ => token
                .parse::<u8>()
                .ok()
                .and_then(id3v1::genre_name)
                .map(str::to_string),
        };
        match name {
            Some(name) => {
                out.push(name);
                rest = &stripped[close + 1..];
            }
            None => break,
        }
    }
    let trailing = rest.trim();
    if !trailing.is_empty() {
        out.push(trailing.to_string());
    }
    if out.is_empty() {
        let t = text.trim();
        if !t.is_empty() {
            out.push(t.to_string());
        }
    }
    out
}

fn push_picture(state: &mut State, options: &ParseOptions, picture: &Picture) {
    let _ = options; // payload already cleared at ingestion (Emit::tag) when skip_covers is set
    state.view.picture.push(picture.clone());
}

fn picture_from_cover_art_binary(desc_hint: &str, data: &[u8]) -> Option<Picture> {
    // APEv2 binary items store the filename/description, NUL, then the raw
    // image bytes (spec.md §4.4 "Supplemented" APEv2 cover art note).
    let nul = data.iter().position(|b| *b == 0)?;
    let (name, rest) = (&data[..nul], &data[nul + 1..]);
    let mime = sniff_image_mime(rest)?;
    Some(Picture {
        mime: mime.to_string(),
        data: rest.to_vec(),
        description: if name.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(name).into_owned())
        },
        picture_type: Some(desc_hint.to_string()),
    })
}

fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8]) {
        Some("image/jpeg")
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else {
        None
    }
}

// ---------------------------------------------------------------------
// ID3v1
// ---------------------------------------------------------------------

fn id3v1_tag(tag: &NativeTag, state: &mut State) {
    let w = &mut state.warnings;
    match tag.id.as_str() {
        "title" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.title, v, w, "title");
            }
        }
        "artist" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), w, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "album" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.album, v, w, "album");
            }
        }
        "year" => {
            if let Some(y) = to_int(&tag.value) {
                set_once(&mut state.view.year, y as i32, w, "year");
                set_once(&mut state.view.date, y.to_string(), w, "date");
            }
        }
        "comment" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.comment, v, w, "comment");
            }
        }
        "track" => {
            if let Some(n) = to_int(&tag.value) {
                set_once(&mut state.view.track.no, n as u32, w, "track.no");
            }
        }
        "genre" => {
            if let Some(byte) = to_int(&tag.value) {
                if let Some(name) = id3v1::genre_name(byte as u8) {
                    push_unique(&mut state.view.genre, name.to_string());
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------
// ID3v2.2/2.3/2.4: ids are matched after stripping the v2.2 short forms,
// since `decode_frame` keeps the original id on the emitted native tag.
// ---------------------------------------------------------------------

fn id3v2_tag(tag: &NativeTag, state: &mut State, options: &ParseOptions) {
    let id = normalize_long(&tag.id);
    let w = &mut state.warnings;
    match id.as_str() {
        "TIT2" => set_text_once(&mut state.view.title, &tag.value, w, "title"),
        "TPE1" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), w, "artist");
                for part in v.split('/') {
                    let part = part.trim();
                    if !part.is_empty() {
                        push_unique(&mut state.view.artists, part.to_string());
                    }
                }
            }
        }
        "TPE2" => set_text_once(&mut state.view.albumartist, &tag.value, w, "albumartist"),
        "TALB" => set_text_once(&mut state.view.album, &tag.value, w, "album"),
        "TYER" | "TDRC" | "TDAT" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, w, "year");
                    set_once(&mut state.view.date, date, w, "date");
                }
            }
        }
        "TDOR" | "TORY" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((_, date)) = parse_date(&text) {
                    set_once(&mut state.view.originaldate, date, w, "originaldate");
                }
            }
        }
        "TRCK" => {
            if let NativeValue::OfTotal(ot) = &tag.value {
                if let Some(no) = ot.no {
                    set_once(&mut state.view.track.no, no, w, "track.no");
                }
                if let Some(of) = ot.of {
                    set_once(&mut state.view.track.of, of, w, "track.of");
                }
            }
        }
        "TPOS" => {
            if let NativeValue::OfTotal(ot) = &tag.value {
                if let Some(no) = ot.no {
                    set_once(&mut state.view.disk.no, no, w, "disk.no");
                }
                if let Some(of) = ot.of {
                    set_once(&mut state.view.disk.of, of, w, "disk.of");
                }
            }
        }
        "TCON" => {
            if let Some(text) = as_text(&tag.value) {
                for genre in genre_refs(&text) {
                    push_unique(&mut state.view.genre, genre);
                }
            }
        }
        "COMM" => set_text_once(&mut state.view.comment, &tag.value, w, "comment"),
        "USLT" => set_text_once(&mut state.view.lyrics, &tag.value, w, "lyrics"),
        "TCOM" => push_text_seq(&mut state.view.composer, &tag.value),
        "TBPM" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some(bpm) = to_float(&text) {
                    set_once(&mut state.view.bpm, bpm, w, "bpm");
                }
            }
        }
        "TKEY" => set_text_once(&mut state.view.key, &tag.value, w, "key"),
        "TCOP" => set_text_once(&mut state.view.copyright, &tag.value, w, "copyright"),
        "TENC" => set_text_once(&mut state.view.encoder, &tag.value, w, "encoder"),
        "TPUB" => {
            if let Some(name) = as_text(&tag.value) {
                state.view.contributors.push(crate::common_view::Contributor {
                    role: "publisher".to_string(),
                    name,
                });
            }
        }
        "TSOP" => set_text_once(&mut state.view.sort_artist, &tag.value, w, "sort_artist"),
        "TSOT" => set_text_once(&mut state.view.sort_title, &tag.value, w, "sort_title"),
        "TSOA" => set_text_once(&mut state.view.sort_album, &tag.value, w, "sort_album"),
        "TSO2" => set_text_once(&mut state.view.sort_albumartist, &tag.value, w, "sort_albumartist"),
        "TSOC" => set_text_once(&mut state.view.sort_composer, &tag.value, w, "sort_composer"),
        "TMOO" => set_text_once(&mut state.view.mood, &tag.value, w, "mood"),
        "TMED" => set_text_once(&mut state.view.media, &tag.value, w, "media"),
        "UFID" => {
            if let NativeValue::Text(mbid) = &tag.value {
                set_once(&mut state.view.musicbrainz.track_id, mbid.clone(), w, "musicbrainz.track_id");
            }
        }
        "APIC" | "PIC" => {
            if let NativeValue::Picture(p) = &tag.value {
                push_picture(state, options, p);
            }
        }
        "POPM" => {
            if let NativeValue::Rating { source, rating } = &tag.value {
                state.view.ratings.push(crate::common_view::RatingEntry {
                    source: source.clone(),
                    rating: *rating,
                });
            }
        }
        // Free-form TXXX frames are keyed by their description at decode
        // time, so common ReplayGain/MusicBrainz conventions arrive here
        // under the same ids the APEv2/Vorbis tables use.
        _ => txxx_like(id.as_str(), &tag.value, state),
    }
}

fn normalize_long(id: &str) -> String {
    match id {
        "TT2" => "TIT2",
        "TP1" => "TPE1",
        "TP2" => "TPE2",
        "TAL" => "TALB",
        "TYE" => "TYER",
        "TCO" => "TCON",
        "COM" => "COMM",
        "ULT" => "USLT",
        "TRK" => "TRCK",
        "TPA" => "TPOS",
        "TCM" => "TCOM",
        "TBP" => "TBPM",
        "UFI" => "UFID",
        "PIC" => "PIC",
        other => other,
    }
    .to_string()
}

fn set_text_once(slot: &mut Option<String>, value: &NativeValue, w: &mut Vec<Warning>, field: &str) {
    if let Some(text) = as_text(value) {
        let text = text.trim();
        if !text.is_empty() {
            set_once(slot, text.to_string(), w, field);
        }
    }
}

fn push_text_seq(seq: &mut Vec<String>, value: &NativeValue) {
    if let Some(text) = as_text(value) {
        for part in text.split('/') {
            let part = part.trim();
            if !part.is_empty() {
                push_unique(seq, part.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------
// Shared "key/value vocabulary" used by APEv2, Vorbis comments, and
// ID3v2 TXXX/WXXX frames alike: ReplayGain, MusicBrainz, AcoustID, and a
// handful of other widely-adopted free-text identifiers share the same
// spelling across all three (spec.md §4.5 "Multiple tag systems may
// contribute to the same field").
// ---------------------------------------------------------------------

fn txxx_like(key: &str, value: &NativeValue, state: &mut State) {
    let Some(text) = as_text(value) else { return };
    let w = &mut state.warnings;
    let rg = &mut state.view.replaygain;
    match key.to_ascii_uppercase().as_str() {
        "REPLAYGAIN_TRACK_GAIN" => {
            if let Some(gain) = parse_gain_db(&text) {
                set_once(&mut rg.track_gain, gain, w, "replaygain_track_gain");
            }
        }
        "REPLAYGAIN_TRACK_PEAK" => {
            if let Some(peak) = to_float(&text) {
                set_once(&mut rg.track_peak, peak, w, "replaygain_track_peak");
            }
        }
        "REPLAYGAIN_ALBUM_GAIN" => {
            if let Some(gain) = parse_gain_db(&text) {
                set_once(&mut rg.album_gain, gain, w, "replaygain_album_gain");
            }
        }
        "REPLAYGAIN_ALBUM_PEAK" => {
            if let Some(peak) = to_float(&text) {
                set_once(&mut rg.album_peak, peak, w, "replaygain_album_peak");
            }
        }
        "REPLAYGAIN_REFERENCE_LOUDNESS" => {
            if let Some(loudness) = to_float(&text) {
                set_once(&mut rg.reference_loudness, loudness, w, "replaygain_reference_loudness");
            }
        }
        "MUSICBRAINZ_TRACKID" | "MUSICBRAINZ TRACK ID" => {
            set_once(&mut state.view.musicbrainz.track_id, text, w, "musicbrainz.track_id")
        }
        "MUSICBRAINZ_ALBUMID" | "MUSICBRAINZ ALBUM ID" => {
            set_once(&mut state.view.musicbrainz.release_id, text, w, "musicbrainz.release_id")
        }
        "MUSICBRAINZ_ARTISTID" | "MUSICBRAINZ ARTIST ID" => {
            push_unique(&mut state.view.musicbrainz.artist_id, text)
        }
        "MUSICBRAINZ_ALBUMARTISTID" | "MUSICBRAINZ ALBUM ARTIST ID" => {
            push_unique(&mut state.view.musicbrainz.release_artist_id, text)
        }
        "MUSICBRAINZ_RELEASEGROUPID" => {
            set_once(&mut state.view.musicbrainz.release_group_id, text, w, "musicbrainz.release_group_id")
        }
        "MUSICBRAINZ_WORKID" => set_once(&mut state.view.musicbrainz.work_id, text, w, "musicbrainz.work_id"),
        "MUSICBRAINZ_DISCID" => set_once(&mut state.view.musicbrainz.disc_id, text, w, "musicbrainz.disc_id"),
        "ACOUSTID_ID" => set_once(&mut state.view.acoustid, text, w, "acoustid"),
        "ACOUSTID_FINGERPRINT" => {
            set_once(&mut state.view.acoustid_fingerprint, text, w, "acoustid_fingerprint")
        }
        "MUSICIP_PUID" => set_once(&mut state.view.musicip_puid, text, w, "musicip_puid"),
        "ISRC" => set_once(&mut state.view.isrc, text, w, "isrc"),
        "BARCODE" => set_once(&mut state.view.barcode, text, w, "barcode"),
        "CATALOGNUMBER" => push_unique(&mut state.view.catalog_number, text),
        "LANGUAGE" => set_once(&mut state.view.language, text, w, "language"),
        "SCRIPT" => set_once(&mut state.view.script, text, w, "script"),
        "MEDIA" => set_once(&mut state.view.media, text, w, "media"),
        "MOOD" => set_once(&mut state.view.mood, text, w, "mood"),
        "WORK" => set_once(&mut state.view.work, text, w, "work"),
        "RELEASESTATUS" | "MUSICBRAINZ_ALBUMSTATUS" => {
            set_once(&mut state.view.release_status, text, w, "release_status")
        }
        "RELEASETYPE" | "MUSICBRAINZ_ALBUMTYPE" => push_unique(&mut state.view.release_type, text),
        "RELEASECOUNTRY" | "MUSICBRAINZ_ALBUMRELEASECOUNTRY" => {
            set_once(&mut state.view.release_country, text, w, "release_country")
        }
        "LICENSE" => set_once(&mut state.view.license, text, w, "license"),
        "BPM" => {
            if let Some(bpm) = to_float(&text) {
                set_once(&mut state.view.bpm, bpm, w, "bpm");
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------
// APEv2
// ---------------------------------------------------------------------

fn ape_tag(tag: &NativeTag, state: &mut State, options: &ParseOptions) {
    let key = tag.id.to_ascii_uppercase();
    let w_field = key.as_str();
    if w_field.starts_with("COVER ART") {
        if let NativeValue::Binary(data) = &tag.value {
            if let Some(picture) = picture_from_cover_art_binary(&tag.id, data) {
                push_picture(state, options, &picture);
            }
        }
        return;
    }
    match key.as_str() {
        "TITLE" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "ARTIST" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "ALBUM" => text_scalar(&tag.value, &mut state.view.album, &mut state.warnings, "album"),
        "ALBUMARTIST" | "ALBUM ARTIST" => {
            text_scalar(&tag.value, &mut state.view.albumartist, &mut state.warnings, "albumartist")
        }
        "YEAR" | "DATE" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, &mut state.warnings, "year");
                    set_once(&mut state.view.date, date, &mut state.warnings, "date");
                }
            }
        }
        "TRACK" | "TRACKNUMBER" => {
            if let Some(text) = as_text(&tag.value) {
                let (no, of) = split_of_total(&text);
                if let Some(no) = no {
                    set_once(&mut state.view.track.no, no, &mut state.warnings, "track.no");
                }
                if let Some(of) = of {
                    set_once(&mut state.view.track.of, of, &mut state.warnings, "track.of");
                }
            }
        }
        "DISC" | "DISK" | "DISCNUMBER" => {
            if let Some(text) = as_text(&tag.value) {
                let (no, of) = split_of_total(&text);
                if let Some(no) = no {
                    set_once(&mut state.view.disk.no, no, &mut state.warnings, "disk.no");
                }
                if let Some(of) = of {
                    set_once(&mut state.view.disk.of, of, &mut state.warnings, "disk.of");
                }
            }
        }
        "GENRE" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.genre, text);
            }
        }
        "COMMENT" => text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment"),
        "COMPOSER" => push_text_seq(&mut state.view.composer, &tag.value),
        "CONDUCTOR" => {
            if let Some(name) = as_text(&tag.value) {
                state.view.contributors.push(crate::common_view::Contributor {
                    role: "conductor".to_string(),
                    name,
                });
            }
        }
        "COPYRIGHT" => text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright"),
        "LYRICS" => text_scalar(&tag.value, &mut state.view.lyrics, &mut state.warnings, "lyrics"),
        "ENCODEDBY" | "ENCODER" => {
            text_scalar(&tag.value, &mut state.view.encoder, &mut state.warnings, "encoder")
        }
        _ => txxx_like(&tag.id, &tag.value, state),
    }
    let _ = w_field;
}

fn text_scalar(value: &NativeValue, slot: &mut Option<String>, w: &mut Vec<Warning>, field: &str) {
    if let Some(text) = as_text(value) {
        set_once(slot, text, w, field);
    }
}

// ---------------------------------------------------------------------
// Vorbis comment (FLAC, Ogg Vorbis/Opus/Speex)
// ---------------------------------------------------------------------

fn vorbis_tag(tag: &NativeTag, state: &mut State, options: &ParseOptions) {
    let key = tag.id.to_ascii_uppercase();
    match key.as_str() {
        "TITLE" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "ARTIST" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "ALBUM" => text_scalar(&tag.value, &mut state.view.album, &mut state.warnings, "album"),
        "ALBUMARTIST" | "ALBUM ARTIST" => {
            text_scalar(&tag.value, &mut state.view.albumartist, &mut state.warnings, "albumartist")
        }
        "DATE" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, &mut state.warnings, "year");
                    set_once(&mut state.view.date, date, &mut state.warnings, "date");
                }
            }
        }
        "ORIGINALDATE" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((_, date)) = parse_date(&text) {
                    set_once(&mut state.view.originaldate, date, &mut state.warnings, "originaldate");
                }
            }
        }
        "TRACKNUMBER" => {
            if let Some(text) = as_text(&tag.value) {
                let (no, of) = split_of_total(&text);
                if let Some(no) = no {
                    set_once(&mut state.view.track.no, no, &mut state.warnings, "track.no");
                }
                if let Some(of) = of {
                    set_once(&mut state.view.track.of, of, &mut state.warnings, "track.of");
                }
            }
        }
        "TRACKTOTAL" | "TOTALTRACKS" => {
            if let Some(n) = to_int(&tag.value) {
                set_once(&mut state.view.track.of, n as u32, &mut state.warnings, "track.of");
            }
        }
        "DISCNUMBER" => {
            if let Some(text) = as_text(&tag.value) {
                let (no, of) = split_of_total(&text);
                if let Some(no) = no {
                    set_once(&mut state.view.disk.no, no, &mut state.warnings, "disk.no");
                }
                if let Some(of) = of {
                    set_once(&mut state.view.disk.of, of, &mut state.warnings, "disk.of");
                }
            }
        }
        "DISCTOTAL" | "TOTALDISCS" => {
            if let Some(n) = to_int(&tag.value) {
                set_once(&mut state.view.disk.of, n as u32, &mut state.warnings, "disk.of");
            }
        }
        "GENRE" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.genre, text);
            }
        }
        "COMMENT" | "DESCRIPTION" => {
            text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment")
        }
        "COMPOSER" => push_text_seq(&mut state.view.composer, &tag.value),
        "PERFORMER" => {
            if let Some(name) = as_text(&tag.value) {
                state.view.contributors.push(crate::common_view::Contributor {
                    role: "performer".to_string(),
                    name,
                });
            }
        }
        "CONDUCTOR" => {
            if let Some(name) = as_text(&tag.value) {
                state.view.contributors.push(crate::common_view::Contributor {
                    role: "conductor".to_string(),
                    name,
                });
            }
        }
        "COPYRIGHT" => text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright"),
        "LICENSE" => text_scalar(&tag.value, &mut state.view.license, &mut state.warnings, "license"),
        "ENCODER" => text_scalar(&tag.value, &mut state.view.encoder, &mut state.warnings, "encoder"),
        "BPM" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some(bpm) = to_float(&text) {
                    set_once(&mut state.view.bpm, bpm, &mut state.warnings, "bpm");
                }
            }
        }
        "MOOD" => text_scalar(&tag.value, &mut state.view.mood, &mut state.warnings, "mood"),
        "KEY" | "INITIALKEY" => text_scalar(&tag.value, &mut state.view.key, &mut state.warnings, "key"),
        "LYRICS" | "UNSYNCEDLYRICS" => {
            text_scalar(&tag.value, &mut state.view.lyrics, &mut state.warnings, "lyrics")
        }
        "METADATA_BLOCK_PICTURE" | "PICTURE" => {
            if let NativeValue::Picture(p) = &tag.value {
                push_picture(state, options, p);
            }
        }
        _ => txxx_like(&tag.id, &tag.value, state),
    }
}

// ---------------------------------------------------------------------
// iTunes (MP4 `ilst`)
// ---------------------------------------------------------------------

fn itunes_tag(tag: &NativeTag, state: &mut State, options: &ParseOptions) {
    match tag.id.as_str() {
        "\u{a9}nam" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "\u{a9}ART" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "aART" => {
            text_scalar(&tag.value, &mut state.view.albumartist, &mut state.warnings, "albumartist")
        }
        "\u{a9}alb" => text_scalar(&tag.value, &mut state.view.album, &mut state.warnings, "album"),
        "\u{a9}day" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, &mut state.warnings, "year");
                    set_once(&mut state.view.date, date, &mut state.warnings, "date");
                }
            }
        }
        "\u{a9}gen" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.genre, text);
            }
        }
        "\u{a9}cmt" => text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment"),
        "\u{a9}wrt" => push_text_seq(&mut state.view.composer, &tag.value),
        "\u{a9}lyr" => text_scalar(&tag.value, &mut state.view.lyrics, &mut state.warnings, "lyrics"),
        "\u{a9}too" => text_scalar(&tag.value, &mut state.view.encoder, &mut state.warnings, "encoder"),
        "cprt" => text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright"),
        "trkn" => {
            if let NativeValue::OfTotal(ot) = &tag.value {
                if let Some(no) = ot.no {
                    set_once(&mut state.view.track.no, no, &mut state.warnings, "track.no");
                }
                if let Some(of) = ot.of {
                    set_once(&mut state.view.track.of, of, &mut state.warnings, "track.of");
                }
            }
        }
        "disk" => {
            if let NativeValue::OfTotal(ot) = &tag.value {
                if let Some(no) = ot.no {
                    set_once(&mut state.view.disk.no, no, &mut state.warnings, "disk.no");
                }
                if let Some(of) = ot.of {
                    set_once(&mut state.view.disk.of, of, &mut state.warnings, "disk.of");
                }
            }
        }
        "tmpo" => {
            if let Some(bpm) = to_int(&tag.value) {
                set_once(&mut state.view.bpm, bpm as f64, &mut state.warnings, "bpm");
            }
        }
        "pgap" => {
            if let NativeValue::Int(v) = &tag.value {
                set_once(&mut state.view.gapless, *v != 0, &mut state.warnings, "gapless");
            }
        }
        "covr" => {
            if let NativeValue::Picture(p) = &tag.value {
                push_picture(state, options, p);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------
// ASF content/extended-content descriptors
// ---------------------------------------------------------------------

fn asf_tag(tag: &NativeTag, state: &mut State) {
    match tag.id.as_str() {
        "Title" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "Author" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "Copyright" => {
            text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright")
        }
        "Description" => {
            text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment")
        }
        "WM/AlbumTitle" => text_scalar(&tag.value, &mut state.view.album, &mut state.warnings, "album"),
        "WM/AlbumArtist" => {
            text_scalar(&tag.value, &mut state.view.albumartist, &mut state.warnings, "albumartist")
        }
        "WM/Year" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, &mut state.warnings, "year");
                    set_once(&mut state.view.date, date, &mut state.warnings, "date");
                }
            }
        }
        "WM/Genre" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.genre, text);
            }
        }
        "WM/TrackNumber" => {
            if let Some(n) = to_int(&tag.value) {
                set_once(&mut state.view.track.no, n as u32, &mut state.warnings, "track.no");
            }
        }
        "WM/PartOfSet" => {
            if let Some(text) = as_text(&tag.value) {
                let (no, of) = split_of_total(&text);
                if let Some(no) = no {
                    set_once(&mut state.view.disk.no, no, &mut state.warnings, "disk.no");
                }
                if let Some(of) = of {
                    set_once(&mut state.view.disk.of, of, &mut state.warnings, "disk.of");
                }
            }
        }
        "WM/Composer" => push_text_seq(&mut state.view.composer, &tag.value),
        "WM/Lyrics" => text_scalar(&tag.value, &mut state.view.lyrics, &mut state.warnings, "lyrics"),
        "WM/Mood" => text_scalar(&tag.value, &mut state.view.mood, &mut state.warnings, "mood"),
        "WM/InitialKey" => text_scalar(&tag.value, &mut state.view.key, &mut state.warnings, "key"),
        "WM/BeatsPerMinute" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some(bpm) = to_float(&text) {
                    set_once(&mut state.view.bpm, bpm, &mut state.warnings, "bpm");
                }
            }
        }
        "WM/ISRC" => text_scalar(&tag.value, &mut state.view.isrc, &mut state.warnings, "isrc"),
        "WM/Barcode" => text_scalar(&tag.value, &mut state.view.barcode, &mut state.warnings, "barcode"),
        "WM/CatalogNo" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.catalog_number, text);
            }
        }
        "WM/Publisher" => {
            if let Some(name) = as_text(&tag.value) {
                state.view.contributors.push(crate::common_view::Contributor {
                    role: "publisher".to_string(),
                    name,
                });
            }
        }
        "MusicBrainz/Track Id" => {
            text_scalar(
                &tag.value,
                &mut state.view.musicbrainz.track_id,
                &mut state.warnings,
                "musicbrainz.track_id",
            )
        }
        "MusicBrainz/Album Id" => {
            text_scalar(
                &tag.value,
                &mut state.view.musicbrainz.release_id,
                &mut state.warnings,
                "musicbrainz.release_id",
            )
        }
        _ => txxx_like(&tag.id, &tag.value, state),
    }
}

// ---------------------------------------------------------------------
// RIFF INFO / AIFF text chunks
// ---------------------------------------------------------------------

fn riff_tag(tag: &NativeTag, state: &mut State) {
    match tag.id.as_str() {
        "INAM" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "IART" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "IPRD" => text_scalar(&tag.value, &mut state.view.album, &mut state.warnings, "album"),
        "ICMT" => text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment"),
        "ICOP" => text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright"),
        "ICRD" => {
            if let Some(text) = as_text(&tag.value) {
                if let Some((year, date)) = parse_date(&text) {
                    set_once(&mut state.view.year, year, &mut state.warnings, "year");
                    set_once(&mut state.view.date, date, &mut state.warnings, "date");
                }
            }
        }
        "IGNR" => {
            if let Some(text) = as_text(&tag.value) {
                push_unique(&mut state.view.genre, text);
            }
        }
        "ISFT" => text_scalar(&tag.value, &mut state.view.encoder, &mut state.warnings, "encoder"),
        "ITRK" => {
            if let Some(n) = to_int(&tag.value) {
                set_once(&mut state.view.track.no, n as u32, &mut state.warnings, "track.no");
            }
        }
        _ => {}
    }
}

fn aiff_tag(tag: &NativeTag, state: &mut State) {
    match tag.id.as_str() {
        "NAME" => text_scalar(&tag.value, &mut state.view.title, &mut state.warnings, "title"),
        "AUTH" => {
            if let Some(v) = as_text(&tag.value) {
                set_once(&mut state.view.artist, v.clone(), &mut state.warnings, "artist");
                push_unique(&mut state.view.artists, v);
            }
        }
        "(c) " => text_scalar(&tag.value, &mut state.view.copyright, &mut state.warnings, "copyright"),
        "ANNO" => text_scalar(&tag.value, &mut state.view.comment, &mut state.warnings, "comment"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mut build: impl FnMut(&mut NativeTagSet)) -> CommonView {
        let mut set = NativeTagSet::new();
        build(&mut set);
        let options = ParseOptions::default();
        let (view, _warnings) = map(&set, &options);
        view
    }

    #[test]
    fn maps_id3v23_title_artist_track() {
        let view = run(|set| {
            set.push(TagSystem::Id3v23, NativeTag::new("TIT2", NativeValue::Text("Hello".into())));
            set.push(TagSystem::Id3v23, NativeTag::new("TPE1", NativeValue::Text("World".into())));
            set.push(
                TagSystem::Id3v23,
                NativeTag::new(
                    "TRCK",
                    NativeValue::OfTotal(crate::value::OfTotal { no: Some(3), of: Some(12) }),
                ),
            );
        });
        assert_eq!(view.title.as_deref(), Some("Hello"));
        assert_eq!(view.artist.as_deref(), Some("World"));
        assert_eq!(view.track.no, Some(3));
        assert_eq!(view.track.of, Some(12));
    }

    #[test]
    fn maps_id3v1_genre_byte() {
        let view = run(|set| {
            set.push(TagSystem::Id3v1, NativeTag::new("title", NativeValue::Text("Song".into())));
            set.push(TagSystem::Id3v1, NativeTag::new("artist", NativeValue::Text("Artist".into())));
            set.push(TagSystem::Id3v1, NativeTag::new("year", NativeValue::Int(2001)));
            set.push(TagSystem::Id3v1, NativeTag::new("genre", NativeValue::Int(17)));
        });
        assert_eq!(view.title.as_deref(), Some("Song"));
        assert_eq!(view.genre, vec!["Rock".to_string()]);
        assert_eq!(view.year, Some(2001));
    }

    #[test]
    fn maps_vorbis_repeated_artist_to_sequence() {
        let view = run(|set| {
            set.push(TagSystem::Vorbis, NativeTag::new("ARTIST", NativeValue::Text("A".into())));
            set.push(TagSystem::Vorbis, NativeTag::new("ARTIST", NativeValue::Text("B".into())));
            set.push(TagSystem::Vorbis, NativeTag::new("TITLE", NativeValue::Text("X".into())));
        });
        assert_eq!(view.artists, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(view.title.as_deref(), Some("X"));
    }

    #[test]
    fn maps_apev2_replaygain_pair() {
        let view = run(|set| {
            set.push(
                TagSystem::Apev2,
                NativeTag::new("REPLAYGAIN_TRACK_GAIN", NativeValue::Text("-6.00 dB".into())),
            );
            set.push(
                TagSystem::Apev2,
                NativeTag::new("REPLAYGAIN_TRACK_PEAK", NativeValue::Text("0.988".into())),
            );
        });
        let gain = view.replaygain.track_gain.expect("gain set");
        assert!((gain.db - -6.0).abs() < 1e-9);
        assert!((gain.ratio - 0.5012).abs() < 1e-3);
        assert!((view.replaygain.track_peak.unwrap() - 0.988).abs() < 1e-9);
    }

    #[test]
    fn genre_refs_resolve_legacy_parens() {
        assert_eq!(genre_refs("(17)"), vec!["Rock".to_string()]);
        assert_eq!(genre_refs("(17)Rock"), vec!["Rock".to_string(), "Rock".to_string()]);
        assert_eq!(genre_refs("Custom Genre"), vec!["Custom Genre".to_string()]);
    }
}
