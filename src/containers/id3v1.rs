//! ID3v1 trailer: fixed 128-byte block (spec.md §4.4).

use crate::tag::NativeTag;
use crate::tokenizer::{decode_string, Encoding};
use crate::value::NativeValue;

/// The 148-entry ID3v1 genre table (the original 80 plus the Winamp
/// extensions), shared with the ID3v2 `TCON` legacy-reference coercion
/// (`genre-with-id3-refs`, spec.md §4.5) so both parsers agree on the same
/// names for the same byte.
pub const GENRES: [&str; 148] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock", "Techno",
    "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack", "Euro-Techno",
    "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical", "Instrumental",
    "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise", "AlternRock", "Bass", "Soul", "Punk",
    "Space", "Meditative", "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic",
    "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychedelic", "Rave", "Showtunes", "Trailer",
    "Lo-Fi", "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll",
    "Hard Rock", "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion", "Bebop", "Latin",
    "Revival", "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock",
    "Psychedelic Rock", "Symphonic Rock", "Slow Rock", "Big Band", "Chorus", "Easy Listening",
    "Acoustic", "Humour", "Speech", "Chanson", "Opera", "Chamber Music", "Sonata", "Symphony",
    "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam", "Club", "Tango", "Samba",
    "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle", "Duet", "Punk Rock",
    "Drum Solo", "A Cappella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass", "Club-House",
    "Hardcore", "Terror", "Indie", "BritPop", "Afro-Punk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian",
    "Christian Rock", "Merengue", "Salsa", "Thrash Metal", "Anime", "JPop", "Synthpop",
];

pub fn genre_name(id: u8) -> Option<&'static str> {
    GENRES.get(id as usize).copied()
}

/// Decodes a 128-byte ID3v1/ID3v1.1 trailer. Returns the native tags found;
/// genuinely empty fields (all-NUL or all-space) are omitted, matching how
/// every other tag decoder in this crate treats absent values.
pub fn decode(block: &[u8; 128]) -> Vec<NativeTag> {
    let mut tags = Vec::new();
    debug_assert_eq!(&block[0..3], b"TAG");

    let title = trimmed_latin1(&block[3..33]);
    let artist = trimmed_latin1(&block[33..63]);
    let album = trimmed_latin1(&block[63..93]);
    let year = trimmed_latin1(&block[93..97]);

    // ID3v1.1: byte 125 is zero and byte 126 holds the track number when
    // byte 28 of the comment field (index 125 overall) is zero.
    let is_v11 = block[125] == 0 && block[126] != 0;
    let comment_len = if is_v11 { 28 } else { 30 };
    let comment = trimmed_latin1(&block[97..97 + comment_len]);
    let genre_byte = block[127];

    if let Some(title) = title {
        tags.push(NativeTag::new("title", NativeValue::Text(title)));
    }
    if let Some(artist) = artist {
        tags.push(NativeTag::new("artist", NativeValue::Text(artist)));
    }
    if let Some(album) = album {
        tags.push(NativeTag::new("album", NativeValue::Text(album)));
    }
    if let Some(year) = year {
        if let Ok(y) = year.parse::<i64>() {
            tags.push(NativeTag::new("year", NativeValue::Int(y)));
        }
    }
    if let Some(comment) = comment {
        tags.push(NativeTag::new("comment", NativeValue::Text(comment)));
    }
    if is_v11 {
        tags.push(NativeTag::new("track", NativeValue::Int(block[126] as i64)));
    }
    if genre_byte != 0xFF {
        tags.push(NativeTag::new("genre", NativeValue::Int(genre_byte as i64)));
    }

    tags
}

fn trimmed_latin1(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..end];
    let text = decode_string(bytes, Encoding::Latin1).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(title: &str, artist: &str, year: &str, genre: u8) -> [u8; 128] {
        let mut block = [0u8; 128];
        block[0..3].copy_from_slice(b"TAG");
        block[3..3 + title.len()].copy_from_slice(title.as_bytes());
        block[33..33 + artist.len()].copy_from_slice(artist.as_bytes());
        block[93..93 + year.len()].copy_from_slice(year.as_bytes());
        block[127] = genre;
        block
    }

    #[test]
    fn decodes_title_artist_year_genre() {
        let block = fixture("Song", "Artist", "2001", 17);
        let tags = decode(&block);
        let get = |id: &str| {
            tags.iter()
                .find(|t| t.id == id)
                .map(|t| t.value.clone())
        };
        assert!(matches!(get("title"), Some(NativeValue::Text(s)) if s == "Song"));
        assert!(matches!(get("artist"), Some(NativeValue::Text(s)) if s == "Artist"));
        assert!(matches!(get("year"), Some(NativeValue::Int(2001))));
        assert_eq!(genre_name(17), Some("Rock"));
    }
}
