use crate::format::Container;

/// How many leading bytes the sniffer needs peeked before it can decide
/// (spec.md §4.3: "first N bytes"). Generous enough to see past an MP4
/// `ftyp` box's offset-4 type and still scan for an MPEG sync word.
pub const SNIFF_WINDOW: usize = 4096;

/// Chooses a container parser from the leading bytes and an optional MIME
/// hint (spec.md §4.3). ID3v2 is treated as an envelope by the caller: once
/// decoded and stripped, the caller re-invokes `sniff` on the remaining
/// stream to find the audio container it wraps.
pub fn sniff(peek: &[u8], mime_hint: Option<&str>) -> Option<Container> {
    if let Some(c) = sniff_magic(peek) {
        return Some(c);
    }
    if find_mpeg_sync(peek).is_some() {
        return Some(Container::Mpeg);
    }
    if find_adts_sync(peek).is_some() {
        return Some(Container::Adts);
    }
    // MIME hint is only a tiebreaker once magic bytes are ambiguous or
    // absent (spec.md §4.3 point 4); consulted last.
    mime_to_container(mime_hint)
}

/// Whether the leading bytes are an ID3v2 envelope (checked separately from
/// [`sniff`] since the caller needs to decode-and-strip it before
/// re-sniffing, rather than dispatching to it as a terminal container).
pub fn is_id3v2_envelope(peek: &[u8]) -> bool {
    peek.len() >= 3 && &peek[0..3] == b"ID3"
}

fn sniff_magic(peek: &[u8]) -> Option<Container> {
    if peek.len() < 4 {
        return None;
    }
    if &peek[0..4] == b"fLaC" {
        return Some(Container::Flac);
    }
    if &peek[0..4] == b"OggS" {
        return Some(Container::Ogg);
    }
    if peek.len() >= 12 && &peek[0..4] == b"RIFF" && &peek[8..12] == b"WAVE" {
        return Some(Container::Riff);
    }
    if peek.len() >= 12
        && &peek[0..4] == b"FORM"
        && (&peek[8..12] == b"AIFF" || &peek[8..12] == b"AIFC")
    {
        return Some(Container::Aiff);
    }
    if peek.len() >= 8 && &peek[4..8] == b"ftyp" {
        return Some(Container::Mp4);
    }
    if peek.len() >= 16 && peek[0..16] == ASF_GUID {
        return Some(Container::Asf);
    }
    if &peek[0..4] == b"MPCK" || &peek[0..3] == b"MP+" {
        return Some(Container::Musepack);
    }
    if &peek[0..4] == b"DSD " {
        return Some(Container::Dsf);
    }
    if &peek[0..4] == b"FRM8" {
        return Some(Container::Dsdiff);
    }
    if &peek[0..4] == b"wvpk" {
        return Some(Container::Wavpack);
    }
    if peek.len() >= 8 && &peek[0..8] == b"APETAGEX" {
        return Some(Container::Apev2);
    }
    None
}

/// ASF/WMA top-level "Header Object" GUID
/// `75B22630-668E-11CF-A6D9-00AA0062CE6C`, little-endian encoded the way it
/// appears on the wire.
const ASF_GUID: [u8; 16] = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];

/// Scans for an MPEG audio sync word (11 set bits followed by a valid
/// version/layer combination) within the initial window (spec.md §4.3
/// point 2).
pub fn find_mpeg_sync(window: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < window.len() {
        if window[i] == 0xFF && (window[i + 1] & 0xE0) == 0xE0 {
            let version_bits = (window[i + 1] >> 3) & 0b11;
            let layer_bits = (window[i + 1] >> 1) & 0b11;
            if version_bits != 0b01 && layer_bits != 0b00 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Scans for an ADTS sync word (12 set bits + MPEG version + layer==00)
/// (spec.md §4.3 point 3).
pub fn find_adts_sync(window: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < window.len() {
        if window[i] == 0xFF && (window[i + 1] & 0xF6) == 0xF0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn mime_to_container(mime: Option<&str>) -> Option<Container> {
    match mime?.to_ascii_lowercase().as_str() {
        "audio/flac" | "audio/x-flac" => Some(Container::Flac),
        "audio/ogg" | "application/ogg" => Some(Container::Ogg),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Container::Riff),
        "audio/aiff" | "audio/x-aiff" => Some(Container::Aiff),
        "audio/mp4" | "audio/m4a" | "video/mp4" => Some(Container::Mp4),
        "audio/x-ms-wma" => Some(Container::Asf),
        "audio/mpeg" | "audio/mp3" => Some(Container::Mpeg),
        "audio/x-wavpack" => Some(Container::Wavpack),
        "audio/x-musepack" => Some(Container::Musepack),
        "audio/x-dsf" => Some(Container::Dsf),
        "audio/x-aac" => Some(Container::Adts),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_flac_magic() {
        assert_eq!(sniff(b"fLaC\x00\x00\x00\x22", None), Some(Container::Flac));
    }

    #[test]
    fn sniffs_ogg_magic() {
        assert_eq!(sniff(b"OggS\x00\x02", None), Some(Container::Ogg));
    }

    #[test]
    fn sniffs_riff_wave() {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        assert_eq!(sniff(&bytes, None), Some(Container::Riff));
    }

    #[test]
    fn sniffs_mp4_ftyp() {
        let mut bytes = 24u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"ftypM4A ");
        assert_eq!(sniff(&bytes, None), Some(Container::Mp4));
    }

    #[test]
    fn detects_id3v2_envelope_separately() {
        assert!(is_id3v2_envelope(b"ID3\x04\x00\x00"));
        assert!(!is_id3v2_envelope(b"fLaC"));
    }

    #[test]
    fn sniffs_mpeg_sync_word() {
        let bytes = [0x00, 0x00, 0xFF, 0xFB, 0x90, 0x00];
        assert_eq!(sniff(&bytes, None), Some(Container::Mpeg));
    }

    #[test]
    fn mime_hint_used_only_as_fallback() {
        assert_eq!(sniff(b"\x00\x00\x00\x00", Some("audio/flac")), Some(Container::Flac));
    }
}
