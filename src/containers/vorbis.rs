//! Vorbis comment decoder (spec.md §4.4), shared between the FLAC
//! `VORBIS_COMMENT` block and Ogg Vorbis/Opus comment packets: both carry
//! the identical `vendor string + key=value list` payload, only the framing
//! around it differs.

use crate::containers::flac::blocks::picture::decode_picture_body;
use crate::error::Result;
use crate::tag::NativeTag;
use crate::tokenizer::{Encoding, Tokenizer};
use crate::value::NativeValue;

/// Well-known comment field carrying a base64-encoded FLAC `PICTURE` block,
/// used by Vorbis/Opus/FLAC taggers that embed cover art in a comment
/// (spec.md §4.4 "Supplemented" FLAC picture note).
const PICTURE_FIELD: &str = "METADATA_BLOCK_PICTURE";

/// Decodes the vendor string followed by a 32-bit little-endian comment
/// count and that many length-prefixed `key=value` entries. Returns the
/// vendor string and the decoded tags; `METADATA_BLOCK_PICTURE` entries are
/// base64-decoded and re-emitted as picture tags rather than raw text.
pub fn decode(tokenizer: &mut dyn Tokenizer) -> Result<(String, Vec<NativeTag>)> {
    let vendor = tokenizer.read_length_prefixed_string_le(Encoding::Utf8)?;
    let comment_count = tokenizer.read_u32le()?;
    let mut tags = Vec::with_capacity(comment_count as usize);

    for _ in 0..comment_count {
        let entry = tokenizer.read_length_prefixed_string_le(Encoding::Utf8)?;
        let (key, value) = match entry.find('=') {
            Some(offset) => (&entry[..offset], &entry[offset + 1..]),
            None => (entry.as_str(), ""),
        };
        let key = key.to_ascii_uppercase();

        if key == PICTURE_FIELD {
            match decode_picture_field(value) {
                Ok(picture) => tags.push(NativeTag::new(key, picture)),
                Err(_) => tags.push(NativeTag::new(key, NativeValue::Text(value.to_string()))),
            }
            continue;
        }

        tags.push(NativeTag::new(key, NativeValue::Text(value.to_string())));
    }

    Ok((vendor, tags))
}

fn decode_picture_field(base64_value: &str) -> Result<NativeValue> {
    let bytes = base64::decode(base64_value.trim())
        .map_err(|e| crate::error::AudiometaError::Decode(e.to_string()))?;
    let picture = decode_picture_body(&bytes)?;
    Ok(NativeValue::Picture(picture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::SliceTokenizer;

    fn entry(key: &str, value: &str) -> Vec<u8> {
        let text = format!("{key}={value}");
        let mut buf = (text.len() as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn decodes_vendor_and_comments() {
        let mut body = Vec::new();
        let vendor = "reference libvorbis 1.3.7";
        body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        body.extend_from_slice(vendor.as_bytes());
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&entry("TITLE", "Song"));
        body.extend_from_slice(&entry("artist", "Artist"));

        let mut tokenizer = SliceTokenizer::new(&body);
        let (decoded_vendor, tags) = decode(&mut tokenizer).unwrap();
        assert_eq!(decoded_vendor, vendor);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].id, "TITLE");
        assert_eq!(tags[1].id, "ARTIST");
        assert!(matches!(&tags[1].value, NativeValue::Text(s) if s == "Artist"));
    }
}
