//! APEv2 tag decoder (spec.md §4.4), shared by the standalone `apev2`
//! container and by WavPack/Musepack/DSF, which usually carry their tags
//! in a trailing APEv2 block located via `options.apeOffset`.

use crate::error::{AudiometaError, Result};
use crate::tag::NativeTag;
use crate::tokenizer::{decode_string, Encoding, Tokenizer};
use crate::value::NativeValue;

const ITEM_TYPE_MASK: u32 = 0b0000_0110;
const ITEM_TYPE_UTF8: u32 = 0;
const ITEM_TYPE_EXTERNAL: u32 = 0b0000_0100;
const FOOTER_SIZE: u64 = 32;

/// Decodes an APEv2 header (`APETAGEX` sentinel, version, tag size, item
/// count, flags, 8 reserved bytes) followed by `item count` items, each a
/// UTF-8 key and a value whose type is declared in its flags (spec.md
/// §4.4).
pub fn decode(tokenizer: &mut dyn Tokenizer) -> Result<Vec<NativeTag>> {
    let preamble = tokenizer.read_bytes(8)?;
    if preamble != b"APETAGEX" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    let _version = tokenizer.read_u32le()?;
    let _tag_size = tokenizer.read_u32le()?;
    let item_count = tokenizer.read_u32le()?;
    let _flags = tokenizer.read_u32le()?;
    tokenizer.skip(8)?; // reserved

    decode_items(tokenizer, item_count)
}

/// Decodes a trailing APEv2 tag given the byte offset of its footer
/// (spec.md §6 `apeOffset`: "byte offset of APEv2 footer"). The footer
/// carries `item_count` and the tag's total size, but the items themselves
/// sit *before* it, so this reads the footer, derives where the first item
/// starts, seeks back to it, and decodes forward from there. Requires a
/// tokenizer that supports backward seeking (spec.md §4.1: stream-backed
/// tokenizers don't); returns `UnsupportedFeature` otherwise.
pub fn decode_trailer(tokenizer: &mut dyn Tokenizer, footer_offset: u64) -> Result<Vec<NativeTag>> {
    let seekable = tokenizer.as_seekable().ok_or_else(|| {
        AudiometaError::UnsupportedFeature("APEv2 trailer needs a seekable tokenizer".into())
    })?;
    seekable.seek_to(footer_offset)?;
    let preamble = seekable.read_bytes(8)?;
    if preamble != b"APETAGEX" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    let _version = seekable.read_u32le()?;
    let tag_size = seekable.read_u32le()? as u64;
    let item_count = seekable.read_u32le()?;
    let _flags = seekable.read_u32le()?;

    // `tag_size` covers the items plus this footer, excluding any separate
    // header.
    let items_size = tag_size.saturating_sub(FOOTER_SIZE);
    let items_start = footer_offset.saturating_sub(items_size);
    seekable.seek_to(items_start)?;
    decode_items(seekable, item_count)
}

/// Decodes `item_count` items starting at the tokenizer's current
/// position, without requiring a header (used by [`decode`] for its body,
/// and by [`decode_trailer`] once it has seeked past a footer-only tag's
/// header position).
pub fn decode_items<T: Tokenizer + ?Sized>(tokenizer: &mut T, item_count: u32) -> Result<Vec<NativeTag>> {
    let mut tags = Vec::with_capacity(item_count as usize);
    for _ in 0..item_count {
        let value_size = match tokenizer.read_u32le() {
            Ok(v) => v,
            Err(_) => break,
        };
        let flags = match tokenizer.read_u32le() {
            Ok(v) => v,
            Err(_) => break,
        };
        let key = match tokenizer.read_terminated_string(Encoding::Utf8) {
            Ok(k) => k,
            Err(_) => break,
        };
        let value_bytes = match tokenizer.read_bytes(value_size as usize) {
            Ok(v) => v,
            Err(_) => break,
        };

        let value = match flags & ITEM_TYPE_MASK {
            ITEM_TYPE_UTF8 => {
                // Several UTF-8 values may be NUL-separated (the APEv2
                // spec's multi-value convention); only the first is kept
                // as this tag's value and the rest are appended as
                // additional tags with the same key, preserving arrival
                // order the way the native tag set requires.
                let text = decode_string(&value_bytes, Encoding::Utf8)?;
                let mut parts = text.split('\0').filter(|s| !s.is_empty());
                let first = parts.next().unwrap_or("").to_string();
                for extra in parts {
                    tags.push(NativeTag::new(key.clone(), NativeValue::Text(extra.to_string())));
                }
                NativeValue::Text(first)
            }
            ITEM_TYPE_EXTERNAL => {
                NativeValue::Text(decode_string(&value_bytes, Encoding::Utf8)?)
            }
            _ => NativeValue::Binary(value_bytes),
        };

        tags.push(NativeTag::new(key, value));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::SliceTokenizer;

    fn build_item(key: &str, value: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.push(0);
        buf.extend_from_slice(value.as_bytes());
        buf
    }

    #[test]
    fn decodes_header_and_items() {
        let mut body = Vec::new();
        body.extend_from_slice(b"APETAGEX");
        body.extend_from_slice(&2000u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // tag size (unused by decoder)
        body.extend_from_slice(&2u32.to_le_bytes()); // item count
        body.extend_from_slice(&0u32.to_le_bytes()); // flags
        body.extend_from_slice(&[0u8; 8]); // reserved
        body.extend_from_slice(&build_item("REPLAYGAIN_TRACK_GAIN", "-6.00 dB"));
        body.extend_from_slice(&build_item("REPLAYGAIN_TRACK_PEAK", "0.988"));

        let mut tokenizer = SliceTokenizer::new(&body);
        let tags = decode(&mut tokenizer).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].id, "REPLAYGAIN_TRACK_GAIN");
        assert!(matches!(&tags[0].value, NativeValue::Text(s) if s == "-6.00 dB"));
    }

    /// Mirrors spec.md §8's WavPack scenario: a footer-only APEv2 tag
    /// (no header) sitting after some unrelated leading bytes, located by
    /// its footer offset alone.
    #[test]
    fn decode_trailer_reads_items_behind_the_footer() {
        let mut items = Vec::new();
        items.extend_from_slice(&build_item("REPLAYGAIN_TRACK_GAIN", "-6.00 dB"));
        items.extend_from_slice(&build_item("REPLAYGAIN_TRACK_PEAK", "0.988"));

        let mut data = vec![0u8; 16]; // unrelated audio bytes preceding the tag
        let footer_offset = (data.len() + items.len()) as u64;
        data.extend_from_slice(&items);
        data.extend_from_slice(b"APETAGEX");
        data.extend_from_slice(&2000u32.to_le_bytes());
        data.extend_from_slice(&((items.len() + 32) as u32).to_le_bytes()); // tag size
        data.extend_from_slice(&2u32.to_le_bytes()); // item count
        data.extend_from_slice(&0u32.to_le_bytes()); // flags
        data.extend_from_slice(&[0u8; 8]); // reserved

        let mut tokenizer = SliceTokenizer::new(&data);
        let tags = decode_trailer(&mut tokenizer, footer_offset).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].id, "REPLAYGAIN_TRACK_GAIN");
        assert!(matches!(&tags[0].value, NativeValue::Text(s) if s == "-6.00 dB"));
        assert_eq!(tags[1].id, "REPLAYGAIN_TRACK_PEAK");
        assert!(matches!(&tags[1].value, NativeValue::Text(s) if s == "0.988"));
    }
}
