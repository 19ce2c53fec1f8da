//! ID3v2 envelope and frame dispatch (spec.md §4.3, §4.4).

mod frames;

pub(crate) use frames::id3_picture_type_name;

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tag::TagSystem;
use crate::tokenizer::{SliceTokenizer, Tokenizer};

/// The three ID3v2 major versions this crate recognizes, each its own
/// `TagSystem` (spec.md §3 closed set `ID3v2.2`/`ID3v2.3`/`ID3v2.4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Id3v2Version {
    V2,
    V3,
    V4,
}

impl Id3v2Version {
    fn tag_system(self) -> TagSystem {
        match self {
            Id3v2Version::V2 => TagSystem::Id3v22,
            Id3v2Version::V3 => TagSystem::Id3v23,
            Id3v2Version::V4 => TagSystem::Id3v24,
        }
    }

    fn frame_id_len(self) -> usize {
        match self {
            Id3v2Version::V2 => 3,
            Id3v2Version::V3 | Id3v2Version::V4 => 4,
        }
    }
}

const FLAG_UNSYNCHRONISATION: u8 = 0b1000_0000;
const FLAG_EXTENDED_HEADER: u8 = 0b0100_0000;
const FLAG_FOOTER: u8 = 0b0001_0000;

/// Reads the syncsafe 28-bit size used by the ID3v2 header/footer and by
/// extended-header lengths: each of 4 bytes carries 7 significant bits.
fn read_syncsafe_u32(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32) << 21)
        | ((bytes[1] as u32) << 14)
        | ((bytes[2] as u32) << 7)
        | (bytes[3] as u32)
}

/// Reverses ID3v2 unsynchronisation: every `0xFF 0x00` pair becomes `0xFF`
/// (spec.md §4.4 "Unsynchronisation is reversed before frame parsing").
fn undo_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        out.push(data[i]);
        if data[i] == 0xFF && i + 1 < data.len() && data[i + 1] == 0x00 {
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Parses the ID3v2 envelope at the current tokenizer position and returns
/// the number of bytes the whole tag (header + body, not including a
/// trailing footer duplicate) occupied, having emitted every recognized
/// frame as a native tag. Truncation inside the frame body is tolerated:
/// whatever frames decoded before the cutoff are kept, and the rest is
/// reported as a warning (spec.md §4.4 closing paragraph).
pub fn parse_envelope(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<u64> {
    let magic = tokenizer.read_bytes(3)?;
    if magic != b"ID3" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    let major = tokenizer.read_u8()?;
    let _revision = tokenizer.read_u8()?;
    let flags = tokenizer.read_u8()?;
    let size_bytes: [u8; 4] = tokenizer.read_bytes(4)?.try_into().unwrap();
    let tag_size = read_syncsafe_u32(size_bytes) as u64;

    let version = match major {
        2 => Id3v2Version::V2,
        3 => Id3v2Version::V3,
        4 => Id3v2Version::V4,
        other => {
            emit.warn(format!("unsupported ID3v2 major version {other}"));
            tokenizer.skip(tag_size)?;
            return Ok(tag_size + 10);
        }
    };

    let unsynchronised = flags & FLAG_UNSYNCHRONISATION != 0;
    let has_extended_header = flags & FLAG_EXTENDED_HEADER != 0;
    let has_footer = flags & FLAG_FOOTER != 0;

    let mut body = tokenizer.read_bytes(tag_size as usize)?;
    if unsynchronised {
        body = undo_unsynchronisation(&body);
    }

    let mut cursor = SliceTokenizer::new(&body);
    if has_extended_header {
        let ext_size_bytes: [u8; 4] = cursor.read_bytes(4)?.try_into().unwrap();
        let ext_size = if version == Id3v2Version::V4 {
            read_syncsafe_u32(ext_size_bytes) as u64
        } else {
            u32::from_be_bytes(ext_size_bytes) as u64
        };
        // ext_size includes the 4 bytes just read for v4; for v3 it's the
        // remaining extended-header length.
        let remaining = ext_size.saturating_sub(if version == Id3v2Version::V4 { 4 } else { 0 });
        cursor.skip(remaining)?;
    }

    frames::parse_frames(&mut cursor, version, emit);

    if has_footer {
        Ok(tag_size + 20)
    } else {
        Ok(tag_size + 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncsafe_decodes_28_bits() {
        assert_eq!(read_syncsafe_u32([0x00, 0x00, 0x02, 0x01]), 257);
    }

    #[test]
    fn unsynchronisation_strips_stuffed_zero() {
        let data = [0xFFu8, 0x00, 0xE0, 0xAB];
        assert_eq!(undo_unsynchronisation(&data), vec![0xFF, 0xE0, 0xAB]);
    }
}
