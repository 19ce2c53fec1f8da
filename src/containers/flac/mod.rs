//! FLAC container (spec.md §4.4): magic + a chain of metadata blocks, the
//! first of which must be `STREAMINFO`, terminated by a block whose
//! "is last" bit is set. Audio frames following the metadata chain are out
//! of scope (no bitstream decoding, spec.md Non-goals).

pub mod blocks;

use crate::containers::vorbis;
use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tag::TagSystem;
use crate::tokenizer::Tokenizer;
use crate::value::NativeValue;

const BLOCK_STREAM_INFO: u8 = 0;
const BLOCK_PADDING: u8 = 1;
const BLOCK_APPLICATION: u8 = 2;
const BLOCK_SEEK_TABLE: u8 = 3;
const BLOCK_VORBIS_COMMENT: u8 = 4;
const BLOCK_CUE_SHEET: u8 = 5;
const BLOCK_PICTURE: u8 = 6;

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if magic != b"fLaC" {
        return Err(AudiometaError::InvalidMagicNumber);
    }

    let mut first = true;
    loop {
        let header = match tokenizer.read_bytes(4) {
            Ok(h) => h,
            Err(_) => {
                emit.warn("FLAC stream truncated inside metadata block chain");
                return Ok(());
            }
        };
        let is_last = header[0] & 0b1000_0000 != 0;
        let block_type = header[0] & 0b0111_1111;
        let length = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;

        if first && block_type != BLOCK_STREAM_INFO {
            return Err(AudiometaError::InvalidFirstBlock);
        }
        first = false;

        if let Err(e) = decode_block(tokenizer, block_type, length, emit) {
            emit.warn(format!("FLAC metadata block decode failed: {e}"));
            return Ok(());
        }

        if is_last {
            break;
        }
    }
    Ok(())
}

fn decode_block(
    tokenizer: &mut dyn Tokenizer,
    block_type: u8,
    length: usize,
    emit: &mut Emit,
) -> Result<()> {
    match block_type {
        BLOCK_STREAM_INFO => blocks::stream_info::decode(tokenizer, emit),
        BLOCK_PADDING => tokenizer.skip(length as u64),
        BLOCK_APPLICATION => blocks::application::decode(tokenizer, length, emit),
        BLOCK_SEEK_TABLE => blocks::seek_table::decode(tokenizer, length, emit),
        BLOCK_VORBIS_COMMENT => decode_comment_block(tokenizer, length, emit),
        BLOCK_CUE_SHEET => blocks::cue_sheet::decode(tokenizer, length, emit),
        BLOCK_PICTURE => decode_picture_block(tokenizer, length, emit),
        _ => tokenizer.skip(length as u64),
    }
}

fn decode_comment_block(tokenizer: &mut dyn Tokenizer, length: usize, emit: &mut Emit) -> Result<()> {
    let body = tokenizer.read_bytes(length)?;
    let mut cursor = crate::tokenizer::SliceTokenizer::new(&body);
    let (_vendor, tags) = vorbis::decode(&mut cursor)?;
    for tag in tags {
        emit.tag(TagSystem::Vorbis, tag);
    }
    Ok(())
}

fn decode_picture_block(tokenizer: &mut dyn Tokenizer, length: usize, emit: &mut Emit) -> Result<()> {
    let body = tokenizer.read_bytes(length)?;
    let picture = blocks::picture::decode_picture_body(&body)?;
    emit.tag(
        TagSystem::Vorbis,
        crate::tag::NativeTag::new("PICTURE", NativeValue::Picture(picture)),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn metadata_block(block_type: u8, is_last: bool, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let first_byte = block_type | if is_last { 0b1000_0000 } else { 0 };
        out.push(first_byte);
        let len = body.len() as u32;
        out.extend_from_slice(&len.to_be_bytes()[1..]);
        out.extend_from_slice(body);
        out
    }

    fn stream_info_body() -> Vec<u8> {
        let mut body = vec![0u8; 4];
        body.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        body.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
        body.extend_from_slice(&[0u8; 16]);
        body
    }

    #[test]
    fn rejects_missing_magic() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let mut tokenizer = SliceTokenizer::new(b"nope");
        assert!(parse(&mut tokenizer, &mut emit).is_err());
    }

    #[test]
    fn parses_stream_info_then_comment() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut data = b"fLaC".to_vec();
        data.extend(metadata_block(BLOCK_STREAM_INFO, false, &stream_info_body()));

        let mut comment_body = Vec::new();
        let vendor = "encoder";
        comment_body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        comment_body.extend_from_slice(vendor.as_bytes());
        comment_body.extend_from_slice(&1u32.to_le_bytes());
        let entry = "TITLE=Song";
        comment_body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        comment_body.extend_from_slice(entry.as_bytes());
        data.extend(metadata_block(BLOCK_VORBIS_COMMENT, true, &comment_body));

        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.sample_rate, Some(44100));
        let tags = emit.native.get(TagSystem::Vorbis).unwrap();
        assert!(tags.iter().any(|t| t.id == "TITLE"));
    }

    #[test]
    fn rejects_non_stream_info_first_block() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let mut data = b"fLaC".to_vec();
        data.extend(metadata_block(BLOCK_PADDING, true, &[0u8; 4]));
        let mut tokenizer = SliceTokenizer::new(&data);
        assert!(matches!(
            parse(&mut tokenizer, &mut emit),
            Err(AudiometaError::InvalidFirstBlock)
        ));
    }
}
