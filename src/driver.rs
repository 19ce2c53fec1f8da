//! Top-level entry points (spec.md §6): wires the tokenizer, trailer
//! scanner, sniffer, container parsers, and common-view mapper into the
//! three `parse_from_*` functions, then assembles the immutable
//! [`ParseResult`] and replays it through the observer, if one was given.

use crate::containers::{id3v2, Emit};
use crate::error::{AudiometaError, Result};
use crate::events::replay_events;
use crate::mapper;
use crate::observer::ObserverPump;
use crate::options::ParseOptions;
use crate::reader::SliceReader;
use crate::result::{ParseResult, ParseResultSnapshot};
use crate::sniff::{is_id3v2_envelope, sniff, SNIFF_WINDOW};
use crate::tag::TagSystem;
use crate::tokenizer::{SliceTokenizer, StreamTokenizer, Tokenizer};
use crate::trailer::{resolve_ape_offset, scan_trailers};
use std::io::Read;

/// Parses a forward-only byte stream. Trailer scan is always disabled: a
/// stream cannot be probed from the end without buffering it whole, which
/// this entry point deliberately avoids (spec.md §6).
pub fn parse_from_stream<R: Read>(
    reader: R,
    mime: Option<&str>,
    options: ParseOptions,
) -> Result<ParseResult> {
    let mut tokenizer = match options.file_size {
        Some(size) => StreamTokenizer::with_size_hint(reader, size),
        None => StreamTokenizer::new(reader),
    };
    let ape_offset = options.ape_offset;
    parse_core(&mut tokenizer, mime, &options, ape_offset, None)
}

/// Parses an in-memory buffer. Enables the trailer scan (spec.md §4.2), so
/// ID3v1/Lyrics3/APEv2 footers are located up front and their offsets are
/// available to `parse_core` regardless of how far the container parser
/// itself reads.
pub fn parse_from_buffer(
    bytes: &[u8],
    mime: Option<&str>,
    mut options: ParseOptions,
) -> Result<ParseResult> {
    if options.file_size.is_none() {
        options.file_size = Some(bytes.len() as u64);
    }
    let trailer = {
        let mut reader = SliceReader::new(bytes);
        scan_trailers(&mut reader)?
    };
    let ape_offset = resolve_ape_offset(&options, &trailer);
    let mut tokenizer = SliceTokenizer::new(bytes);
    parse_core(&mut tokenizer, mime, &options, ape_offset, trailer.id3v1)
}

/// Advanced entry point: drives an already-constructed tokenizer directly.
/// No trailer scan runs here (there's no [`PositionedReader`](crate::reader::PositionedReader)
/// in hand, only a `Tokenizer`), so trailing ID3v1/APEv2 tags are only
/// picked up when the caller supplies `options.ape_offset` itself, the
/// documented precedent for that option (spec.md §6, §9 Open Question).
pub fn parse_from_tokenizer(
    tokenizer: &mut dyn Tokenizer,
    mime: Option<&str>,
    options: ParseOptions,
) -> Result<ParseResult> {
    let ape_offset = options.ape_offset;
    parse_core(tokenizer, mime, &options, ape_offset, None)
}

fn parse_core(
    tokenizer: &mut dyn Tokenizer,
    mime: Option<&str>,
    options: &ParseOptions,
    ape_offset: Option<u64>,
    id3v1_offset: Option<u64>,
) -> Result<ParseResult> {
    let mut emit = Emit::new(options);

    let mut peek = tokenizer.peek_available(SNIFF_WINDOW)?;
    if is_id3v2_envelope(&peek) {
        id3v2::parse_envelope(tokenizer, &mut emit)?;
        peek = tokenizer.peek_available(SNIFF_WINDOW)?;
    }

    let container = sniff(&peek, mime).ok_or(AudiometaError::UnsupportedContainer)?;
    crate::containers::parse_container(container, tokenizer, &mut emit)?;

    emit.format
        .derive_duration(options.file_size.or_else(|| tokenizer.size()));

    if !options.skip_post_headers {
        if let Some(offset) = ape_offset {
            if container != crate::format::Container::Apev2 {
                read_trailing_apev2(tokenizer, &mut emit, offset);
            }
        }
        if let Some(offset) = id3v1_offset {
            read_trailing_id3v1(tokenizer, &mut emit, offset);
        }
    }

    let (common, map_warnings) = mapper::map(&emit.native, options);
    emit.warnings.extend(map_warnings);

    if let Some(observer) = &options.observer {
        let mut pump = ObserverPump::new(Some(observer.as_ref()));
        let snapshot = ParseResultSnapshot {
            common: common.clone(),
            format: emit.format.clone(),
        };
        for event in replay_events(&emit.format, &common) {
            pump.emit(event, &snapshot);
        }
        emit.warnings.extend(pump.into_warnings());
    }

    Ok(ParseResult {
        format: emit.format,
        common,
        native: if options.native {
            Some(emit.native)
        } else {
            None
        },
        warnings: emit.warnings,
    })
}

/// `offset` is the byte position of the footer's `APETAGEX` sentinel
/// (spec.md §6 `apeOffset`), not of the first item; `ape::decode_trailer`
/// reads the footer to find where the items actually start.
fn read_trailing_apev2(tokenizer: &mut dyn Tokenizer, emit: &mut Emit, offset: u64) {
    match crate::containers::ape::decode_trailer(tokenizer, offset) {
        Ok(tags) => {
            for tag in tags {
                emit.tag(TagSystem::Apev2, tag);
            }
        }
        Err(e) => emit.warn(format!("APEv2 trailer decode failed: {e}")),
    }
}

fn read_trailing_id3v1(tokenizer: &mut dyn Tokenizer, emit: &mut Emit, offset: u64) {
    if offset < tokenizer.position() {
        emit.warn("ID3v1 trailer offset lies behind the current read position, skipping");
        return;
    }
    if tokenizer.skip(offset - tokenizer.position()).is_err() {
        emit.warn("could not reach ID3v1 trailer offset");
        return;
    }
    let block = match tokenizer.read_bytes(128) {
        Ok(b) => b,
        Err(_) => {
            emit.warn("ID3v1 trailer truncated");
            return;
        }
    };
    let Ok(block): std::result::Result<[u8; 128], _> = block.try_into() else {
        emit.warn("ID3v1 trailer truncated");
        return;
    };
    for tag in crate::containers::id3v1::decode(&block) {
        emit.tag(TagSystem::Id3v1, tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// 44100 Hz / 2 channels / 16 bps STREAMINFO body, the same bit pattern
    /// `containers::flac::blocks::stream_info` unit-tests against.
    fn minimal_flac() -> Vec<u8> {
        let mut bytes = b"fLaC".to_vec();
        bytes.push(0b1000_0000); // last block, type STREAMINFO
        bytes.extend_from_slice(&34u32.to_be_bytes()[1..]); // 24-bit length
        bytes.extend_from_slice(&[0u8; 4]); // min/max block size
        bytes.extend_from_slice(&[0u8; 6]); // min/max frame size
        bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0u8; 16]); // md5
        bytes
    }

    #[test]
    fn parses_minimal_flac_from_buffer() {
        let bytes = minimal_flac();
        let result = parse_from_buffer(&bytes, None, ParseOptions::default()).unwrap();
        assert_eq!(result.format.container, Some(crate::format::Container::Flac));
        assert_eq!(result.format.sample_rate, Some(44100));
        assert_eq!(result.format.number_of_channels, Some(2));
    }

    #[test]
    fn unsupported_container_is_an_error() {
        let bytes = vec![0u8; 16];
        let err = parse_from_buffer(&bytes, None, ParseOptions::default()).unwrap_err();
        assert!(matches!(err, AudiometaError::UnsupportedContainer));
    }

    #[test]
    fn stream_and_buffer_agree_on_format_and_common() {
        let bytes = minimal_flac();
        let from_buffer = parse_from_buffer(&bytes, None, ParseOptions::default()).unwrap();
        let from_stream =
            parse_from_stream(Cursor::new(bytes.clone()), None, ParseOptions::default()).unwrap();
        assert_eq!(from_buffer.format.container, from_stream.format.container);
        assert_eq!(from_buffer.format.sample_rate, from_stream.format.sample_rate);
        assert_eq!(from_buffer.common.title, from_stream.common.title);
    }
}
