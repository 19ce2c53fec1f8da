//! Musepack container (spec.md §4.4): two on-wire generations share the
//! name. SV7 (`MP+`) is a fixed header; SV8 (`MPCK`) is a sequence of
//! key+length packets, the `SH` (stream header) packet carrying the
//! format facts this crate extracts. Both generations carry their tags in
//! a trailing APEv2 footer; the driver's post-container pass handles it,
//! not this module.

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tokenizer::Tokenizer;

const SV7_SAMPLE_RATES: [u32; 4] = [44100, 48000, 37800, 32000];

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    match &magic[..] {
        b"MPCK" => parse_sv8(tokenizer, emit),
        _ if &magic[0..3] == b"MP+" => parse_sv7(tokenizer, &magic, emit),
        _ => Err(AudiometaError::InvalidMagicNumber),
    }
}

fn parse_sv7(tokenizer: &mut dyn Tokenizer, magic: &[u8], emit: &mut Emit) -> Result<()> {
    let version = magic[3] & 0x0F;
    let frame_count = tokenizer.read_u32le()?;
    let _max_level = tokenizer.read_u16le()?;
    let flags = tokenizer.read_u16le()?;

    let sample_rate_index = ((flags >> 13) & 0b11) as usize;
    let sample_rate = SV7_SAMPLE_RATES[sample_rate_index];

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec(format!("Musepack SV{version}"), warnings);
    format.set_sample_rate(sample_rate, warnings);
    format.set_number_of_channels(2, warnings);
    format.set_lossless(false, warnings);
    // SV7 frames are always 1152 samples; the final frame is shorter by an
    // amount this header doesn't carry, so the derived total is an
    // approximation, consistent with this crate's "design level" parsers.
    format.set_number_of_samples(frame_count as u64 * 1152, warnings);

    Ok(())
}

fn read_vlq(tokenizer: &mut dyn Tokenizer) -> Result<u64> {
    let mut value: u64 = 0;
    loop {
        let byte = tokenizer.read_u8()?;
        value = (value << 7) | (byte & 0x7F) as u64;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(value)
}

fn parse_sv8(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("Musepack SV8", warnings);
    format.set_lossless(false, warnings);

    loop {
        let key = match tokenizer.read_bytes(2) {
            Ok(k) => k,
            Err(_) => break,
        };
        let packet_size = match read_vlq(tokenizer) {
            Ok(s) => s,
            Err(_) => {
                emit.warn("Musepack SV8 packet size truncated");
                break;
            }
        };
        // packet_size includes the 2-byte key and the size field itself;
        // its own encoded width isn't known ahead of time, so the body
        // length is derived from what's declared minus what's been read.
        let body_len = packet_size.saturating_sub(2);
        let body_len = body_len.min(packet_size); // guards against underflow on malformed input

        match &key[..] {
            b"SH" => {
                let body = tokenizer.read_bytes(body_len as usize)?;
                decode_sv8_stream_header(&body, emit);
            }
            b"SE" => break,
            _ => {
                if tokenizer.skip(body_len).is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn decode_sv8_stream_header(body: &[u8], emit: &mut Emit) {
    if body.len() < 5 {
        emit.warn("Musepack SV8 stream header packet too short");
        return;
    }
    // CRC (4 bytes) + stream version (1 byte) precede the VLQ-encoded
    // sample count / silence fields this crate doesn't otherwise need.
    let sample_count_region = &body[5..];
    let mut cursor = crate::tokenizer::SliceTokenizer::new(sample_count_region);
    let sample_count = cursor.read_u32be().unwrap_or(0) as u64;

    let (format, warnings) = emit.format_and_warnings();
    format.set_sample_rate(44_100, warnings);
    format.set_number_of_channels(2, warnings);
    if sample_count > 0 {
        format.set_number_of_samples(sample_count, warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    #[test]
    fn decodes_sv7_header() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut data = b"MP+\x07".to_vec();
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes()); // flags, rate index 0 == 44100

        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.codec.as_deref(), Some("Musepack SV7"));
    }

    #[test]
    fn rejects_bad_magic() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let mut tokenizer = SliceTokenizer::new(b"nope");
        assert!(parse(&mut tokenizer, &mut emit).is_err());
    }
}
