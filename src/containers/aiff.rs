//! AIFF/AIFC container (spec.md §4.4): `FORM...AIFF` chunk chain, mirroring
//! RIFF's structure with big-endian sizes and its own `COMM` format chunk
//! and text chunks (`NAME`/`AUTH`/`(c) `/`ANNO`).

use crate::containers::{id3v2, Emit};
use crate::error::{AudiometaError, Result};
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::{decode_string, Encoding, SliceTokenizer, Tokenizer};
use crate::value::NativeValue;

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if &magic[..] != b"FORM" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(4)?; // overall FORM size, not needed
    let form = tokenizer.read_bytes(4)?;
    if &form[..] != b"AIFF" && &form[..] != b"AIFC" {
        emit.warn("FORM type is not AIFF/AIFC, skipping chunk walk");
        return Ok(());
    }

    loop {
        let id = match tokenizer.read_bytes(4) {
            Ok(b) => b,
            Err(_) => break,
        };
        let size = match tokenizer.read_u32be() {
            Ok(s) => s,
            Err(_) => {
                emit.warn("truncated AIFF chunk header");
                break;
            }
        };
        let padded = size as u64 + (size as u64 % 2);

        match &id[..] {
            b"COMM" => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    parse_comm(&body, emit);
                    if padded > size as u64 {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated COMM chunk");
                    break;
                }
            },
            b"NAME" | b"AUTH" | b"(c) " | b"ANNO" => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    if let Ok(text) = decode_string(&body, Encoding::Latin1) {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            emit.tag(
                                TagSystem::Aiff,
                                NativeTag::new(
                                    String::from_utf8_lossy(&id).to_string(),
                                    NativeValue::Text(trimmed.to_string()),
                                ),
                            );
                        }
                    }
                    if padded > size as u64 {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated AIFF text chunk");
                    break;
                }
            },
            b"ID3 " | b"id3 " => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    let mut sub = SliceTokenizer::new(&body);
                    if let Err(e) = id3v2::parse_envelope(&mut sub, emit) {
                        if e.is_recoverable() {
                            emit.warn(format!("embedded ID3v2 chunk: {e}"));
                        } else {
                            return Err(e);
                        }
                    }
                    if padded > size as u64 {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated ID3 chunk");
                    break;
                }
            },
            _ => {
                if tokenizer.skip(padded).is_err() {
                    emit.warn("truncated AIFF chunk body");
                    break;
                }
            }
        }
    }
    Ok(())
}

fn parse_comm(body: &[u8], emit: &mut Emit) {
    if body.len() < 18 {
        emit.warn("COMM chunk shorter than the minimum layout");
        return;
    }
    let channels = u16::from_be_bytes([body[0], body[1]]);
    let num_sample_frames = u32::from_be_bytes([body[2], body[3], body[4], body[5]]);
    let bits_per_sample = u16::from_be_bytes([body[6], body[7]]);
    let sample_rate = decode_extended_f80(&body[8..18]);

    let (format, warnings) = emit.format_and_warnings();
    format.set_number_of_channels(channels.min(255) as u8, warnings);
    format.set_bits_per_sample(bits_per_sample, warnings);
    if let Some(rate) = sample_rate {
        format.set_sample_rate(rate.round() as u32, warnings);
    }
    format.set_number_of_samples(num_sample_frames as u64, warnings);
    format.set_lossless(true, warnings);
    format.set_codec("PCM", warnings);
}

/// Decodes the 80-bit IEEE 754 extended-precision float AIFF's `COMM` chunk
/// uses for the sample rate: sign+exponent in the first two bytes, a 64-bit
/// mantissa with an explicit leading integer bit in the remaining eight.
fn decode_extended_f80(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 10 {
        return None;
    }
    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (((bytes[0] as u16 & 0x7F) << 8) | bytes[1] as u16) as i32 - 16383;
    let mantissa = u64::from_be_bytes(bytes[2..10].try_into().ok()?);
    if mantissa == 0 && exponent == -16383 {
        return Some(0.0);
    }
    let value = (mantissa as f64) * 2f64.powi(exponent - 63);
    Some(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn encode_extended_f80(value: f64) -> [u8; 10] {
        let mut out = [0u8; 10];
        if value == 0.0 {
            return out;
        }
        let exponent = value.log2().floor() as i32;
        let mantissa = (value / 2f64.powi(exponent - 63)).round() as u64;
        let biased = (exponent + 16383) as u16;
        out[0] = (biased >> 8) as u8;
        out[1] = (biased & 0xFF) as u8;
        out[2..10].copy_from_slice(&mantissa.to_be_bytes());
        out
    }

    fn comm_body(channels: u16, frames: u32, bits: u16, rate: f64) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&channels.to_be_bytes());
        b.extend_from_slice(&frames.to_be_bytes());
        b.extend_from_slice(&bits.to_be_bytes());
        b.extend_from_slice(&encode_extended_f80(rate));
        b
    }

    #[test]
    fn parses_comm_sample_rate_and_frames() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut form = b"FORM".to_vec();
        form.extend_from_slice(&0u32.to_be_bytes());
        form.extend_from_slice(b"AIFF");
        form.extend(chunk(b"COMM", &comm_body(2, 1000, 16, 44100.0)));

        let mut tokenizer = SliceTokenizer::new(&form);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.number_of_samples, Some(1000));
        assert_eq!(emit.format.sample_rate, Some(44100));
    }

    #[test]
    fn parses_name_chunk_as_title_source() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut form = b"FORM".to_vec();
        form.extend_from_slice(&0u32.to_be_bytes());
        form.extend_from_slice(b"AIFF");
        form.extend(chunk(b"COMM", &comm_body(1, 1, 16, 44100.0)));
        form.extend(chunk(b"NAME", b"Song"));

        let mut tokenizer = SliceTokenizer::new(&form);
        parse(&mut tokenizer, &mut emit).unwrap();

        let tags = emit.native.get(TagSystem::Aiff).unwrap();
        assert!(tags.iter().any(|t| t.id == "NAME"));
    }
}
