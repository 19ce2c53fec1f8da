//! RIFF/WAVE container (spec.md §4.4): a flat chain of top-level chunks.
//! `fmt ` supplies format facts, `data` supplies the sample count, `LIST
//! INFO` supplies native tags, and an embedded `id3 `/`ID3 ` chunk is
//! handed to the ID3v2 envelope parser directly.

use crate::containers::{id3v2, Emit};
use crate::error::{AudiometaError, Result};
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::{decode_string, Encoding, SliceTokenizer, Tokenizer};
use crate::value::NativeValue;

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if &magic[..] != b"RIFF" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(4)?; // overall RIFF size, not needed
    let form = tokenizer.read_bytes(4)?;
    if &form[..] != b"WAVE" {
        emit.warn("RIFF form type is not WAVE, skipping chunk walk");
        return Ok(());
    }

    let mut data_size: Option<u64> = None;
    let mut block_align: Option<u16> = None;

    loop {
        let id = match tokenizer.read_bytes(4) {
            Ok(b) => b,
            Err(_) => break,
        };
        let size = match tokenizer.read_u32le() {
            Ok(s) => s,
            Err(_) => {
                emit.warn("truncated RIFF chunk header");
                break;
            }
        };
        let padded = size as u64 + (size as u64 % 2);

        match &id[..] {
            b"fmt " => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    block_align = parse_fmt(&body, emit);
                    if padded > size as u64 {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated fmt chunk");
                    break;
                }
            },
            b"data" => {
                data_size = Some(size as u64);
                if tokenizer.skip(padded).is_err() {
                    emit.warn("data chunk shorter than its declared size");
                    break;
                }
            }
            b"LIST" => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    if body.starts_with(b"INFO") {
                        parse_info(&body[4..], emit);
                    }
                    if padded > size as u64 {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated LIST chunk");
                    break;
                }
            },
            b"id3 " | b"ID3 " => match tokenizer.read_bytes(size as usize) {
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
                    emit.warn("truncated id3 chunk");
                    break;
                }
            },
            _ => {
                if tokenizer.skip(padded).is_err() {
                    emit.warn("truncated RIFF chunk body");
                    break;
                }
            }
        }
    }

    if let (Some(size), Some(align)) = (data_size, block_align) {
        if align > 0 {
            let (format, warnings) = emit.format_and_warnings();
            format.set_number_of_samples(size / align as u64, warnings);
        }
    }

    Ok(())
}

/// `fmt ` chunk: format tag, channels, sample rate, byte rate, block
/// align, bits per sample. Returns the block align, needed once `data`'s
/// size is known to derive a sample count.
fn parse_fmt(body: &[u8], emit: &mut Emit) -> Option<u16> {
    if body.len() < 16 {
        emit.warn("fmt chunk shorter than the minimum PCM layout");
        return None;
    }
    let format_tag = u16::from_le_bytes([body[0], body[1]]);
    let channels = u16::from_le_bytes([body[2], body[3]]);
    let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let byte_rate = u32::from_le_bytes([body[8], body[9], body[10], body[11]]);
    let block_align = u16::from_le_bytes([body[12], body[13]]);
    let bits_per_sample = u16::from_le_bytes([body[14], body[15]]);

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec(codec_name(format_tag), warnings);
    format.set_sample_rate(sample_rate, warnings);
    format.set_number_of_channels(channels.min(255) as u8, warnings);
    format.set_bits_per_sample(bits_per_sample, warnings);
    format.set_bitrate(byte_rate.saturating_mul(8), warnings);
    format.set_lossless(format_tag == 1 || format_tag == 3, warnings);
    Some(block_align)
}

fn codec_name(format_tag: u16) -> &'static str {
    match format_tag {
        1 => "PCM",
        3 => "IEEE Float",
        6 => "A-law",
        7 => "Mu-law",
        0xFFFE => "Extensible",
        _ => "unknown",
    }
}

fn parse_info(body: &[u8], emit: &mut Emit) {
    let mut pos = 0;
    while pos + 8 <= body.len() {
        let id = &body[pos..pos + 4];
        let size = u32::from_le_bytes(body[pos + 4..pos + 8].try_into().unwrap()) as usize;
        pos += 8;
        if pos + size > body.len() {
            emit.warn("truncated RIFF INFO subchunk");
            break;
        }
        let value_bytes = &body[pos..pos + size];
        let end = value_bytes
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(value_bytes.len());
        if let Ok(value) = decode_string(&value_bytes[..end], Encoding::Latin1) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                emit.tag(
                    TagSystem::Riff,
                    NativeTag::new(
                        String::from_utf8_lossy(id).to_string(),
                        NativeValue::Text(trimmed.to_string()),
                    ),
                );
            }
        }
        pos += size + (size % 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn fmt_body() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&1u16.to_le_bytes()); // PCM
        b.extend_from_slice(&2u16.to_le_bytes()); // channels
        b.extend_from_slice(&44100u32.to_le_bytes());
        b.extend_from_slice(&(44100 * 4u32).to_le_bytes()); // byte rate
        b.extend_from_slice(&4u16.to_le_bytes()); // block align
        b.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        b
    }

    #[test]
    fn parses_fmt_and_data_into_format_facts() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut riff = b"RIFF".to_vec();
        riff.extend_from_slice(&0u32.to_le_bytes());
        riff.extend_from_slice(b"WAVE");
        riff.extend(chunk(b"fmt ", &fmt_body()));
        riff.extend(chunk(b"data", &[0u8; 400]));

        let mut tokenizer = SliceTokenizer::new(&riff);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.number_of_samples, Some(100));
    }

    #[test]
    fn parses_list_info_title() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut info = b"INFO".to_vec();
        info.extend(chunk(b"INAM", b"Song\0"));

        let mut riff = b"RIFF".to_vec();
        riff.extend_from_slice(&0u32.to_le_bytes());
        riff.extend_from_slice(b"WAVE");
        riff.extend(chunk(b"fmt ", &fmt_body()));
        riff.extend(chunk(b"LIST", &info));

        let mut tokenizer = SliceTokenizer::new(&riff);
        parse(&mut tokenizer, &mut emit).unwrap();

        let tags = emit.native.get(TagSystem::Riff).unwrap();
        assert!(tags
            .iter()
            .any(|t| t.id == "INAM" && matches!(&t.value, NativeValue::Text(s) if s == "Song")));
    }
}
