//! ASF/WMA container (spec.md §4.4): a tree of GUID-tagged objects under
//! the Header Object. Only the top-level objects that carry format facts
//! or tags are decoded: File Properties, Stream Properties (audio media
//! type only), Content Description, and Extended Content Description.
//! Header Extension's nested Metadata/Metadata Library objects (where a
//! handful of WMA encoders stash extra tags) aren't walked (a "design
//! level, not exhaustive byte layouts" simplification for this container.

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::{decode_string, Encoding, Tokenizer};
use crate::value::NativeValue;

const HEADER_OBJECT_GUID: [u8; 16] = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const FILE_PROPERTIES_GUID: [u8; 16] = [
    0x8C, 0xAB, 0xDC, 0xA1, 0xA9, 0x47, 0x11, 0xCF, 0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65,
];
const CONTENT_DESCRIPTION_GUID: [u8; 16] = [
    0x33, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];
const EXTENDED_CONTENT_DESCRIPTION_GUID: [u8; 16] = [
    0x40, 0xA4, 0xD0, 0xD2, 0x07, 0xE3, 0xD2, 0x11, 0x97, 0xF0, 0x00, 0xA0, 0xC9, 0x5E, 0xA8, 0x50,
];
const STREAM_PROPERTIES_GUID: [u8; 16] = [
    0x91, 0x07, 0xDC, 0xB7, 0xB7, 0xA9, 0xCF, 0x11, 0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65,
];
const AUDIO_MEDIA_GUID: [u8; 16] = [
    0x40, 0x9E, 0x69, 0xF8, 0x4D, 0x5B, 0xCF, 0x11, 0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B,
];

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let header_guid = tokenizer.read_bytes(16)?;
    if header_guid[..] != HEADER_OBJECT_GUID {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(8)?; // header object size, not needed
    let object_count = tokenizer.read_u32le()?;
    tokenizer.skip(2)?; // reserved1 + reserved2

    for _ in 0..object_count {
        let guid = match tokenizer.read_bytes(16) {
            Ok(g) => g,
            Err(_) => break,
        };
        let size = match tokenizer.read_u64le() {
            Ok(s) => s,
            Err(_) => {
                emit.warn("truncated ASF object header");
                break;
            }
        };
        let body_len = size.saturating_sub(24) as usize;
        let body = match tokenizer.read_bytes(body_len) {
            Ok(b) => b,
            Err(_) => {
                emit.warn("truncated ASF object body");
                break;
            }
        };

        if guid[..] == FILE_PROPERTIES_GUID {
            parse_file_properties(&body, emit);
        } else if guid[..] == CONTENT_DESCRIPTION_GUID {
            parse_content_description(&body, emit);
        } else if guid[..] == EXTENDED_CONTENT_DESCRIPTION_GUID {
            parse_extended_content_description(&body, emit);
        } else if guid[..] == STREAM_PROPERTIES_GUID {
            parse_stream_properties(&body, emit);
        }
    }
    Ok(())
}

fn parse_file_properties(body: &[u8], emit: &mut Emit) {
    if body.len() < 80 {
        emit.warn("File Properties object shorter than expected");
        return;
    }
    let play_duration = u64::from_le_bytes(body[40..48].try_into().unwrap());
    let preroll = u64::from_le_bytes(body[56..64].try_into().unwrap());
    let max_bitrate = u32::from_le_bytes(body[76..80].try_into().unwrap());

    let seconds = (play_duration as f64 / 10_000_000.0) - (preroll as f64 / 1000.0);
    let (format, warnings) = emit.format_and_warnings();
    if seconds > 0.0 {
        format.set_duration(seconds, warnings);
    }
    if max_bitrate > 0 {
        format.set_bitrate(max_bitrate, warnings);
    }
}

fn parse_content_description(body: &[u8], emit: &mut Emit) {
    if body.len() < 10 {
        emit.warn("Content Description object shorter than expected");
        return;
    }
    let lens: Vec<usize> = (0..5)
        .map(|i| u16::from_le_bytes([body[i * 2], body[i * 2 + 1]]) as usize)
        .collect();
    let mut pos = 10;
    let names = ["Title", "Author", "Copyright", "Description", "Rating"];
    for (i, len) in lens.iter().enumerate() {
        if pos + len > body.len() {
            emit.warn("Content Description string runs past the object body");
            break;
        }
        let bytes = &body[pos..pos + len];
        if let Ok(text) = decode_string(bytes, Encoding::Utf16Le) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                emit.tag(
                    TagSystem::Asf,
                    NativeTag::new(names[i], NativeValue::Text(trimmed.to_string())),
                );
            }
        }
        pos += len;
    }
}

fn parse_extended_content_description(body: &[u8], emit: &mut Emit) {
    if body.len() < 2 {
        return;
    }
    let count = u16::from_le_bytes([body[0], body[1]]);
    let mut pos = 2;
    for _ in 0..count {
        if pos + 2 > body.len() {
            emit.warn("truncated extended content descriptor");
            break;
        }
        let name_len = u16::from_le_bytes([body[pos], body[pos + 1]]) as usize;
        pos += 2;
        if pos + name_len > body.len() {
            emit.warn("truncated extended content descriptor name");
            break;
        }
        let name = decode_string(&body[pos..pos + name_len], Encoding::Utf16Le).unwrap_or_default();
        pos += name_len;
        if pos + 4 > body.len() {
            emit.warn("truncated extended content descriptor value header");
            break;
        }
        let value_type = u16::from_le_bytes([body[pos], body[pos + 1]]);
        let value_len = u16::from_le_bytes([body[pos + 2], body[pos + 3]]) as usize;
        pos += 4;
        if pos + value_len > body.len() {
            emit.warn("truncated extended content descriptor value");
            break;
        }
        let value_bytes = &body[pos..pos + value_len];
        pos += value_len;

        let value = match value_type {
            0 => NativeValue::Text(decode_string(value_bytes, Encoding::Utf16Le).unwrap_or_default()),
            1 => NativeValue::Binary(value_bytes.to_vec()),
            2 => NativeValue::Bool(value_bytes.first().copied().unwrap_or(0) != 0),
            3 => NativeValue::Int(
                value_bytes
                    .get(0..4)
                    .map(|b| u32::from_le_bytes(b.try_into().unwrap()) as i64)
                    .unwrap_or(0),
            ),
            4 => NativeValue::Int(
                value_bytes
                    .get(0..8)
                    .map(|b| u64::from_le_bytes(b.try_into().unwrap()) as i64)
                    .unwrap_or(0),
            ),
            5 => NativeValue::Int(
                value_bytes
                    .get(0..2)
                    .map(|b| u16::from_le_bytes(b.try_into().unwrap()) as i64)
                    .unwrap_or(0),
            ),
            _ => NativeValue::Binary(value_bytes.to_vec()),
        };
        if !name.trim().is_empty() {
            emit.tag(TagSystem::Asf, NativeTag::new(name, value));
        }
    }
}

fn parse_stream_properties(body: &[u8], emit: &mut Emit) {
    if body.len() < 54 {
        return;
    }
    if body[0..16] != AUDIO_MEDIA_GUID {
        return;
    }
    let type_specific_len = u32::from_le_bytes(body[40..44].try_into().unwrap()) as usize;
    let available = body.len().saturating_sub(54);
    let data = &body[54..54 + type_specific_len.min(available)];
    if data.len() < 16 {
        return;
    }
    let format_tag = u16::from_le_bytes([data[0], data[1]]);
    let channels = u16::from_le_bytes([data[2], data[3]]);
    let sample_rate = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let avg_bytes_per_sec = u32::from_le_bytes(data[8..12].try_into().unwrap());
    let bits_per_sample = u16::from_le_bytes([data[14], data[15]]);

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec(codec_name(format_tag), warnings);
    format.set_sample_rate(sample_rate, warnings);
    format.set_number_of_channels(channels.min(255) as u8, warnings);
    format.set_bits_per_sample(bits_per_sample, warnings);
    format.set_bitrate(avg_bytes_per_sec.saturating_mul(8), warnings);
    format.set_lossless(format_tag == 0x0001, warnings);
}

fn codec_name(format_tag: u16) -> &'static str {
    match format_tag {
        0x0001 => "PCM",
        0x000A => "WMA Voice",
        0x0160 => "Windows Media Audio 1",
        0x0161 => "Windows Media Audio 2",
        0x0162 => "Windows Media Audio 9 Professional",
        0x0163 => "Windows Media Audio 9 Lossless",
        _ => "Windows Media Audio",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn object(guid: [u8; 16], body: &[u8]) -> Vec<u8> {
        let mut out = guid.to_vec();
        out.extend_from_slice(&((body.len() + 24) as u64).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn content_description(title: &str) -> Vec<u8> {
        let mut title_bytes: Vec<u8> = title.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        title_bytes.extend_from_slice(&[0, 0]); // NUL terminator
        let mut body = Vec::new();
        body.extend_from_slice(&(title_bytes.len() as u16).to_le_bytes());
        for _ in 0..4 {
            body.extend_from_slice(&0u16.to_le_bytes());
        }
        body.extend_from_slice(&title_bytes);
        body
    }

    #[test]
    fn parses_content_description_title() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut stream = HEADER_OBJECT_GUID.to_vec();
        let objects = object(CONTENT_DESCRIPTION_GUID, &content_description("Song"));
        stream.extend_from_slice(&((24 + 2 + objects.len()) as u64).to_le_bytes());
        stream.extend_from_slice(&1u32.to_le_bytes());
        stream.extend_from_slice(&[0, 0]); // reserved
        stream.extend(objects);

        let mut tokenizer = SliceTokenizer::new(&stream);
        parse(&mut tokenizer, &mut emit).unwrap();

        let tags = emit.native.get(TagSystem::Asf).unwrap();
        assert!(tags
            .iter()
            .any(|t| t.id == "Title" && matches!(&t.value, NativeValue::Text(s) if s == "Song")));
    }
}
