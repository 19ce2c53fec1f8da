//! MP4/QuickTime atom tree (spec.md §4.4 "design level, not exhaustive
//! byte layouts"): a box header is a 4-byte big-endian size followed by a
//! 4-byte type, with a 64-bit extended size when the 32-bit one reads as 1.
//! `moov/trak/mdia/minf/stbl` feeds format facts; `moov/udta/meta/ilst`
//! feeds iTunes tags, whose children are typed `data` atoms.

use crate::containers::Emit;
use crate::error::Result;
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::{Encoding, Tokenizer};
use crate::value::{NativeValue, OfTotal, Picture};

struct AtomHeader {
    kind: [u8; 4],
    body_len: u64,
}

fn read_atom_header(tokenizer: &mut dyn Tokenizer) -> Result<Option<AtomHeader>> {
    let size_bytes = match tokenizer.read_bytes(4) {
        Ok(b) => b,
        Err(_) => return Ok(None),
    };
    let kind_bytes = tokenizer.read_bytes(4)?;
    let kind: [u8; 4] = kind_bytes.try_into().unwrap();
    let size32 = u32::from_be_bytes(size_bytes.try_into().unwrap());

    let total_len = if size32 == 1 {
        tokenizer.read_u64be()?
    } else {
        size32 as u64
    };
    // A size of 0 means "extends to end of file"; not representable without
    // a known stream length, so such atoms are treated as unbounded and
    // their contents skipped by the caller's truncation handling instead.
    let header_len = if size32 == 1 { 16 } else { 8 };
    let body_len = total_len.saturating_sub(header_len);
    Ok(Some(AtomHeader { kind, body_len }))
}

fn is_container(kind: &[u8; 4]) -> bool {
    matches!(kind, b"moov" | b"trak" | b"mdia" | b"minf" | b"stbl" | b"udta")
}

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    walk(tokenizer, u64::MAX, emit)
}

/// Walks sibling atoms until `budget` bytes have been consumed (or the
/// source runs out, whichever first (`u64::MAX` means "until EOF").
fn walk(tokenizer: &mut dyn Tokenizer, budget: u64, emit: &mut Emit) -> Result<()> {
    let start = tokenizer.position();
    loop {
        if tokenizer.position().saturating_sub(start) >= budget {
            break;
        }
        let header = match read_atom_header(tokenizer) {
            Ok(Some(h)) => h,
            Ok(None) => break,
            Err(_) => {
                emit.warn("MP4 atom header truncated");
                break;
            }
        };

        if &header.kind == b"ftyp" {
            emit.format.set_container(
                crate::format::Container::Mp4,
                &mut emit.warnings,
            );
            tokenizer.skip(header.body_len)?;
            continue;
        }

        if is_container(&header.kind) {
            if let Err(e) = walk(tokenizer, header.body_len, emit) {
                emit.warn(format!("MP4 atom {:?} truncated: {e}", String::from_utf8_lossy(&header.kind)));
                break;
            }
            continue;
        }

        match &header.kind {
            b"meta" => {
                // `meta` carries a 4-byte version/flags header before its children.
                tokenizer.skip(4.min(header.body_len))?;
                if let Err(e) = walk(tokenizer, header.body_len.saturating_sub(4), emit) {
                    emit.warn(format!("MP4 meta atom truncated: {e}"));
                    break;
                }
            }
            b"ilst" => {
                if let Err(e) = parse_ilst(tokenizer, header.body_len, emit) {
                    emit.warn(format!("MP4 ilst atom truncated: {e}"));
                    break;
                }
            }
            b"mdhd" => {
                if let Err(e) = parse_mdhd(tokenizer, header.body_len, emit) {
                    emit.warn(format!("MP4 mdhd atom truncated: {e}"));
                    break;
                }
            }
            b"stsd" => {
                if let Err(e) = parse_stsd(tokenizer, header.body_len, emit) {
                    emit.warn(format!("MP4 stsd atom truncated: {e}"));
                    break;
                }
            }
            _ => {
                if tokenizer.skip(header.body_len).is_err() {
                    emit.warn("MP4 atom body truncated");
                    break;
                }
            }
        }
    }
    Ok(())
}

fn parse_mdhd(tokenizer: &mut dyn Tokenizer, body_len: u64, emit: &mut Emit) -> Result<()> {
    let version = tokenizer.read_u8()?;
    tokenizer.skip(3)?; // flags
    let (timescale, duration, consumed) = if version == 1 {
        tokenizer.skip(16)?; // creation/modification time, 64-bit each
        let timescale = tokenizer.read_u32be()?;
        let duration = tokenizer.read_u64be()?;
        (timescale, duration, 4 + 16 + 4 + 8)
    } else {
        tokenizer.skip(8)?; // creation/modification time, 32-bit each
        let timescale = tokenizer.read_u32be()?;
        let duration = tokenizer.read_u32be()? as u64;
        (timescale, duration, 4 + 8 + 4 + 4)
    };
    if timescale > 0 {
        let (format, warnings) = emit.format_and_warnings();
        format.derive_duration(None);
        if format.duration.is_none() {
            format.duration = Some(duration as f64 / timescale as f64);
        }
        let _ = warnings;
    }
    tokenizer.skip(body_len.saturating_sub(consumed))?;
    Ok(())
}

fn parse_stsd(tokenizer: &mut dyn Tokenizer, body_len: u64, emit: &mut Emit) -> Result<()> {
    tokenizer.skip(4)?; // version/flags
    let entry_count = tokenizer.read_u32be()?;
    let mut consumed: u64 = 8;
    for _ in 0..entry_count {
        if consumed >= body_len {
            break;
        }
        let entry_size = tokenizer.read_u32be()? as u64;
        let entry_kind = tokenizer.read_bytes(4)?;
        consumed += 8;
        if entry_kind == b"mp4a" || entry_kind == b"alac" {
            // SampleEntry(8) + reserved(6) + data_reference_index(2) +
            // reserved(8) + channel_count(2) + sample_size(2) + predefined(2)
            // + reserved(2) + sample_rate as 16.16 fixed point(4).
            tokenizer.skip(6 + 2 + 8)?;
            let channels = tokenizer.read_u16be()?;
            let sample_size = tokenizer.read_u16be()?;
            tokenizer.skip(4)?; // predefined + reserved
            let sample_rate_fixed = tokenizer.read_u32be()?;
            let sample_rate = sample_rate_fixed >> 16;

            let codec = if entry_kind == b"alac" { "ALAC" } else { "AAC" };
            let (format, warnings) = emit.format_and_warnings();
            format.set_codec(codec, warnings);
            if sample_rate > 0 {
                format.set_sample_rate(sample_rate, warnings);
            }
            if channels > 0 {
                format.set_number_of_channels(channels as u8, warnings);
            }
            if sample_size > 0 {
                format.set_bits_per_sample(sample_size, warnings);
            }
            format.set_lossless(entry_kind == b"alac", warnings);

            let remaining = entry_size.saturating_sub(8 + 6 + 2 + 8 + 2 + 2 + 4 + 4);
            tokenizer.skip(remaining)?;
        } else {
            tokenizer.skip(entry_size.saturating_sub(8))?;
        }
        consumed += entry_size.saturating_sub(8);
    }
    tokenizer.skip(body_len.saturating_sub(consumed))?;
    Ok(())
}

fn parse_ilst(tokenizer: &mut dyn Tokenizer, body_len: u64, emit: &mut Emit) -> Result<()> {
    let start = tokenizer.position();
    loop {
        if tokenizer.position().saturating_sub(start) >= body_len {
            break;
        }
        let header = match read_atom_header(tokenizer)? {
            Some(h) => h,
            None => break,
        };
        let key = ilst_key(&header.kind);
        let value = parse_ilst_item_data(tokenizer, header.body_len)?;
        if let Some(value) = value {
            emit.tag(TagSystem::ITunes, NativeTag::new(key, value));
        }
    }
    Ok(())
}

/// `©`-prefixed atom names are stored as Latin-1 bytes in the fourcc; MP4
/// fourccs are otherwise ASCII, so this round-trips through Latin-1 rather
/// than assuming UTF-8.
fn ilst_key(kind: &[u8; 4]) -> String {
    crate::tokenizer::decode_string(kind, Encoding::Latin1).unwrap_or_else(|_| "????".to_string())
}

/// An `ilst` child atom (e.g. `©nam`, `trkn`, `covr`) itself holds a `data`
/// child carrying a class byte and the typed payload (spec.md §4.4).
fn parse_ilst_item_data(tokenizer: &mut dyn Tokenizer, body_len: u64) -> Result<Option<NativeValue>> {
    let start = tokenizer.position();
    while tokenizer.position().saturating_sub(start) < body_len {
        let header = match read_atom_header(tokenizer)? {
            Some(h) => h,
            None => break,
        };
        if &header.kind != b"data" {
            tokenizer.skip(header.body_len)?;
            continue;
        }
        let class = tokenizer.read_u32be()?;
        tokenizer.skip(4)?; // locale, usually 0
        let payload_len = header.body_len.saturating_sub(8) as usize;
        let payload = tokenizer.read_bytes(payload_len)?;

        return Ok(Some(decode_data_payload(class, &payload)));
    }
    Ok(None)
}

fn decode_data_payload(class: u32, payload: &[u8]) -> NativeValue {
    match class {
        1 => NativeValue::Text(String::from_utf8_lossy(payload).into_owned()),
        13 => NativeValue::Picture(Picture {
            mime: "image/jpeg".to_string(),
            data: payload.to_vec(),
            description: None,
            picture_type: None,
        }),
        14 => NativeValue::Picture(Picture {
            mime: "image/png".to_string(),
            data: payload.to_vec(),
            description: None,
            picture_type: None,
        }),
        21 | 22 => match payload.len() {
            8 if payload.len() >= 4 => {
                let no = u16::from_be_bytes([payload[2], payload[3]]);
                let of = if payload.len() >= 6 {
                    u16::from_be_bytes([payload[4], payload[5]])
                } else {
                    0
                };
                NativeValue::OfTotal(OfTotal {
                    no: Some(no as u32),
                    of: if of > 0 { Some(of as u32) } else { None },
                })
            }
            1 => NativeValue::Int(payload[0] as i64),
            2 => NativeValue::Int(i16::from_be_bytes([payload[0], payload[1]]) as i64),
            4 => NativeValue::Int(i32::from_be_bytes(payload.try_into().unwrap()) as i64),
            8 => NativeValue::Int(i64::from_be_bytes(payload.try_into().unwrap())),
            _ => NativeValue::Binary(payload.to_vec()),
        },
        _ => NativeValue::Binary(payload.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn atom(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    fn data_atom(class: u32, payload: &[u8]) -> Vec<u8> {
        let mut body = class.to_be_bytes().to_vec();
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(payload);
        atom(b"data", &body)
    }

    #[test]
    fn decodes_nam_text_tag() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let nam = atom(b"\xa9nam", &data_atom(1, b"Song Title"));
        let ilst = atom(b"ilst", &nam);
        let meta_body = {
            let mut b = vec![0u8; 4];
            b.extend_from_slice(&ilst);
            b
        };
        let meta = atom(b"meta", &meta_body);
        let udta = atom(b"udta", &meta);
        let moov = atom(b"moov", &udta);

        let mut tokenizer = SliceTokenizer::new(&moov);
        parse(&mut tokenizer, &mut emit).unwrap();

        let tags = emit.native.get(TagSystem::ITunes).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(matches!(&tags[0].value, NativeValue::Text(s) if s == "Song Title"));
    }

    #[test]
    fn decodes_trkn_as_of_total() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let trkn_payload = [0u8, 0, 0, 2, 0, 10, 0, 0];
        let trkn = atom(b"trkn", &data_atom(21, &trkn_payload));
        let ilst = atom(b"ilst", &trkn);
        let meta_body = {
            let mut b = vec![0u8; 4];
            b.extend_from_slice(&ilst);
            b
        };
        let meta = atom(b"meta", &meta_body);
        let moov = atom(b"moov", &atom(b"udta", &meta));

        let mut tokenizer = SliceTokenizer::new(&moov);
        parse(&mut tokenizer, &mut emit).unwrap();

        let tags = emit.native.get(TagSystem::ITunes).unwrap();
        assert!(matches!(
            &tags[0].value,
            NativeValue::OfTotal(OfTotal { no: Some(2), of: Some(10) })
        ));
    }
}
