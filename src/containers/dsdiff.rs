//! DSDIFF (Philips "Direct Stream Digital Interchange File Format")
//! container (spec.md §4.4): an IFF-style `FRM8`/`DSD ` chunk tree with
//! 64-bit big-endian chunk sizes. Format facts live in the nested `PROP`
//! chunk's `SND ` sub-chunks (`FS  ` sample rate, `CHNL` channel count);
//! an embedded `ID3 ` chunk, where present, carries the tags.

use crate::containers::{id3v2, Emit};
use crate::error::{AudiometaError, Result};
use crate::tokenizer::{SliceTokenizer, Tokenizer};

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if &magic[..] != b"FRM8" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(8)?; // overall FRM8 size, not needed
    let form = tokenizer.read_bytes(4)?;
    if &form[..] != b"DSD " {
        emit.warn("FRM8 form type is not DSD, skipping chunk walk");
        return Ok(());
    }

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("DSD", warnings);
    format.set_lossless(true, warnings);

    loop {
        let id = match tokenizer.read_bytes(4) {
            Ok(b) => b,
            Err(_) => break,
        };
        let size = match tokenizer.read_u64be() {
            Ok(s) => s,
            Err(_) => {
                emit.warn("truncated DSDIFF chunk header");
                break;
            }
        };
        let padded = size + (size % 2);

        match &id[..] {
            b"PROP" => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    parse_prop(&body, emit);
                    if padded > size {
                        let _ = tokenizer.skip(1);
                    }
                }
                Err(_) => {
                    emit.warn("truncated PROP chunk");
                    break;
                }
            },
            b"DSD " => {
                let channels = emit.format.number_of_channels.unwrap_or(2).max(1) as u64;
                if tokenizer.skip(padded).is_ok() {
                    let (format, warnings) = emit.format_and_warnings();
                    format.set_number_of_samples(size * 8 / channels, warnings);
                } else {
                    emit.warn("DSDIFF audio chunk shorter than its declared size");
                    break;
                }
            }
            b"ID3 " => match tokenizer.read_bytes(size as usize) {
                Ok(body) => {
                    let mut sub = SliceTokenizer::new(&body);
                    if let Err(e) = id3v2::parse_envelope(&mut sub, emit) {
                        if e.is_recoverable() {
                            emit.warn(format!("embedded ID3v2 chunk: {e}"));
                        } else {
                            return Err(e);
                        }
                    }
                    if padded > size {
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
                    break;
                }
            }
        }
    }

    Ok(())
}

fn parse_prop(body: &[u8], emit: &mut Emit) {
    if body.len() < 4 || &body[0..4] != b"SND " {
        return;
    }
    let mut cursor = SliceTokenizer::new(&body[4..]);
    loop {
        let id = match cursor.read_bytes(4) {
            Ok(b) => b,
            Err(_) => break,
        };
        let size = match cursor.read_u64be() {
            Ok(s) => s,
            Err(_) => break,
        };
        let padded = size + (size % 2);
        match &id[..] {
            b"FS  " => {
                if let Ok(rate) = cursor.read_u32be() {
                    let (format, warnings) = emit.format_and_warnings();
                    format.set_sample_rate(rate, warnings);
                }
                let _ = cursor.skip(padded.saturating_sub(4));
            }
            b"CHNL" => {
                if let Ok(count) = cursor.read_u16be() {
                    let (format, warnings) = emit.format_and_warnings();
                    format.set_number_of_channels(count.min(255) as u8, warnings);
                }
                let _ = cursor.skip(padded.saturating_sub(2));
            }
            b"CMPR" => {
                if let Ok(kind) = cursor.read_bytes(4) {
                    let lossless = &kind[..] == b"DSD ";
                    let (format, warnings) = emit.format_and_warnings();
                    format.set_lossless(lossless, warnings);
                }
                let _ = cursor.skip(padded.saturating_sub(4));
            }
            _ => {
                if cursor.skip(padded).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(body.len() as u64).to_be_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn parses_prop_sample_rate_and_channels() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let fs_chunk = chunk(b"FS  ", &2_822_400u32.to_be_bytes());
        let chnl_chunk = chunk(b"CHNL", &2u16.to_be_bytes());
        let mut snd_body = b"SND ".to_vec();
        snd_body.extend(fs_chunk);
        snd_body.extend(chnl_chunk);
        let prop = chunk(b"PROP", &snd_body);

        let mut data = b"FRM8".to_vec();
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(b"DSD ");
        data.extend(prop);

        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.sample_rate, Some(2_822_400));
        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.codec.as_deref(), Some("DSD"));
    }
}
