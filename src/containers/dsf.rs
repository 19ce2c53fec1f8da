//! DSF (Sony DSD Stream File) container (spec.md §4.4): a fixed `DSD `/
//! `fmt `/`data` chunk triplet with little-endian 64-bit chunk sizes. The
//! `DSD ` chunk's metadata pointer names the offset of a trailing ID3v2
//! tag; since the `data` chunk runs right up to that offset in a
//! well-formed file, the forward-only tokenizer reaches it naturally
//! without needing to seek.

use crate::containers::{id3v2, Emit};
use crate::error::{AudiometaError, Result};
use crate::tokenizer::Tokenizer;

fn read_fmt_body(tokenizer: &mut dyn Tokenizer) -> Result<(u32, u32, u32, u64)> {
    tokenizer.read_u32le()?; // format version
    tokenizer.read_u32le()?; // format id, 0 == DSD raw
    tokenizer.read_u32le()?; // channel type, not needed once channel_num is known
    let channel_num = tokenizer.read_u32le()?;
    let sampling_frequency = tokenizer.read_u32le()?;
    let bits_per_sample = tokenizer.read_u32le()?;
    let sample_count = tokenizer.read_u64le()?;
    Ok((channel_num, sampling_frequency, bits_per_sample, sample_count))
}

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if &magic[..] != b"DSD " {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(8)?; // DSD chunk size, always 28
    tokenizer.skip(8)?; // total file size, not needed
    let metadata_pointer = tokenizer.read_u64le()?;

    let fmt_magic = tokenizer.read_bytes(4)?;
    if &fmt_magic[..] != b"fmt " {
        emit.warn("DSF fmt chunk missing where expected");
        return Ok(());
    }
    let fmt_chunk_size = match tokenizer.read_u64le() {
        Ok(s) => s,
        Err(_) => {
            emit.warn("truncated DSF fmt chunk header");
            return Ok(());
        }
    };
    let (channel_num, sampling_frequency, bits_per_sample, sample_count) =
        match read_fmt_body(tokenizer) {
            Ok(v) => v,
            Err(_) => {
                emit.warn("truncated DSF fmt chunk body");
                return Ok(());
            }
        };
    let consumed: u64 = 12 + 4 + 4 + 4 + 4 + 4 + 4 + 8; // fmt header + the six fields above
    if fmt_chunk_size > consumed {
        let _ = tokenizer.skip(fmt_chunk_size - consumed);
    }

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("DSD", warnings);
    format.set_sample_rate(sampling_frequency, warnings);
    format.set_number_of_channels(channel_num.min(255) as u8, warnings);
    format.set_bits_per_sample(bits_per_sample as u16, warnings);
    format.set_number_of_samples(sample_count, warnings);
    format.set_lossless(true, warnings);

    let data_magic = match tokenizer.read_bytes(4) {
        Ok(b) => b,
        Err(_) => return Ok(()),
    };
    if &data_magic[..] != b"data" {
        emit.warn("DSF data chunk missing where expected");
        return Ok(());
    }
    let data_chunk_size = match tokenizer.read_u64le() {
        Ok(s) => s,
        Err(_) => {
            emit.warn("truncated DSF data chunk header");
            return Ok(());
        }
    };
    let data_body_len = data_chunk_size.saturating_sub(12);
    if tokenizer.skip(data_body_len).is_err() {
        emit.warn("DSF data chunk shorter than its declared size");
        return Ok(());
    }

    if metadata_pointer > 0 {
        match id3v2::parse_envelope(tokenizer, emit) {
            Ok(_) => {}
            Err(e) if e.is_recoverable() => emit.warn(format!("DSF trailing ID3v2 tag: {e}")),
            Err(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn fmt_chunk(channels: u32, rate: u32, bits: u32, samples: u64) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&1u32.to_le_bytes()); // format version
        body.extend_from_slice(&0u32.to_le_bytes()); // format id
        body.extend_from_slice(&2u32.to_le_bytes()); // channel type (stereo)
        body.extend_from_slice(&channels.to_le_bytes());
        body.extend_from_slice(&rate.to_le_bytes());
        body.extend_from_slice(&bits.to_le_bytes());
        body.extend_from_slice(&samples.to_le_bytes());
        body.extend_from_slice(&4096u32.to_le_bytes()); // block size per channel
        body.extend_from_slice(&0u32.to_le_bytes()); // reserved

        let mut out = b"fmt ".to_vec();
        out.extend_from_slice(&(12 + body.len() as u64).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn parses_fmt_chunk_into_format_facts() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut dsf = b"DSD ".to_vec();
        dsf.extend_from_slice(&28u64.to_le_bytes());
        dsf.extend_from_slice(&0u64.to_le_bytes()); // total file size
        dsf.extend_from_slice(&0u64.to_le_bytes()); // metadata pointer, none
        dsf.extend(fmt_chunk(2, 2_822_400, 1, 1_000_000));
        dsf.extend_from_slice(b"data");
        dsf.extend_from_slice(&12u64.to_le_bytes());

        let mut tokenizer = SliceTokenizer::new(&dsf);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.sample_rate, Some(2_822_400));
        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.number_of_samples, Some(1_000_000));
        assert_eq!(emit.format.lossless, Some(true));
    }
}
