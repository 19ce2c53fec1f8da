//! WavPack container (spec.md §4.4): a chain of `wvpk` blocks. Only the
//! first block's header is decoded for format facts; everything after it
//! is audio sub-block data, out of scope for this crate (no bitstream
//! decoding). Trailing APEv2 tags are handled uniformly by the driver's
//! post-container pass, not here.

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tokenizer::Tokenizer;

const FLAG_BYTES_STORED_MASK: u32 = 0x3;
const FLAG_MONO: u32 = 0x4;
const FLAG_HYBRID: u32 = 0x8;
const SAMPLE_RATE_SHIFT: u32 = 23;
const SAMPLE_RATE_MASK: u32 = 0xF;

const SAMPLE_RATES: [u32; 15] = [
    6000, 8000, 9600, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000,
    192000,
];

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let magic = tokenizer.read_bytes(4)?;
    if &magic[..] != b"wvpk" {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    let block_size = tokenizer.read_u32le()?;
    let _version = tokenizer.read_u16le()?;
    let _track_no = tokenizer.read_u8()?;
    let _index_no = tokenizer.read_u8()?;
    let total_samples = tokenizer.read_u32le()?;
    let _block_index = tokenizer.read_u32le()?;
    let _block_samples = tokenizer.read_u32le()?;
    let flags = tokenizer.read_u32le()?;
    let _crc = tokenizer.read_u32le()?;

    let channels = if flags & FLAG_MONO != 0 { 1 } else { 2 };
    let bytes_per_sample = (flags & FLAG_BYTES_STORED_MASK) + 1;
    let rate_index = ((flags >> SAMPLE_RATE_SHIFT) & SAMPLE_RATE_MASK) as usize;
    let sample_rate = SAMPLE_RATES.get(rate_index).copied();

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("WavPack", warnings);
    format.set_number_of_channels(channels, warnings);
    format.set_bits_per_sample((bytes_per_sample * 8) as u16, warnings);
    format.set_lossless(flags & FLAG_HYBRID == 0, warnings);
    if let Some(rate) = sample_rate {
        format.set_sample_rate(rate, warnings);
    }
    if total_samples != u32::MAX {
        format.set_number_of_samples(total_samples as u64, warnings);
    }

    // Header consumed so far: magic(4) + ckSize(4) + version(2) + track(1)
    // + index(1) + total_samples(4) + block_index(4) + block_samples(4) +
    // flags(4) + crc(4) = 32, of which ckSize counts everything from byte
    // 8 onward (i.e. 24 header bytes plus the sub-block payload).
    let remaining_in_block = (block_size as u64).saturating_sub(24);
    let _ = tokenizer.skip(remaining_in_block);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn header(channels_mono: bool, bytes_per_sample: u32, rate_index: u32, samples: u32) -> Vec<u8> {
        let mut flags = (bytes_per_sample - 1) & FLAG_BYTES_STORED_MASK;
        if channels_mono {
            flags |= FLAG_MONO;
        }
        flags |= rate_index << SAMPLE_RATE_SHIFT;

        let mut body = Vec::new();
        body.extend_from_slice(b"wvpk");
        body.extend_from_slice(&24u32.to_le_bytes()); // ckSize == 24 header bytes past ckSize + 0 payload
        body.extend_from_slice(&0x0410u16.to_le_bytes()); // version
        body.push(0); // track
        body.push(0); // index
        body.extend_from_slice(&samples.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // block index
        body.extend_from_slice(&samples.to_le_bytes()); // block samples
        body.extend_from_slice(&flags.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // crc
        body
    }

    #[test]
    fn decodes_stereo_header() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let data = header(false, 2, 9, 1_000_000);
        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.bits_per_sample, Some(16));
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.number_of_samples, Some(1_000_000));
        assert_eq!(emit.format.lossless, Some(true));
    }

    #[test]
    fn decodes_mono_header() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let data = header(true, 2, 9, 500);
        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();
        assert_eq!(emit.format.number_of_channels, Some(1));
    }
}
