//! `STREAMINFO` block: the single mandatory first metadata block, source of
//! every audio-shape format fact FLAC carries natively (spec.md §4.4).

use crate::containers::Emit;
use crate::error::Result;
use crate::tokenizer::Tokenizer;

pub fn decode(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let _min_block_size = tokenizer.read_u16be()?;
    let _max_block_size = tokenizer.read_u16be()?;
    let _min_frame_size = tokenizer.read_u24be()?;
    let _max_frame_size = tokenizer.read_u24be()?;

    let sample_region: [u8; 8] = tokenizer.read_bytes(8)?.try_into().unwrap();
    let sample_rate = ((sample_region[0] as u32) << 12)
        + ((sample_region[1] as u32) << 4)
        + ((sample_region[2] as u32) >> 4);
    let channels = ((sample_region[2] >> 1) & 0b0000_0111) + 1;
    let bits_per_sample = ((sample_region[2] & 0b0000_0001) << 4) + (sample_region[3] >> 4) + 1;
    let total_samples = ((sample_region[3] as u64 & 0b0000_1111) << 32)
        + ((sample_region[4] as u64) << 24)
        + ((sample_region[5] as u64) << 16)
        + ((sample_region[6] as u64) << 8)
        + (sample_region[7] as u64);

    let md5: [u8; 16] = tokenizer.read_bytes(16)?.try_into().unwrap();

    let (format, warnings) = emit.format_and_warnings();
    format.set_sample_rate(sample_rate, warnings);
    format.set_number_of_channels(channels, warnings);
    format.set_bits_per_sample(bits_per_sample as u16, warnings);
    if total_samples > 0 {
        format.set_number_of_samples(total_samples, warnings);
    }
    if md5 != [0u8; 16] {
        format.set_audio_md5(md5, warnings);
    }
    format.set_lossless(true, warnings);
    format.set_codec("FLAC", warnings);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    #[test]
    fn decodes_sample_rate_and_channels() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        // 44100 Hz, 2 channels, 16 bps, 0 total samples.
        let mut body = vec![0u8; 4]; // block sizes
        body.extend_from_slice(&[0, 0, 0]); // min frame
        body.extend_from_slice(&[0, 0, 0]); // max frame
        body.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
        body.extend_from_slice(&[0u8; 16]);

        let mut tokenizer = SliceTokenizer::new(&body);
        decode(&mut tokenizer, &mut emit).unwrap();
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.number_of_channels, Some(2));
        assert_eq!(emit.format.bits_per_sample, Some(16));
    }
}
