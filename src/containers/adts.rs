//! ADTS (raw AAC elementary stream with a per-frame header) container
//! (spec.md §4.3 point 3, §4.4): decodes the first frame header for
//! format facts. ADTS carries no native tag system of its own: it has no
//! tag block to decode, only audio frames, so this parser never calls
//! `emit.tag`.

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tokenizer::Tokenizer;

const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

fn profile_name(profile: u8) -> &'static str {
    match profile {
        0 => "Main",
        1 => "LC",
        2 => "SSR",
        3 => "LTP",
        _ => "unknown",
    }
}

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let header = tokenizer.read_bytes(7)?;
    if header[0] != 0xFF || header[1] & 0xF0 != 0xF0 {
        return Err(AudiometaError::InvalidMagicNumber);
    }

    let protection_absent = header[1] & 0x01 != 0;
    let profile = (header[2] >> 6) & 0b11;
    let sample_rate_index = ((header[2] >> 2) & 0b1111) as usize;
    let channel_config = ((header[2] & 0b1) << 2) | ((header[3] >> 6) & 0b11);
    let frame_length = (((header[3] as u32 & 0b11) << 11)
        | ((header[4] as u32) << 3)
        | ((header[5] as u32) >> 5)) as u32;

    let Some(&sample_rate) = SAMPLE_RATES.get(sample_rate_index) else {
        emit.warn("ADTS frame declares a reserved sample rate index");
        return Ok(());
    };

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("AAC", warnings);
    format.set_codec_profile(profile_name(profile));
    format.set_sample_rate(sample_rate, warnings);
    format.set_number_of_channels(channel_config.max(1), warnings);
    format.set_lossless(false, warnings);
    if frame_length > 0 {
        // 1024 samples per AAC frame, minus the 7-byte header this crate
        // already consumed (9 with CRC, when protection_absent is false).
        let header_len = if protection_absent { 7 } else { 9 };
        let payload_bits = frame_length.saturating_sub(header_len) * 8;
        if payload_bits > 0 {
            format.set_bitrate(payload_bits * sample_rate / 1024, warnings);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    fn frame(profile: u8, sample_rate_index: u8, channels: u8, frame_length: u32) -> Vec<u8> {
        let mut header = [0u8; 7];
        header[0] = 0xFF;
        header[1] = 0xF1; // MPEG4, layer 0, protection_absent=1
        header[2] = (profile << 6) | (sample_rate_index << 2) | ((channels >> 2) & 0b1);
        header[3] = ((channels & 0b11) << 6) | ((frame_length >> 11) as u8 & 0b11);
        header[4] = (frame_length >> 3) as u8;
        header[5] = ((frame_length & 0b111) as u8) << 5;
        header[6] = 0xFC;
        header.to_vec()
    }

    #[test]
    fn decodes_lc_profile_header() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let data = frame(1, 4, 2, 200); // LC, 44100 Hz, stereo
        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.codec.as_deref(), Some("AAC"));
        assert_eq!(emit.format.codec_profile.as_deref(), Some("LC"));
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.number_of_channels, Some(2));
    }

    #[test]
    fn rejects_bad_sync() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let mut tokenizer = SliceTokenizer::new(&[0x00; 7]);
        assert!(parse(&mut tokenizer, &mut emit).is_err());
    }
}
