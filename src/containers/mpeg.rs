//! MPEG audio frame container (spec.md §4.4 "design level, not exhaustive
//! byte layouts"): locates the first valid frame header, derives codec,
//! sample rate, channel count, and bitrate from the standard header
//! tables, and looks for a Xing/Info/VBRI header in the first frame for an
//! accurate frame count.

use crate::containers::Emit;
use crate::error::Result;
use crate::tokenizer::Tokenizer;

const SYNC_MASK: u32 = 0xFFE0_0000;
const SYNC_VALUE: u32 = 0xFFE0_0000;

// Index: [version_index][layer_index][bitrate_index]; version_index 0 = V2.5, 1 = reserved, 2 = V2, 3 = V1.
// layer_index 1 = Layer3, 2 = Layer2, 3 = Layer1 (as encoded in the header).
const BITRATES_V1: [[u16; 16]; 3] = [
    // Layer1
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
    // Layer2
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
    // Layer3
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
];

const BITRATES_V2: [[u16; 16]; 3] = [
    // Layer1
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    // Layer2 and Layer3 share this table for MPEG2/2.5
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
];

const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLE_RATES_V2: [u32; 3] = [22050, 24000, 16000];
const SAMPLE_RATES_V25: [u32; 3] = [11025, 12000, 8000];

const SAMPLES_PER_FRAME: [[u32; 3]; 2] = [
    // MPEG1: layer1, layer2, layer3
    [384, 1152, 1152],
    // MPEG2/2.5: layer1, layer2, layer3
    [384, 1152, 576],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MpegVersion {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MpegLayer {
    Layer1,
    Layer2,
    Layer3,
}

struct FrameHeader {
    version: MpegVersion,
    layer: MpegLayer,
    bitrate_kbps: u16,
    sample_rate: u32,
    channels: u8,
    padding: u32,
    frame_size: u32,
}

fn parse_header(word: u32) -> Option<FrameHeader> {
    if word & SYNC_MASK != SYNC_VALUE {
        return None;
    }
    let version = match (word >> 19) & 0b11 {
        0b00 => MpegVersion::V25,
        0b10 => MpegVersion::V2,
        0b11 => MpegVersion::V1,
        _ => return None, // reserved
    };
    let layer = match (word >> 17) & 0b11 {
        0b01 => MpegLayer::Layer3,
        0b10 => MpegLayer::Layer2,
        0b11 => MpegLayer::Layer1,
        _ => return None, // reserved
    };
    let bitrate_index = ((word >> 12) & 0b1111) as usize;
    let sample_rate_index = ((word >> 10) & 0b11) as usize;
    if sample_rate_index == 3 || bitrate_index == 15 {
        return None;
    }
    let padding = (word >> 9) & 1;
    let channel_mode = (word >> 6) & 0b11;
    let channels = if channel_mode == 3 { 1 } else { 2 };

    let layer_row = match layer {
        MpegLayer::Layer1 => 0,
        MpegLayer::Layer2 => 1,
        MpegLayer::Layer3 => 2,
    };
    let bitrate_kbps = match version {
        MpegVersion::V1 => BITRATES_V1[layer_row][bitrate_index],
        MpegVersion::V2 | MpegVersion::V25 => BITRATES_V2[layer_row][bitrate_index],
    };
    if bitrate_kbps == 0 {
        return None;
    }
    let sample_rate = match version {
        MpegVersion::V1 => SAMPLE_RATES_V1[sample_rate_index],
        MpegVersion::V2 => SAMPLE_RATES_V2[sample_rate_index],
        MpegVersion::V25 => SAMPLE_RATES_V25[sample_rate_index],
    };

    let version_row = if version == MpegVersion::V1 { 0 } else { 1 };
    let samples = SAMPLES_PER_FRAME[version_row][layer_row];
    let frame_size = if layer == MpegLayer::Layer1 {
        (12_000 * bitrate_kbps as u32 / sample_rate + padding) * 4
    } else {
        samples / 8 * bitrate_kbps as u32 * 1000 / sample_rate + padding
    };

    Some(FrameHeader {
        version,
        layer,
        bitrate_kbps,
        sample_rate,
        channels,
        padding,
        frame_size,
    })
}

fn codec_name(version: MpegVersion, layer: MpegLayer) -> &'static str {
    match (version, layer) {
        (MpegVersion::V1, MpegLayer::Layer1) => "MPEG 1 Layer 1",
        (MpegVersion::V1, MpegLayer::Layer2) => "MPEG 1 Layer 2",
        (MpegVersion::V1, MpegLayer::Layer3) => "MPEG 1 Layer 3",
        (MpegVersion::V2, MpegLayer::Layer1) => "MPEG 2 Layer 1",
        (MpegVersion::V2, MpegLayer::Layer2) => "MPEG 2 Layer 2",
        (MpegVersion::V2, MpegLayer::Layer3) => "MPEG 2 Layer 3",
        (MpegVersion::V25, MpegLayer::Layer1) => "MPEG 2.5 Layer 1",
        (MpegVersion::V25, MpegLayer::Layer2) => "MPEG 2.5 Layer 2",
        (MpegVersion::V25, MpegLayer::Layer3) => "MPEG 2.5 Layer 3",
    }
}

/// Scans up to this many bytes past the container hand-off position for the
/// first valid, self-consistent frame sync before giving up.
const SYNC_SCAN_WINDOW: usize = 64 * 1024;

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let window_len = tokenizer
        .size()
        .map(|n| (n as usize).min(SYNC_SCAN_WINDOW))
        .unwrap_or(SYNC_SCAN_WINDOW);
    let window = match tokenizer.peek_bytes(window_len) {
        Ok(w) => w,
        Err(_) => {
            emit.warn("MPEG stream shorter than the sync scan window");
            return Ok(());
        }
    };

    let header = (0..window.len().saturating_sub(3)).find_map(|i| {
        let word = u32::from_be_bytes([window[i], window[i + 1], window[i + 2], window[i + 3]]);
        parse_header(word)
    });

    let header = match header {
        Some(h) => h,
        None => {
            emit.warn("no valid MPEG frame sync found within scan window");
            return Ok(());
        }
    };

    let (format, warnings) = emit.format_and_warnings();
    format.set_codec(codec_name(header.version, header.layer), warnings);
    format.set_sample_rate(header.sample_rate, warnings);
    format.set_number_of_channels(header.channels, warnings);
    format.set_bitrate(header.bitrate_kbps as u32 * 1000, warnings);
    format.set_lossless(false, warnings);

    if let Some(frame_count) = find_xing_frame_count(&window, &header) {
        let total_samples = frame_count as u64
            * match header.layer {
                MpegLayer::Layer1 => 384,
                MpegLayer::Layer2 => 1152,
                MpegLayer::Layer3 => {
                    if header.version == MpegVersion::V1 {
                        1152
                    } else {
                        576
                    }
                }
            };
        emit.format.set_number_of_samples(total_samples, &mut emit.warnings);
    }

    Ok(())
}

/// Looks for a `Xing`/`Info` header (VBR frame-count side channel) right
/// after the first frame's side-information region, or a `VBRI` header at
/// the MPEG2/2.5 fixed offset. Both carry a 32-bit frame count used for a
/// more accurate duration than bitrate-based estimation.
fn find_xing_frame_count(window: &[u8], header: &FrameHeader) -> Option<u32> {
    for needle in [&b"Xing"[..], &b"Info"[..], &b"VBRI"[..]] {
        if let Some(pos) = find_subslice(&window[..window.len().min(header.frame_size as usize * 2 + 64)], needle) {
            if needle == b"VBRI" {
                let frames = window.get(pos + 14..pos + 18)?;
                return Some(u32::from_be_bytes(frames.try_into().ok()?));
            }
            let flags = window.get(pos + 4..pos + 8)?;
            let flags = u32::from_be_bytes(flags.try_into().ok()?);
            if flags & 0x1 != 0 {
                let frames = window.get(pos + 8..pos + 12)?;
                return Some(u32::from_be_bytes(frames.try_into().ok()?));
            }
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::tokenizer::SliceTokenizer;

    #[test]
    fn parses_v1_layer3_128kbps_44100_stereo() {
        // 0xFFFB9064: sync=FFF, version=11(V1), layer=01(L3), crc=1(none),
        // bitrate index 1001=9->128kbps, samplerate 00=44100, padding 0, mode 00=stereo.
        let word: u32 = 0xFFFB_9064;
        let header = parse_header(word).expect("valid frame header");
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.channels, 2);
        assert_eq!(codec_name(header.version, header.layer), "MPEG 1 Layer 3");
    }

    #[test]
    fn rejects_non_sync_word() {
        assert!(parse_header(0x0000_0000).is_none());
    }

    #[test]
    fn populates_format_facts_from_first_frame() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);
        let mut data = vec![0xFFu8, 0xFB, 0x90, 0x64];
        data.extend_from_slice(&[0u8; 200]);
        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.codec.as_deref(), Some("MPEG 1 Layer 3"));
    }
}
