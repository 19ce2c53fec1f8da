//! Ogg container (spec.md §4.4): a stream of pages, each with a CRC,
//! granule position and segment table, that reassemble into logical
//! packets. The first packet identifies the codec carried inside
//! (Vorbis, Opus, Speex, FLAC-in-Ogg, Theora); for Vorbis and Opus the
//! second packet carries the comment header.

use crate::containers::vorbis;
use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tag::TagSystem;
use crate::tokenizer::{SliceTokenizer, Tokenizer};

const PAGE_MAGIC: &[u8; 4] = b"OggS";

struct Page {
    granule_position: u64,
    is_first: bool,
    is_last_of_packet: bool,
    segments: Vec<u8>,
}

fn read_page(tokenizer: &mut dyn Tokenizer) -> Result<Option<Page>> {
    let magic = match tokenizer.read_bytes(4) {
        Ok(m) => m,
        Err(_) => return Ok(None),
    };
    if &magic[..] != PAGE_MAGIC {
        return Err(AudiometaError::InvalidMagicNumber);
    }
    tokenizer.skip(1)?; // stream structure version, always 0
    let header_type = tokenizer.read_u8()?;
    let granule_position = tokenizer.read_u64le()?;
    tokenizer.skip(4)?; // bitstream serial number, single logical stream assumed
    tokenizer.skip(4)?; // page sequence number
    tokenizer.skip(4)?; // CRC checksum, not verified
    let segment_count = tokenizer.read_u8()? as usize;
    let segment_table = tokenizer.read_bytes(segment_count)?;
    let body_len: usize = segment_table.iter().map(|&b| b as usize).sum();
    let body = tokenizer.read_bytes(body_len)?;

    Ok(Some(Page {
        granule_position,
        is_first: header_type & 0x02 != 0,
        is_last_of_packet: segment_table.last().map_or(true, |&b| b != 255),
        segments: body,
    }))
}

/// Reassembles packets from pages until at least `min_packets` full packets
/// have been collected or the stream runs out. A packet spans pages when a
/// page's last segment is exactly 255 bytes (continuation).
fn collect_packets(tokenizer: &mut dyn Tokenizer, min_packets: usize) -> Result<Vec<Vec<u8>>> {
    let mut packets = Vec::new();
    let mut current = Vec::new();
    let mut first_page = true;

    while packets.len() < min_packets {
        let page = match read_page(tokenizer)? {
            Some(p) => p,
            None => break,
        };
        if first_page && !page.is_first {
            // Tolerate streams that don't set the "first page" flag; the
            // packet framing itself is all this function actually needs.
        }
        first_page = false;
        current.extend_from_slice(&page.segments);
        if page.is_last_of_packet {
            packets.push(std::mem::take(&mut current));
        }
        let _ = page.granule_position;
    }
    Ok(packets)
}

pub fn parse(tokenizer: &mut dyn Tokenizer, emit: &mut Emit) -> Result<()> {
    let packets = match collect_packets(tokenizer, 2) {
        Ok(p) => p,
        Err(e) => {
            emit.warn(format!("Ogg page framing error: {e}"));
            return Ok(());
        }
    };
    let Some(first) = packets.first() else {
        emit.warn("Ogg stream has no pages");
        return Ok(());
    };

    if first.starts_with(b"\x01vorbis") {
        parse_vorbis(&packets, emit);
    } else if first.starts_with(b"OpusHead") {
        parse_opus(&packets, emit);
    } else if first.starts_with(b"\x7fFLAC") {
        parse_flac_in_ogg(&packets, emit);
    } else if first.starts_with(b"Speex   ") || first.starts_with(b"Speex") {
        emit.format.set_codec("Speex", &mut emit.warnings);
        emit.format.set_lossless(false, &mut emit.warnings);
    } else if first.starts_with(b"\x80theora") {
        emit.format.set_codec("Theora", &mut emit.warnings);
    } else {
        emit.warn("unrecognized Ogg logical stream codec");
    }

    Ok(())
}

fn parse_vorbis(packets: &[Vec<u8>], emit: &mut Emit) {
    let ident = &packets[0];
    if ident.len() >= 30 {
        let channels = ident[11];
        let sample_rate = u32::from_le_bytes(ident[12..16].try_into().unwrap());
        let (format, warnings) = emit.format_and_warnings();
        format.set_codec("Vorbis", warnings);
        format.set_number_of_channels(channels, warnings);
        format.set_sample_rate(sample_rate, warnings);
        format.set_lossless(false, warnings);
    }
    if let Some(comment_packet) = packets.get(1) {
        decode_comment_packet(comment_packet, emit);
    }
}

fn parse_opus(packets: &[Vec<u8>], emit: &mut Emit) {
    let head = &packets[0];
    if head.len() >= 11 {
        let channels = head[9];
        // Opus always operates internally at 48 kHz regardless of the
        // "input sample rate" field at offset 12, which is informational.
        let (format, warnings) = emit.format_and_warnings();
        format.set_codec("Opus", warnings);
        format.set_number_of_channels(channels, warnings);
        format.set_sample_rate(48_000, warnings);
        format.set_lossless(false, warnings);
    }
    if let Some(tags_packet) = packets.get(1) {
        if tags_packet.starts_with(b"OpusTags") {
            decode_comment_packet(&tags_packet[8..], emit);
        }
    }
}

fn parse_flac_in_ogg(packets: &[Vec<u8>], emit: &mut Emit) {
    let ident = &packets[0];
    // Packet layout: 1-byte packet type (0x7F) + "FLAC" + 2-byte major/minor
    // version + 2-byte header-packet count + native FLAC "fLaC" marker +
    // a verbatim STREAMINFO metadata block (4-byte block header + 34 bytes).
    const PREFIX: usize = 1 + 4 + 2 + 2 + 4;
    if ident.len() >= PREFIX + 4 + 34 {
        let stream_info = &ident[PREFIX + 4..PREFIX + 4 + 34];
        let mut cursor = SliceTokenizer::new(stream_info);
        let mut dummy_emit = Emit::new(emit.options);
        if crate::containers::flac::blocks::stream_info::decode(&mut cursor, &mut dummy_emit).is_ok()
        {
            let (format, warnings) = emit.format_and_warnings();
            if let Some(v) = dummy_emit.format.sample_rate {
                format.set_sample_rate(v, warnings);
            }
            if let Some(v) = dummy_emit.format.number_of_channels {
                format.set_number_of_channels(v, warnings);
            }
            if let Some(v) = dummy_emit.format.bits_per_sample {
                format.set_bits_per_sample(v, warnings);
            }
            if let Some(v) = dummy_emit.format.number_of_samples {
                format.set_number_of_samples(v, warnings);
            }
            if let Some(v) = dummy_emit.format.audio_md5 {
                format.set_audio_md5(v, warnings);
            }
        }
    }
    let (format, warnings) = emit.format_and_warnings();
    format.set_codec("FLAC", warnings);
    format.set_lossless(true, warnings);

    if let Some(comment_packet) = packets.get(1) {
        decode_comment_packet(comment_packet, emit);
    }
}

fn decode_comment_packet(body: &[u8], emit: &mut Emit) {
    let mut cursor = SliceTokenizer::new(body);
    match vorbis::decode(&mut cursor) {
        Ok((_vendor, tags)) => {
            for tag in tags {
                emit.tag(TagSystem::Vorbis, tag);
            }
        }
        Err(e) => emit.warn(format!("Ogg comment packet decode failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn page(granule: u64, header_type: u8, body: &[u8]) -> Vec<u8> {
        let mut out = PAGE_MAGIC.to_vec();
        out.push(0); // version
        out.push(header_type);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes()); // serial
        out.extend_from_slice(&0u32.to_le_bytes()); // sequence
        out.extend_from_slice(&0u32.to_le_bytes()); // crc
        let mut remaining = body.len();
        let mut segments = Vec::new();
        while remaining >= 255 {
            segments.push(255);
            remaining -= 255;
        }
        segments.push(remaining as u8);
        out.push(segments.len() as u8);
        out.extend_from_slice(&segments);
        out.extend_from_slice(body);
        out
    }

    fn vorbis_ident(channels: u8, rate: u32) -> Vec<u8> {
        let mut body = b"\x01vorbis".to_vec();
        body.extend_from_slice(&0u32.to_le_bytes()); // vorbis version
        body.push(channels);
        body.extend_from_slice(&rate.to_le_bytes());
        body.extend_from_slice(&[0u8; 16]); // bitrate max/nominal/min
        body.push(0); // blocksizes
        body.push(1); // framing bit
        body
    }

    fn comment_body(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        let vendor = "libvorbis";
        body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        body.extend_from_slice(vendor.as_bytes());
        body.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (k, v) in entries {
            let entry = format!("{k}={v}");
            body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            body.extend_from_slice(entry.as_bytes());
        }
        body.push(1); // framing bit, ignored by decode()
        body
    }

    #[test]
    fn parses_vorbis_ident_and_comment() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut data = page(0, 0x02, &vorbis_ident(2, 44100));
        data.extend(page(0, 0, &comment_body(&[("TITLE", "Song")])));

        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.codec.as_deref(), Some("Vorbis"));
        assert_eq!(emit.format.sample_rate, Some(44100));
        assert_eq!(emit.format.number_of_channels, Some(2));
        let tags = emit.native.get(TagSystem::Vorbis).unwrap();
        assert!(tags.iter().any(|t| t.id == "TITLE"));
    }

    #[test]
    fn parses_opus_head() {
        let options = ParseOptions::default();
        let mut emit = Emit::new(&options);

        let mut head = b"OpusHead".to_vec();
        head.push(1); // version
        head.push(2); // channels
        head.extend_from_slice(&0u16.to_le_bytes()); // pre-skip
        head.extend_from_slice(&48_000u32.to_le_bytes()); // input sample rate
        head.extend_from_slice(&0u16.to_le_bytes()); // output gain
        head.push(0); // channel mapping family

        let data = page(0, 0x02, &head);
        let mut tokenizer = SliceTokenizer::new(&data);
        parse(&mut tokenizer, &mut emit).unwrap();

        assert_eq!(emit.format.codec.as_deref(), Some("Opus"));
        assert_eq!(emit.format.sample_rate, Some(48_000));
    }
}
