use crate::error::Result;
use crate::options::ParseOptions;
use crate::reader::PositionedReader;

/// Byte ranges of the three trailing structures the scanner looks for
/// (spec.md §4.2). `None` means the probe didn't find that structure.
/// `apev2` is the offset of the `APETAGEX` footer sentinel itself
/// (spec.md §6 `apeOffset`), not of the first item.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailerInfo {
    pub id3v1: Option<u64>,
    pub lyrics3: Option<(u64, u64)>,
    pub apev2: Option<u64>,
}

const ID3V1_SIZE: u64 = 128;
const APE_FOOTER_SIZE: u64 = 32;
const LYRICS3V2_FOOTER: &[u8] = b"LYRICS200";
const LYRICS3V1_FOOTER: &[u8] = b"LYRICSEND";

/// Probes the last bytes of a sized reader for ID3v1, Lyrics3, and APEv2
/// footers, in that order, each probe's starting offset adjusted by the
/// sizes discovered before it (spec.md §4.2). Skipped entirely when the
/// source is stream-only: callers only invoke this from
/// `parse_from_buffer`/`parse_from_tokenizer` paths that have a sized
/// reader in hand.
pub fn scan_trailers(reader: &mut dyn PositionedReader) -> Result<TrailerInfo> {
    let size = reader.size();
    let mut info = TrailerInfo::default();
    let mut tail_boundary = size;

    if size >= ID3V1_SIZE {
        let block = reader.read_at(size - ID3V1_SIZE, ID3V1_SIZE as usize)?;
        if block.starts_with(b"TAG") {
            info.id3v1 = Some(size - ID3V1_SIZE);
            tail_boundary = size - ID3V1_SIZE;
        }
    }

    if tail_boundary >= LYRICS3V2_FOOTER.len() as u64 + 6 {
        let probe_len = LYRICS3V2_FOOTER.len() + 6;
        let probe = reader.read_at(tail_boundary - probe_len as u64, probe_len)?;
        if probe.ends_with(LYRICS3V2_FOOTER) {
            if let Ok(size_str) = std::str::from_utf8(&probe[..6]) {
                if let Ok(declared) = size_str.trim().parse::<u64>() {
                    // declared size excludes the 6-digit size field and the
                    // 9-byte "LYRICS200" marker itself.
                    let total = declared + 6 + LYRICS3V2_FOOTER.len() as u64;
                    if total <= tail_boundary {
                        let start = tail_boundary - total;
                        info.lyrics3 = Some((start, total));
                        tail_boundary = start;
                    }
                }
            }
        } else if tail_boundary >= LYRICS3V1_FOOTER.len() as u64 {
            let probe = reader.read_at(
                tail_boundary - LYRICS3V1_FOOTER.len() as u64,
                LYRICS3V1_FOOTER.len(),
            )?;
            if probe == LYRICS3V1_FOOTER {
                // Lyrics3v1 carries no size field; we only record that it's
                // present, not its extent, matching the "best-effort" tone
                // of the rest of the trailer probes.
                info.lyrics3 = Some((tail_boundary, 0));
            }
        }
    }

    if tail_boundary >= APE_FOOTER_SIZE {
        let footer_start = tail_boundary - APE_FOOTER_SIZE;
        let probe = reader.read_at(footer_start, APE_FOOTER_SIZE as usize)?;
        if probe.starts_with(b"APETAGEX") {
            info.apev2 = Some(footer_start);
        }
    }

    Ok(info)
}

/// Resolves the precedence rule from spec.md §9: a caller-supplied
/// `options.apeOffset` wins over whatever the trailer scanner computed.
pub fn resolve_ape_offset(options: &ParseOptions, scanned: &TrailerInfo) -> Option<u64> {
    options.ape_offset.or(scanned.apev2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    #[test]
    fn finds_id3v1_tag() {
        let mut data = vec![0u8; 200];
        let tag_start = data.len() - 128;
        data[tag_start..tag_start + 3].copy_from_slice(b"TAG");
        let mut reader = SliceReader::new(&data);
        let info = scan_trailers(&mut reader).unwrap();
        assert_eq!(info.id3v1, Some(tag_start as u64));
    }

    #[test]
    fn finds_apev2_footer_before_id3v1() {
        let mut data = vec![0u8; 300];
        let total_len = data.len() as u64;

        let id3_start = (total_len - 128) as usize;
        data[id3_start..id3_start + 3].copy_from_slice(b"TAG");

        let ape_footer_start = id3_start - 32;
        data[ape_footer_start..ape_footer_start + 8].copy_from_slice(b"APETAGEX");
        data[ape_footer_start + 12..ape_footer_start + 16].copy_from_slice(&32u32.to_le_bytes());

        let mut reader = SliceReader::new(&data);
        let info = scan_trailers(&mut reader).unwrap();
        assert_eq!(info.apev2, Some(ape_footer_start as u64));
    }

    #[test]
    fn caller_supplied_ape_offset_wins() {
        let options = ParseOptions {
            ape_offset: Some(42),
            ..Default::default()
        };
        let scanned = TrailerInfo {
            apev2: Some(99),
            ..Default::default()
        };
        assert_eq!(resolve_ape_offset(&options, &scanned), Some(42));
    }
}
