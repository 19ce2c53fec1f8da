use super::Id3v2Version;
use crate::containers::Emit;
use crate::tag::NativeTag;
use crate::tokenizer::{decode_string, Encoding, SliceTokenizer, Tokenizer};
use crate::value::{NativeValue, OfTotal, Picture};

/// Decodes every frame in `cursor` (the already unsynchronised, extended
/// -header-stripped tag body) and emits each as a native tag. A frame that
/// fails to decode is downgraded to a warning and skipped; the remaining
/// frames are still tried, since one malformed frame doesn't imply the
/// whole tag is malformed (spec.md §7 "DecodeError ... downgraded to a
/// warning when the surrounding structure is still well-formed").
pub fn parse_frames(cursor: &mut SliceTokenizer, version: Id3v2Version, emit: &mut Emit) {
    let id_len = version.frame_id_len();
    let system = version.tag_system();

    loop {
        let id_bytes = match cursor.peek_bytes(id_len) {
            Ok(b) => b,
            Err(_) => break,
        };
        if id_bytes.iter().all(|b| *b == 0) {
            // Padding: the rest of the tag body is zero-filled.
            break;
        }
        let _ = cursor.read_bytes(id_len);
        let id = String::from_utf8_lossy(&id_bytes).to_string();

        let size = match version {
            Id3v2Version::V2 => match cursor.read_u24be() {
                Ok(s) => s as u64,
                Err(_) => break,
            },
            Id3v2Version::V3 => match cursor.read_u32be() {
                Ok(s) => s as u64,
                Err(_) => break,
            },
            Id3v2Version::V4 => match cursor.read_bytes(4) {
                Ok(b) => {
                    let b: [u8; 4] = b.try_into().unwrap();
                    super_read_syncsafe(b) as u64
                }
                Err(_) => break,
            },
        };

        if version != Id3v2Version::V2 {
            // Skip the two flag bytes (status + format); none of the
            // behaviors they describe (grouping, compression, encryption)
            // are in scope for a read-only metadata parser.
            if cursor.skip(2).is_err() {
                break;
            }
        }

        let body = match cursor.read_bytes(size as usize) {
            Ok(b) => b,
            Err(_) => {
                emit.warn(format!("ID3v2 frame {id} declared {size} bytes past end of tag"));
                break;
            }
        };

        match decode_frame(&id, &body) {
            Ok(values) => {
                for (tag_id, value) in values {
                    emit.tag(system, NativeTag::new(tag_id, value));
                }
            }
            Err(e) => emit.warn(format!("ID3v2 frame {id} malformed: {e}")),
        }
    }
}

fn super_read_syncsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32) << 21)
        | ((bytes[1] as u32) << 14)
        | ((bytes[2] as u32) << 7)
        | (bytes[3] as u32)
}

fn text_encoding(byte: u8) -> Encoding {
    match byte {
        0 => Encoding::Latin1,
        1 => Encoding::Utf16Bom,
        2 => Encoding::Utf16Be,
        _ => Encoding::Utf8,
    }
}

/// Decodes one frame body into zero or more `(tag id, value)` pairs. v2.4
/// text frames may carry several NUL-separated values (spec.md §4.4);
/// every other decoder produces exactly one value (or zero, if the frame
/// is empty). `TXXX`/`WXXX` are user-defined key/value frames whose actual
/// identifier is their description, not the literal frame id; the
/// returned id reflects that so the common-view mapper (and the native
/// view) can key on e.g. `REPLAYGAIN_TRACK_GAIN` the same way it does for
/// an APEv2 item of the same name.
fn decode_frame(id: &str, body: &[u8]) -> crate::error::Result<Vec<(String, NativeValue)>> {
    // Normalize v2.2's 3-character ids to their v2.3/2.4 equivalents only
    // for the purpose of picking a decoder; the emitted tag still carries
    // the original id (except TXXX/WXXX, see above).
    let kind = normalize_id(id);

    let tagged = |value: NativeValue| vec![(id.to_string(), value)];

    match kind {
        "APIC" | "PIC" => Ok(tagged(decode_picture(body, kind == "PIC")?)),
        "TXXX" => {
            let (desc, value) = decode_txxx(body)?;
            Ok(vec![(desc, value)])
        }
        "WXXX" => {
            let (desc, value) = decode_wxxx(body)?;
            Ok(vec![(desc, value)])
        }
        "COMM" | "USLT" => Ok(tagged(decode_comment_like(body)?)),
        "PRIV" => Ok(tagged(decode_priv(body)?)),
        "UFID" => Ok(tagged(decode_ufid(body)?)),
        "POPM" => Ok(tagged(decode_popm(body)?)),
        "MCDI" => Ok(tagged(NativeValue::Binary(body.to_vec()))),
        "TRCK" => Ok(decode_of_total(body)?.into_iter().map(|v| (id.to_string(), v)).collect()),
        "TPOS" => Ok(decode_of_total(body)?.into_iter().map(|v| (id.to_string(), v)).collect()),
        _ if kind.starts_with('T') => {
            Ok(decode_text(body)?.into_iter().map(|v| (id.to_string(), v)).collect())
        }
        _ if kind.starts_with('W') => Ok(tagged(NativeValue::Text(decode_string(
            body,
            Encoding::Latin1,
        )?))),
        _ => Ok(tagged(NativeValue::Binary(body.to_vec()))),
    }
}

fn normalize_id(id: &str) -> &str {
    match id {
        "TT2" => "TIT2",
        "TP1" => "TPE1",
        "TP2" => "TPE2",
        "TAL" => "TALB",
        "TRK" => "TRCK",
        "TPA" => "TPOS",
        "TYE" => "TYER",
        "TCO" => "TCON",
        "COM" => "COMM",
        "ULT" => "USLT",
        "WAF" | "WAR" | "WAS" | "WCM" | "WCP" | "WPB" => "WXXX",
        "TXX" => "TXXX",
        "WXX" => "WXXX",
        "UFI" => "UFID",
        "PIC" => "PIC",
        other => other,
    }
}

fn decode_text(body: &[u8]) -> crate::error::Result<Vec<NativeValue>> {
    if body.is_empty() {
        return Ok(vec![]);
    }
    let encoding = text_encoding(body[0]);
    let text = decode_string(&body[1..], encoding)?;
    let values: Vec<NativeValue> = text
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(|s| NativeValue::Text(s.to_string()))
        .collect();
    Ok(if values.is_empty() {
        vec![NativeValue::Text(text)]
    } else {
        values
    })
}

fn decode_of_total(body: &[u8]) -> crate::error::Result<Vec<NativeValue>> {
    if body.is_empty() {
        return Ok(vec![]);
    }
    let encoding = text_encoding(body[0]);
    let text = decode_string(&body[1..], encoding)?;
    let mut parts = text.splitn(2, '/');
    let no = parts.next().and_then(|s| s.trim().parse::<u32>().ok());
    let of = parts.next().and_then(|s| s.trim().parse::<u32>().ok());
    Ok(vec![NativeValue::OfTotal(OfTotal { no, of })])
}

fn decode_txxx(body: &[u8]) -> crate::error::Result<(String, NativeValue)> {
    if body.is_empty() {
        return Ok(("TXXX".to_string(), NativeValue::Text(String::new())));
    }
    let encoding = text_encoding(body[0]);
    let (desc, rest) = split_terminated(&body[1..], encoding)?;
    let desc = decode_string(desc, encoding)?;
    let value = decode_string(rest, encoding)?;
    let id = if desc.is_empty() { "TXXX".to_string() } else { desc };
    Ok((id, NativeValue::Text(value)))
}

fn decode_wxxx(body: &[u8]) -> crate::error::Result<(String, NativeValue)> {
    if body.is_empty() {
        return Ok(("WXXX".to_string(), NativeValue::Text(String::new())));
    }
    let encoding = text_encoding(body[0]);
    let (desc, rest) = split_terminated(&body[1..], encoding)?;
    let desc = decode_string(desc, encoding)?;
    let url = decode_string(rest, Encoding::Latin1)?;
    let id = if desc.is_empty() { "WXXX".to_string() } else { desc };
    Ok((id, NativeValue::Text(url)))
}

fn decode_comment_like(body: &[u8]) -> crate::error::Result<NativeValue> {
    if body.len() < 4 {
        return Ok(NativeValue::Text(String::new()));
    }
    let encoding = text_encoding(body[0]);
    let _language = &body[1..4];
    let (_short_desc, rest) = split_terminated(&body[4..], encoding)?;
    let text = decode_string(rest, encoding)?;
    Ok(NativeValue::Text(text))
}

fn decode_priv(body: &[u8]) -> crate::error::Result<NativeValue> {
    let (owner, rest) = split_terminated(body, Encoding::Latin1)?;
    let owner = decode_string(owner, Encoding::Latin1)?;
    let mut data = Vec::with_capacity(owner.len() + 1 + rest.len());
    data.extend_from_slice(owner.as_bytes());
    data.push(0);
    data.extend_from_slice(rest);
    Ok(NativeValue::Binary(data))
}

fn decode_ufid(body: &[u8]) -> crate::error::Result<NativeValue> {
    let (owner, rest) = split_terminated(body, Encoding::Latin1)?;
    let owner = decode_string(owner, Encoding::Latin1)?;
    if owner.eq_ignore_ascii_case("http://musicbrainz.org") {
        return Ok(NativeValue::Text(String::from_utf8_lossy(rest).into_owned()));
    }
    Ok(NativeValue::Binary(rest.to_vec()))
}

fn decode_popm(body: &[u8]) -> crate::error::Result<NativeValue> {
    let (email, rest) = split_terminated(body, Encoding::Latin1)?;
    let email = decode_string(email, Encoding::Latin1)?;
    let byte = rest.first().copied().unwrap_or(0);
    Ok(NativeValue::Rating {
        source: if email.is_empty() { None } else { Some(email) },
        rating: byte as f64 / 255.0,
    })
}

fn decode_picture(body: &[u8], is_v22: bool) -> crate::error::Result<NativeValue> {
    if body.is_empty() {
        return Err(crate::error::AudiometaError::Decode(
            "empty APIC frame".into(),
        ));
    }
    let encoding = text_encoding(body[0]);
    let mut offset = 1;
    let mime = if is_v22 {
        let fmt = body
            .get(offset..offset + 3)
            .ok_or_else(|| crate::error::AudiometaError::Decode("truncated PIC format".into()))?;
        offset += 3;
        match fmt {
            b"PNG" => "image/png".to_string(),
            b"JPG" => "image/jpeg".to_string(),
            other => format!("image/{}", String::from_utf8_lossy(other)),
        }
    } else {
        let (mime, rest_offset) = read_latin1_terminated(&body[offset..])?;
        offset += rest_offset;
        if mime.is_empty() {
            "image/".to_string()
        } else {
            mime
        }
    };
    let picture_type = body.get(offset).copied().unwrap_or(0);
    offset += 1;
    let (description, rest_offset) = split_terminated(&body[offset..], encoding)?;
    let description = decode_string(description, encoding)?;
    offset += rest_offset;
    let data = body[offset..].to_vec();
    let mime = if mime.is_empty() || mime == "image/" {
        crate::imaging::guess_mime(&data)
            .map(str::to_string)
            .unwrap_or(mime)
    } else {
        mime
    };
    Ok(NativeValue::Picture(Picture {
        mime,
        data,
        description: if description.is_empty() {
            None
        } else {
            Some(description)
        },
        picture_type: Some(id3_picture_type_name(picture_type).to_string()),
    }))
}

fn read_latin1_terminated(bytes: &[u8]) -> crate::error::Result<(String, usize)> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let consumed = if end < bytes.len() { end + 1 } else { end };
    Ok((decode_string(&bytes[..end], Encoding::Latin1)?, consumed))
}

/// Splits `bytes` at the first encoding-appropriate NUL terminator,
/// returning `(before, after)` with the terminator consumed from neither
/// slice's length accounting (the caller only needs `after`'s starting
/// offset, returned as a byproduct via slicing `bytes` itself).
fn split_terminated(bytes: &[u8], encoding: Encoding) -> crate::error::Result<(&[u8], &[u8])> {
    let step = match encoding {
        Encoding::Utf16Bom | Encoding::Utf16Be | Encoding::Utf16Le => 2,
        _ => 1,
    };
    let mut i = 0;
    while i + step <= bytes.len() {
        if bytes[i..i + step].iter().all(|b| *b == 0) {
            return Ok((&bytes[..i], &bytes[i + step..]));
        }
        i += step;
    }
    Ok((bytes, &[]))
}

pub(crate) fn id3_picture_type_name(byte: u8) -> &'static str {
    const NAMES: [&str; 21] = [
        "Other",
        "32x32 file icon",
        "Other file icon",
        "Cover (front)",
        "Cover (back)",
        "Leaflet page",
        "Media",
        "Lead artist",
        "Artist",
        "Conductor",
        "Band",
        "Composer",
        "Lyricist",
        "Recording location",
        "During recording",
        "During performance",
        "Movie/video screen capture",
        "A bright colored fish",
        "Illustration",
        "Band/artist logotype",
        "Publisher/studio logotype",
    ];
    NAMES.get(byte as usize).copied().unwrap_or("Other")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_latin1_text_frame() {
        let mut body = vec![0u8];
        body.extend_from_slice(b"Hello");
        let values = decode_frame("TIT2", &body).unwrap();
        assert_eq!(values.len(), 1);
        assert!(matches!(&values[0].1, NativeValue::Text(s) if s == "Hello"));
    }

    #[test]
    fn decodes_trck_of_total() {
        let mut body = vec![0u8];
        body.extend_from_slice(b"3/12");
        let values = decode_frame("TRCK", &body).unwrap();
        assert!(matches!(
            &values[0].1,
            NativeValue::OfTotal(OfTotal { no: Some(3), of: Some(12) })
        ));
    }

    #[test]
    fn decodes_popm_rating() {
        let mut body = b"me@example.com".to_vec();
        body.push(0);
        body.push(255);
        let values = decode_frame("POPM", &body).unwrap();
        match &values[0].1 {
            NativeValue::Rating { source, rating } => {
                assert_eq!(source.as_deref(), Some("me@example.com"));
                assert!((*rating - 1.0).abs() < 1e-9);
            }
            _ => panic!("expected rating"),
        }
    }

    #[test]
    fn v4_multi_value_text_splits_on_nul() {
        let mut body = vec![3u8]; // UTF-8
        body.extend_from_slice(b"A\0B");
        let values = decode_frame("TPE1", &body).unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn txxx_id_is_its_description() {
        let mut body = vec![0u8]; // latin1
        body.extend_from_slice(b"REPLAYGAIN_TRACK_GAIN");
        body.push(0);
        body.extend_from_slice(b"-6.00 dB");
        let values = decode_frame("TXXX", &body).unwrap();
        assert_eq!(values[0].0, "REPLAYGAIN_TRACK_GAIN");
        assert!(matches!(&values[0].1, NativeValue::Text(s) if s == "-6.00 dB"));
    }
}
