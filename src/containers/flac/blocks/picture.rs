//! `PICTURE` metadata block (spec.md §4.4), also reused to decode the body
//! of a Vorbis-comment `METADATA_BLOCK_PICTURE` field, which is the same
//! layout without the outer block header.

use crate::containers::id3v2::id3_picture_type_name;
use crate::error::Result;
use crate::tokenizer::{Encoding, SliceTokenizer, Tokenizer};
use crate::value::Picture;

/// Decodes a `PICTURE` block body: type, MIME type, description, the
/// width/height/depth/color-count quartet this crate doesn't surface
/// individually, and the picture bytes themselves.
pub fn decode_picture_body(body: &[u8]) -> Result<Picture> {
    let mut cursor = SliceTokenizer::new(body);
    let picture_type = cursor.read_u32be()?;
    let mime_len = cursor.read_u32be()? as usize;
    let mime = cursor.read_fixed_string(mime_len, Encoding::Latin1)?;
    let description_len = cursor.read_u32be()? as usize;
    let description = cursor.read_fixed_string(description_len, Encoding::Utf8)?;
    cursor.skip(16)?; // width, height, depth, color count
    let data_len = cursor.read_u32be()? as usize;
    let data = cursor.read_bytes(data_len)?;

    Ok(Picture {
        mime: if mime.is_empty() {
            crate::imaging::guess_mime(&data)
                .map(str::to_string)
                .unwrap_or_else(|| "image/".to_string())
        } else {
            mime
        },
        data,
        description: if description.is_empty() {
            None
        } else {
            Some(description)
        },
        picture_type: Some(id3_picture_type_name(picture_type as u8).to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_picture() {
        let mut body = Vec::new();
        body.extend_from_slice(&3u32.to_be_bytes()); // cover front
        body.extend_from_slice(&9u32.to_be_bytes());
        body.extend_from_slice(b"image/png");
        body.extend_from_slice(&0u32.to_be_bytes()); // no description
        body.extend_from_slice(&[0u8; 16]);
        body.extend_from_slice(&4u32.to_be_bytes());
        body.extend_from_slice(&[1, 2, 3, 4]);

        let picture = decode_picture_body(&body).unwrap();
        assert_eq!(picture.mime, "image/png");
        assert_eq!(picture.data, vec![1, 2, 3, 4]);
        assert_eq!(picture.picture_type.as_deref(), Some("Cover (front)"));
    }
}
