//! Thin wrapper around `image::guess_format` used to fill in a picture's
//! MIME type when its tag system only gives a generic or empty one (FLAC
//! `PICTURE` blocks and ID3v2.3/2.4 `APIC` frames both allow this; spec.md
//! §4.4 doesn't mandate a fallback, but leaving `"image/"` on the wire is
//! useless to a common-view consumer). This only inspects the leading magic
//! bytes; no pixel decoding happens, keeping with the "does not decode
//! audio samples" non-goal's spirit of staying off the O(file size) path.

use image::ImageFormat;

pub fn guess_mime(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_png_from_magic() {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0u8; 8]);
        assert_eq!(guess_mime(&data), Some("image/png"));
    }

    #[test]
    fn unknown_bytes_guess_nothing() {
        assert_eq!(guess_mime(&[0u8; 16]), None);
    }
}
