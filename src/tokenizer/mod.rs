mod slice;
mod stream;

pub use slice::SliceTokenizer;
pub use stream::StreamTokenizer;

use crate::error::Result;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Text encoding a string-typed read is declared in, per spec.md §3/§4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Latin1,
    Utf8,
    Utf16Bom,
    Utf16Be,
    Utf16Le,
}

pub fn decode_string(bytes: &[u8], encoding: Encoding) -> Result<String> {
    let (decoder, bytes) = match encoding {
        Encoding::Latin1 => (encoding_rs::WINDOWS_1252, bytes),
        Encoding::Utf8 => {
            return Ok(String::from_utf8_lossy(strip_trailing_nul(bytes)).into_owned())
        }
        Encoding::Utf16Bom => {
            if bytes.starts_with(&[0xFF, 0xFE]) {
                (encoding_rs::UTF_16LE, &bytes[2..])
            } else if bytes.starts_with(&[0xFE, 0xFF]) {
                (encoding_rs::UTF_16BE, &bytes[2..])
            } else {
                (encoding_rs::UTF_16LE, bytes)
            }
        }
        Encoding::Utf16Be => (encoding_rs::UTF_16BE, bytes),
        Encoding::Utf16Le => (encoding_rs::UTF_16LE, bytes),
    };
    let (text, _, had_errors) = decoder.decode(strip_trailing_nul(bytes));
    if had_errors {
        log::debug!("string decode ({decoder:?}) hit replacement characters");
    }
    Ok(text.into_owned())
}

fn strip_trailing_nul(bytes: &[u8]) -> &[u8] {
    match bytes {
        [rest @ .., 0] => rest,
        other => other,
    }
}

/// Forward-only, position-tracked, typed reads over an arbitrary byte
/// source (spec.md §4.1). Buffer-backed tokenizers additionally implement
/// [`SeekableTokenizer`] for the envelope re-sniff.
pub trait Tokenizer {
    fn position(&self) -> u64;

    /// `None` when the underlying source has no known length (a pure
    /// forward stream), per spec.md §3.
    fn size(&self) -> Option<u64>;

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;
    fn peek_bytes(&mut self, len: usize) -> Result<Vec<u8>>;
    fn skip(&mut self, len: u64) -> Result<()>;

    fn ignore(&mut self, len: u64) -> Result<()> {
        self.skip(len)
    }

    /// `Some` for tokenizers that also implement [`SeekableTokenizer`],
    /// `None` for forward-only ones. Lets a caller holding only `&mut dyn
    /// Tokenizer` opt into backward seeking when the concrete tokenizer
    /// supports it, without downcasting.
    fn as_seekable(&mut self) -> Option<&mut dyn SeekableTokenizer> {
        None
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_bytes(2)?))
    }
    fn read_u16le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_bytes(2)?))
    }
    fn read_u24be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u24(&self.read_bytes(3)?))
    }
    fn read_u24le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u24(&self.read_bytes(3)?))
    }
    fn read_u32be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_bytes(4)?))
    }
    fn read_u32le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_bytes(4)?))
    }
    fn read_u64be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_bytes(8)?))
    }
    fn read_u64le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_bytes(8)?))
    }
    fn read_i32be(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(&self.read_bytes(4)?))
    }
    fn read_i32le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(&self.read_bytes(4)?))
    }
    fn read_f32be(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(&self.read_bytes(4)?))
    }
    fn read_f32le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(&self.read_bytes(4)?))
    }
    fn read_f64be(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(&self.read_bytes(8)?))
    }

    /// Reads a `u32`-length-prefixed string (little-endian length, as used
    /// by Vorbis comments).
    fn read_length_prefixed_string_le(&mut self, encoding: Encoding) -> Result<String> {
        let len = self.read_u32le()? as usize;
        self.read_fixed_string(len, encoding)
    }

    /// Peeks up to `max_len` bytes without failing when fewer are available
    /// before end-of-stream, used by the sniffer, which only ever wants
    /// "as many leading bytes as exist" rather than an exact count (spec.md
    /// §4.3). Binary-searches the largest length `peek_bytes` accepts so a
    /// short buffer-backed source still returns its few leading bytes
    /// instead of failing outright.
    fn peek_available(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if max_len == 0 {
            return Ok(Vec::new());
        }
        if let Ok(v) = self.peek_bytes(max_len) {
            return Ok(v);
        }
        let (mut lo, mut hi) = (0usize, max_len);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            match self.peek_bytes(mid) {
                Ok(_) => lo = mid,
                Err(_) => hi = mid - 1,
            }
        }
        if lo == 0 {
            Ok(Vec::new())
        } else {
            self.peek_bytes(lo)
        }
    }

    fn read_fixed_string(&mut self, len: usize, encoding: Encoding) -> Result<String> {
        decode_string(&self.read_bytes(len)?, encoding)
    }

    /// Reads a NUL-terminated string of the given encoding, consuming the
    /// terminator. For UTF-16 variants the terminator is a two-byte `0x0000`.
    fn read_terminated_string(&mut self, encoding: Encoding) -> Result<String> {
        let step = match encoding {
            Encoding::Utf16Bom | Encoding::Utf16Be | Encoding::Utf16Le => 2,
            _ => 1,
        };
        let mut buf = Vec::new();
        loop {
            let chunk = self.read_bytes(step)?;
            if chunk.iter().all(|b| *b == 0) {
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        decode_string(&buf, encoding)
    }
}

/// Capability exposed only by buffer-backed tokenizers: arbitrary backward
/// seeking, used by the ID3v2-envelope re-sniff (spec.md §4.3) and by
/// parsers that need to revisit an earlier offset (e.g. MP4 `stco` tables).
pub trait SeekableTokenizer: Tokenizer {
    fn seek_to(&mut self, position: u64) -> Result<()>;
}
