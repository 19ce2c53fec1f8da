use serde::Serialize;

/// A decoded embedded picture (FLAC `PICTURE`, ID3v2 `APIC`, MP4 `covr`, ...).
///
/// Pictures hold their bytes by value (spec.md §3 "Ownership and
/// lifecycle"); the largest single picture bounds the transient memory
/// budget of a parse, not the sum of all pictures (spec.md §9).
#[derive(Debug, Clone, Serialize)]
pub struct Picture {
    /// MIME type, e.g. `image/jpeg`. Synthesized as `image/jpeg`/`image/png`
    /// for formats whose native encoding identifies the picture by a class
    /// byte instead of a string (MP4 `data` atoms).
    pub mime: String,
    pub data: Vec<u8>,
    pub description: Option<String>,
    /// Free-form type label (e.g. "Cover (front)"), when the source format
    /// carries one.
    pub picture_type: Option<String>,
}

/// `track.no`/`track.of` or `disk.no`/`disk.of`, pre-split at the tag-decoder
/// layer rather than left as a single `"3/12"` string (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OfTotal {
    pub no: Option<u32>,
    pub of: Option<u32>,
}

/// A native tag's value. Closed tagged union per spec.md §3.
#[derive(Debug, Clone, Serialize)]
pub enum NativeValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Binary(Vec<u8>),
    Picture(Picture),
    Rating {
        source: Option<String>,
        rating: f64,
    },
    OfTotal(OfTotal),
}

impl NativeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NativeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            NativeValue::Int(i) => Some(*i),
            NativeValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
