use crate::observer::Observer;
use std::sync::Arc;

/// Recognized parse options (spec.md §6 "Options" table). All fields are
/// optional; a default `ParseOptions` reproduces the minimal behavior
/// described for `parse_from_stream`.
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// File path, used only for diagnostics (never reopened by the core).
    pub path: Option<String>,
    /// Overrides the tokenizer's size when the stream doesn't expose one.
    pub file_size: Option<u64>,
    /// Include the native tag view in the result. Default false.
    pub native: bool,
    /// Scan to end to compute duration when headers lack frame counts.
    pub duration: bool,
    /// Drop picture payloads (parsers still advance over the bytes).
    pub skip_covers: bool,
    /// Do not scan past main headers for trailing tags.
    pub skip_post_headers: bool,
    /// Event sink, see [`crate::observer`].
    pub observer: Option<Arc<dyn Observer>>,
    /// Byte offset of an APEv2 footer, known ahead of time by the caller.
    ///
    /// When both this and the value computed by the trailer scanner are
    /// present, this one wins (spec.md §9 Open Question).
    pub ape_offset: Option<u64>,
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("native", &self.native)
            .field("duration", &self.duration)
            .field("skip_covers", &self.skip_covers)
            .field("skip_post_headers", &self.skip_post_headers)
            .field("observer", &self.observer.is_some())
            .field("ape_offset", &self.ape_offset)
            .finish()
    }
}
