//! `CUESHEET` block: media catalog number, lead-in, and per-track index
//! points (spec.md §4.4 "Supplemented" note). The catalog number is the
//! only field surfaced as a native tag; the track/index structure has no
//! common-view counterpart and is skipped rather than decoded in full.

use crate::containers::Emit;
use crate::error::Result;
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::{Encoding, Tokenizer};
use crate::value::NativeValue;

pub fn decode(tokenizer: &mut dyn Tokenizer, block_len: usize, emit: &mut Emit) -> Result<()> {
    let catalog = tokenizer.read_fixed_string(128, Encoding::Latin1)?;
    let catalog = catalog.trim_end_matches('\0').trim();
    if !catalog.is_empty() {
        emit.tag(
            TagSystem::Vorbis,
            NativeTag::new("CUESHEET:catalog", NativeValue::Text(catalog.to_string())),
        );
    }
    tokenizer.skip((block_len - 128) as u64)?;
    Ok(())
}
