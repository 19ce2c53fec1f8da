//! `SEEKTABLE` block: fixed 18-byte seek points, implied count from the
//! block length (spec.md §4.4 "Supplemented" note). Carried as a raw
//! native entry rather than mapped into the common view.

use crate::containers::Emit;
use crate::error::{AudiometaError, Result};
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::Tokenizer;
use crate::value::NativeValue;

const SEEK_POINT_SIZE: usize = 18;

pub fn decode(tokenizer: &mut dyn Tokenizer, block_len: usize, emit: &mut Emit) -> Result<()> {
    if block_len % SEEK_POINT_SIZE != 0 {
        return Err(AudiometaError::InvalidSeekTableSize);
    }
    let points = block_len / SEEK_POINT_SIZE;
    emit.tag(
        TagSystem::Vorbis,
        NativeTag::new("SEEKTABLE:points", NativeValue::Int(points as i64)),
    );
    tokenizer.skip(block_len as u64)?;
    Ok(())
}
