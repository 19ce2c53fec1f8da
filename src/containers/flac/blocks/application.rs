//! `APPLICATION` block: a registered 4-byte id followed by opaque
//! application-defined bytes. Native-view passthrough only (spec.md §4.4
//! "Supplemented" note), carried as a binary native tag rather than
//! mapped into the common view, since its contents have no fixed meaning.

use crate::containers::Emit;
use crate::error::Result;
use crate::tag::{NativeTag, TagSystem};
use crate::tokenizer::Tokenizer;
use crate::value::NativeValue;

pub fn decode(tokenizer: &mut dyn Tokenizer, block_len: usize, emit: &mut Emit) -> Result<()> {
    let application_id = tokenizer.read_bytes(4)?;
    let data = tokenizer.read_bytes(block_len.saturating_sub(4))?;
    let id = format!("APPLICATION:{}", String::from_utf8_lossy(&application_id));
    emit.tag(TagSystem::Vorbis, NativeTag::new(id, NativeValue::Binary(data)));
    Ok(())
}
