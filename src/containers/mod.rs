pub mod adts;
pub mod aiff;
pub mod ape;
pub mod asf;
pub mod dsdiff;
pub mod dsf;
pub mod flac;
pub mod id3v1;
pub mod id3v2;
pub mod mp4;
pub mod mpeg;
pub mod musepack;
pub mod ogg;
pub mod riff;
pub mod vorbis;
pub mod wavpack;

use crate::error::{Result, Warning};
use crate::format::{Container, FormatFacts};
use crate::options::ParseOptions;
use crate::tag::{NativeTag, NativeTagSet, TagSystem};
use crate::tokenizer::Tokenizer;

/// Sink a container parser writes into: native tags, format-fact
/// assignments, and warnings (spec.md §4.4 `parse(tokenizer, options,
/// emit) -> warnings`). Modeled as mutable references bundled together
/// rather than a callback, which reads more naturally in Rust while keeping
/// the same "sink" shape the spec describes.
pub struct Emit<'a> {
    pub format: FormatFacts,
    pub native: NativeTagSet,
    pub warnings: Vec<Warning>,
    pub options: &'a ParseOptions,
}

impl<'a> Emit<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Emit {
            format: FormatFacts::default(),
            native: NativeTagSet::new(),
            warnings: Vec::new(),
            options,
        }
    }

    pub fn tag(&mut self, system: TagSystem, mut tag: NativeTag) {
        if self.options.skip_covers {
            if let crate::value::NativeValue::Picture(picture) = &mut tag.value {
                picture.data.clear();
            }
        }
        self.format.note_tag_system(system);
        self.native.push(system, tag);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(Warning::new(message));
    }

    /// Disjoint borrow of `format`/`warnings`, needed because the
    /// set-once setters on [`FormatFacts`] take the warnings vec alongside
    /// `&mut self`.
    pub fn format_and_warnings(&mut self) -> (&mut FormatFacts, &mut Vec<Warning>) {
        (&mut self.format, &mut self.warnings)
    }
}

/// Dispatches to the container parser matching `container`, driving it with
/// `tokenizer` and accumulating into the caller's `emit` (spec.md §4.4).
/// Taking an existing sink rather than building one lets the driver reuse a
/// single [`Emit`] across an ID3v2 envelope and the audio container it
/// wraps, so tags and format facts from both land in the same result. Each
/// parser tolerates truncation beyond its declared header/metadata region:
/// it warns and returns rather than failing the whole parse (spec.md §4.4
/// closing paragraph).
pub fn parse_container(
    container: Container,
    tokenizer: &mut dyn Tokenizer,
    emit: &mut Emit,
) -> Result<()> {
    emit.format.set_container(container, &mut emit.warnings);
    match container {
        Container::Flac => flac::parse(tokenizer, emit)?,
        Container::Mpeg => mpeg::parse(tokenizer, emit)?,
        Container::Mp4 => mp4::parse(tokenizer, emit)?,
        Container::Asf => asf::parse(tokenizer, emit)?,
        Container::Ogg => ogg::parse(tokenizer, emit)?,
        Container::Riff => riff::parse(tokenizer, emit)?,
        Container::Aiff => aiff::parse(tokenizer, emit)?,
        Container::Wavpack => wavpack::parse(tokenizer, emit)?,
        Container::Musepack => musepack::parse(tokenizer, emit)?,
        Container::Dsf => dsf::parse(tokenizer, emit)?,
        Container::Dsdiff => dsdiff::parse(tokenizer, emit)?,
        Container::Adts => adts::parse(tokenizer, emit)?,
        Container::Apev2 => {
            let tags = ape::decode(tokenizer)?;
            for tag in tags {
                emit.tag(TagSystem::Apev2, tag);
            }
        }
    }
    Ok(())
}
