//! Streaming parser for audio-file metadata (spec.md §1): sniffs the
//! container, decodes whichever tag systems it carries, and exposes both
//! the raw per-system **native** view and a normalized **common** view
//! alongside the codec/sample-rate/duration **format facts**.
//!
//! The three entry points mirror spec.md §6 exactly:
//!
//! - [`parse_from_buffer`]: in-memory byte slice, trailer scan enabled.
//! - [`parse_from_stream`]: forward-only [`std::io::Read`], trailer scan
//!   disabled.
//! - [`parse_from_tokenizer`]: advanced, drives an already-built
//!   [`Tokenizer`](tokenizer::Tokenizer) directly.

pub mod common_view;
pub mod containers;
pub mod error;
pub mod events;
pub mod format;
pub mod imaging;
pub mod mapper;
pub mod observer;
pub mod options;
pub mod reader;
pub mod result;
pub mod sniff;
pub mod tag;
pub mod tokenizer;
pub mod trailer;
pub mod value;

mod driver;

#[cfg(feature = "async")]
pub mod async_tokenizer;

pub use common_view::rating_to_stars;
pub use driver::{parse_from_buffer, parse_from_stream, parse_from_tokenizer};
pub use error::{AudiometaError, Result, Warning};
pub use options::ParseOptions;
pub use result::{ParseResult, ParseResultSnapshot};
pub use tag::order_tags;
