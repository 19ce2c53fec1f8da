use crate::common_view::CommonView;
use crate::error::Warning;
use crate::format::FormatFacts;
use crate::tag::NativeTagSet;
use serde::Serialize;

/// Immutable snapshot handed to observers at each event (spec.md §4.6).
/// Observers may retain it but must not mutate it. There is no `&mut`
/// to reach through this type.
#[derive(Debug, Clone)]
pub struct ParseResultSnapshot {
    pub common: CommonView,
    pub format: FormatFacts,
}

/// The final, immutable result of a parse (spec.md §4.7 "Result
/// assembler"). Always contains a `common` view (possibly empty) and
/// `format.container` on success; construction fails with
/// `UnsupportedContainer` when no parser matched.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub format: FormatFacts,
    pub common: CommonView,
    /// Present only when `ParseOptions::native` was set.
    pub native: Option<NativeTagSet>,
    pub warnings: Vec<Warning>,
}

impl ParseResult {
    pub fn snapshot(&self) -> ParseResultSnapshot {
        ParseResultSnapshot {
            common: self.common.clone(),
            format: self.format.clone(),
        }
    }
}
