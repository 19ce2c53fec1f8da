use crate::value::NativeValue;
use indexmap::IndexMap;
use serde::Serialize;

/// Closed set of tag systems a native tag can originate from (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSystem {
    Id3v1,
    #[serde(rename = "ID3v2.2")]
    Id3v22,
    #[serde(rename = "ID3v2.3")]
    Id3v23,
    #[serde(rename = "ID3v2.4")]
    Id3v24,
    #[serde(rename = "APEv2")]
    Apev2,
    Vorbis,
    #[serde(rename = "iTunes")]
    ITunes,
    Asf,
    #[serde(rename = "RIFF")]
    Riff,
    #[serde(rename = "AIFF")]
    Aiff,
    Matroska,
}

impl TagSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSystem::Id3v1 => "ID3v1",
            TagSystem::Id3v22 => "ID3v2.2",
            TagSystem::Id3v23 => "ID3v2.3",
            TagSystem::Id3v24 => "ID3v2.4",
            TagSystem::Apev2 => "APEv2",
            TagSystem::Vorbis => "vorbis",
            TagSystem::ITunes => "iTunes",
            TagSystem::Asf => "asf",
            TagSystem::Riff => "RIFF",
            TagSystem::Aiff => "AIFF",
            TagSystem::Matroska => "matroska",
        }
    }
}

/// `(id, value)` pair as emitted by its source tag system, preserving the
/// original identifier and raw value (spec.md §3 "Native tag").
#[derive(Debug, Clone, Serialize)]
pub struct NativeTag {
    pub id: String,
    pub value: NativeValue,
}

impl NativeTag {
    pub fn new(id: impl Into<String>, value: NativeValue) -> Self {
        NativeTag {
            id: id.into(),
            value,
        }
    }
}

/// `tag-system-name -> ordered sequence of native tags`. Duplicate
/// identifiers are preserved in arrival order (spec.md §3).
#[derive(Debug, Clone, Default, Serialize)]
pub struct NativeTagSet {
    #[serde(flatten)]
    systems: IndexMap<String, Vec<NativeTag>>,
}

impl NativeTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, system: TagSystem, tag: NativeTag) {
        self.systems
            .entry(system.as_str().to_string())
            .or_default()
            .push(tag);
    }

    pub fn get(&self, system: TagSystem) -> Option<&[NativeTag]> {
        self.systems.get(system.as_str()).map(|v| v.as_slice())
    }

    pub fn systems(&self) -> impl Iterator<Item = (&str, &[NativeTag])> {
        self.systems.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// All tags across every tag system, in the order their systems were
    /// first populated and, within a system, in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NativeTag)> {
        self.systems
            .iter()
            .flat_map(|(k, v)| v.iter().map(move |t| (k.as_str(), t)))
    }
}

/// `order_tags` utility from spec.md §6: collapses a flat native-tag
/// sequence into `id -> [values]`, preserving arrival order of both id and
/// value.
pub fn order_tags(tags: &[NativeTag]) -> IndexMap<String, Vec<NativeValue>> {
    let mut out: IndexMap<String, Vec<NativeValue>> = IndexMap::new();
    for tag in tags {
        out.entry(tag.id.clone()).or_default().push(tag.value.clone());
    }
    out
}
