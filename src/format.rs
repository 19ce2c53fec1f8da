use crate::error::Warning;
use crate::tag::TagSystem;
use serde::Serialize;

/// Closed set of supported containers (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mpeg,
    Apev2,
    Mp4,
    Asf,
    Flac,
    Ogg,
    Aiff,
    Wavpack,
    Riff,
    Musepack,
    Dsf,
    Dsdiff,
    Adts,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Mpeg => "MPEG",
            Container::Apev2 => "apev2",
            Container::Mp4 => "mp4",
            Container::Asf => "asf",
            Container::Flac => "FLAC",
            Container::Ogg => "ogg",
            Container::Aiff => "aiff",
            Container::Wavpack => "wavpack",
            Container::Riff => "riff",
            Container::Musepack => "musepack",
            Container::Dsf => "dsf",
            Container::Dsdiff => "dsdiff",
            Container::Adts => "adts",
        }
    }
}

/// Audio-format facts (spec.md §3 "Format facts"). Each field is set at most
/// once per parse; a later differing assignment is downgraded to a warning
/// and the first value is kept (the "first wins" policy spec.md names,
/// which a parser may override for fields it owns exclusively).
#[derive(Debug, Clone, Serialize)]
pub struct FormatFacts {
    pub container: Option<Container>,
    pub tag_systems: Vec<TagSystem>,
    pub duration: Option<f64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u16>,
    pub number_of_channels: Option<u8>,
    pub number_of_samples: Option<u64>,
    pub codec: Option<String>,
    pub codec_profile: Option<String>,
    pub tool: Option<String>,
    pub lossless: Option<bool>,
    pub audio_md5: Option<[u8; 16]>,
}

impl Default for FormatFacts {
    fn default() -> Self {
        FormatFacts {
            container: None,
            tag_systems: Vec::new(),
            duration: None,
            bitrate: None,
            sample_rate: None,
            bits_per_sample: None,
            number_of_channels: None,
            number_of_samples: None,
            codec: None,
            codec_profile: None,
            tool: None,
            lossless: None,
            audio_md5: None,
        }
    }
}

macro_rules! set_once {
    ($name:ident, $field:ident, $ty:ty) => {
        /// Sets `
        #[doc = stringify!($field)]
        /// ` if unset; otherwise pushes a warning if the new value differs
        /// from the one already recorded, and keeps the first value.
        pub fn $name(&mut self, value: $ty, warnings: &mut Vec<Warning>) {
            match &self.$field {
                None => self.$field = Some(value),
                Some(existing) if *existing != value => {
                    warnings.push(Warning::new(format!(
                        "{} already set to {:?}, ignoring differing value {:?}",
                        stringify!($field),
                        existing,
                        value
                    )));
                }
                Some(_) => {}
            }
        }
    };
}

impl FormatFacts {
    pub fn note_tag_system(&mut self, system: TagSystem) {
        if !self.tag_systems.contains(&system) {
            self.tag_systems.push(system);
        }
    }

    set_once!(set_container, container, Container);
    set_once!(set_duration, duration, f64);
    set_once!(set_sample_rate, sample_rate, u32);
    set_once!(set_bits_per_sample, bits_per_sample, u16);
    set_once!(set_number_of_channels, number_of_channels, u8);
    set_once!(set_number_of_samples, number_of_samples, u64);
    set_once!(set_bitrate, bitrate, u32);
    set_once!(set_lossless, lossless, bool);
    set_once!(set_audio_md5, audio_md5, [u8; 16]);

    pub fn set_codec(&mut self, value: impl Into<String>, warnings: &mut Vec<Warning>) {
        let value = value.into();
        match &self.codec {
            None => self.codec = Some(value),
            Some(existing) if *existing != value => {
                warnings.push(Warning::new(format!(
                    "codec already set to {existing:?}, ignoring differing value {value:?}"
                )));
            }
            Some(_) => {}
        }
    }

    pub fn set_tool(&mut self, value: impl Into<String>) {
        if self.tool.is_none() {
            self.tool = Some(value.into());
        }
    }

    pub fn set_codec_profile(&mut self, value: impl Into<String>) {
        if self.codec_profile.is_none() {
            self.codec_profile = Some(value.into());
        }
    }

    /// Derives `duration` from `numberOfSamples / sampleRate` when both are
    /// known, else from `fileSize * 8 / bitrate` (spec.md §4.4, §9).
    pub fn derive_duration(&mut self, file_size: Option<u64>) {
        if self.duration.is_some() {
            return;
        }
        if let (Some(samples), Some(rate)) = (self.number_of_samples, self.sample_rate) {
            if rate > 0 {
                self.duration = Some(samples as f64 / rate as f64);
                return;
            }
        }
        if let (Some(size), Some(bitrate)) = (file_size, self.bitrate) {
            if bitrate > 0 {
                self.duration = Some((size as f64 * 8.0) / bitrate as f64);
            }
        }
    }
}
