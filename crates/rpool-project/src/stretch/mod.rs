mod cache;
mod command;
mod key;
mod ops;
#[cfg(test)]
mod tests;

use rpool_core::Uid;

pub use self::cache::StretchCache;
pub use self::command::ExternalRender;
pub use self::key::StretchKey;
use crate::error::{Error, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StretchMode {
    /// Pitch envelope rendered by the engine.
    PitchEnvelope = 1,
    /// Rate envelope rendered by the engine.
    RateEnvelope = 2,
    Rubberband = 3,
    /// Rubberband with formant preservation.
    RubberbandFormants = 4,
    Sbsms = 5,
    Paulstretch = 6,
    SoundTouch = 7,
    /// SoundTouch tuned for speech.
    SoundTouchSpeech = 8,
}

impl StretchMode {
    pub fn from_u8(v: u8) -> Option<StretchMode> {
        Some(match v {
            1 => StretchMode::PitchEnvelope,
            2 => StretchMode::RateEnvelope,
            3 => StretchMode::Rubberband,
            4 => StretchMode::RubberbandFormants,
            5 => StretchMode::Sbsms,
            6 => StretchMode::Paulstretch,
            7 => StretchMode::SoundTouch,
            8 => StretchMode::SoundTouchSpeech,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Time-stretch settings of an audio item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchParams {
    pub mode: StretchMode,
    pub rate: f64,
    /// Semitones.
    pub pitch: f64,
    pub rate_end: f64,
    pub pitch_end: f64,
    pub crispness: u32,
}

impl Default for StretchParams {
    fn default() -> StretchParams {
        StretchParams {
            mode: StretchMode::Rubberband,
            rate: 1.0,
            pitch: 0.0,
            rate_end: 1.0,
            pitch_end: 0.0,
            crispness: 5,
        }
    }
}

impl StretchParams {
    /// Rounds every float to 6 decimal places, the precision the cache is
    /// keyed on.
    pub fn rounded(&self) -> StretchParams {
        StretchParams {
            rate: round6(self.rate),
            pitch: round6(self.pitch),
            rate_end: round6(self.rate_end),
            pitch_end: round6(self.pitch_end),
            ..*self
        }
    }

    /// Whether rendering these parameters would reproduce the source.
    pub fn is_identity(&self) -> bool {
        let neutral =
            self.rate == 1.0 && self.pitch == 0.0 && self.rate_end == 1.0 && self.pitch_end == 0.0;

        neutral
            || (self.mode == StretchMode::PitchEnvelope && self.pitch == self.pitch_end)
            || (self.mode == StretchMode::RateEnvelope && self.rate == self.rate_end)
    }

    pub fn validate(&self) -> Result<()> {
        let floats = [self.rate, self.pitch, self.rate_end, self.pitch_end];
        if floats.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidStretch {
                message: "parameters must be finite".into(),
            });
        }

        if self.rate <= 0.0 || self.rate_end <= 0.0 {
            return Err(Error::InvalidStretch {
                message: format!("rates must be positive, got {} and {}", self.rate, self.rate_end),
            });
        }

        Ok(())
    }

    pub fn render(&self) -> Render {
        let external = match self.mode {
            StretchMode::PitchEnvelope => {
                return Render::Envelope(Envelope::Pitch {
                    start: self.pitch,
                    end: self.pitch_end,
                })
            }
            StretchMode::RateEnvelope => {
                return Render::Envelope(Envelope::Rate {
                    start: self.rate,
                    end: self.rate_end,
                })
            }
            StretchMode::Rubberband | StretchMode::RubberbandFormants => {
                ExternalRender::Rubberband {
                    rate: self.rate,
                    pitch: self.pitch,
                    crispness: self.crispness,
                    formants: self.mode == StretchMode::RubberbandFormants,
                }
            }
            StretchMode::Sbsms => ExternalRender::Sbsms {
                rate_start: self.rate,
                rate_end: self.rate_end,
                pitch_start: self.pitch,
                pitch_end: self.pitch_end,
            },
            StretchMode::Paulstretch => ExternalRender::Paulstretch { stretch: self.rate },
            StretchMode::SoundTouch | StretchMode::SoundTouchSpeech => ExternalRender::SoundTouch {
                rate: self.rate,
                pitch: self.pitch,
                speech: self.mode == StretchMode::SoundTouchSpeech,
            },
        };

        Render::External(external)
    }
}

fn round6(v: f64) -> f64 {
    let v = (v * 1e6).round() / 1e6;
    // fold -0.0 so equal keys print and hash the same
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// How a set of parameters gets rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Render {
    Envelope(Envelope),
    External(ExternalRender),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    Pitch { start: f64, end: f64 },
    Rate { start: f64, end: f64 },
}

/// A clip on the timeline that plays a pool entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioItem {
    pub uid: Uid,
    pub stretch: StretchParams,
}

impl AudioItem {
    pub fn new(uid: Uid) -> AudioItem {
        AudioItem {
            uid,
            stretch: StretchParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchOutcome {
    /// The parameters are a no-op, the item keeps playing its source.
    Unchanged,
    /// The parameters are a no-op and the item was playing a render, it now
    /// plays the original again.
    Restored(Uid),
    /// A previous render was reused.
    CacheHit(Uid),
    /// A new file was rendered and registered.
    Rendered(Uid),
}
