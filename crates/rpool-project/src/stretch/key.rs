use std::hash::{Hash, Hasher};

use rpool_core::{NormalizedPath, Uid};

use super::{StretchMode, StretchParams};

/// Rounded parameters plus the original source path.
///
/// Floats compare by bit pattern; rounding folds `-0.0` into `0.0` so equal
/// parameters always produce equal keys.
#[derive(Debug, Clone)]
pub struct StretchKey {
    params: StretchParams,
    source: NormalizedPath,
}

impl StretchKey {
    pub fn new(params: &StretchParams, source: NormalizedPath) -> StretchKey {
        StretchKey {
            params: params.rounded(),
            source,
        }
    }

    pub fn params(&self) -> &StretchParams {
        &self.params
    }

    pub fn source(&self) -> &NormalizedPath {
        &self.source
    }

    fn bits(&self) -> (u8, [u64; 4], u32) {
        let p = &self.params;
        (
            p.mode.as_u8(),
            [
                p.rate.to_bits(),
                p.pitch.to_bits(),
                p.rate_end.to_bits(),
                p.pitch_end.to_bits(),
            ],
            p.crispness,
        )
    }

    /// `mode|rate|pitch|rate_end|pitch_end|crispness|source|||uid`
    pub fn encode(&self, uid: Uid) -> String {
        let p = &self.params;
        format!(
            "{}|{:?}|{:?}|{:?}|{:?}|{}|{}|||{}",
            p.mode.as_u8(),
            p.rate,
            p.pitch,
            p.rate_end,
            p.pitch_end,
            p.crispness,
            self.source,
            uid
        )
    }

    pub fn decode(line: &str) -> Result<(StretchKey, Uid), String> {
        let fields: Vec<&str> = line.splitn(7, '|').collect();
        let [mode, rate, pitch, rate_end, pitch_end, crispness, rest] = fields.as_slice() else {
            return Err(format!("expected 7 fields, got {}", fields.len()));
        };

        let (source, uid) = rest
            .rsplit_once("|||")
            .ok_or_else(|| format!("missing `|||` separator in `{rest}`"))?;

        let mode = mode
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(StretchMode::from_u8)
            .ok_or_else(|| format!("invalid mode `{mode}`"))?;

        let params = StretchParams {
            mode,
            rate: parse_float("rate", rate)?,
            pitch: parse_float("pitch", pitch)?,
            rate_end: parse_float("rate_end", rate_end)?,
            pitch_end: parse_float("pitch_end", pitch_end)?,
            crispness: crispness
                .trim()
                .parse()
                .map_err(|e| format!("invalid crispness `{crispness}`: {e}"))?,
        };

        if source.is_empty() {
            return Err("empty source path".into());
        }

        let uid: Uid = uid.parse().map_err(|e| format!("invalid uid `{uid}`: {e}"))?;

        Ok((StretchKey::new(&params, NormalizedPath::new(source)), uid))
    }
}

fn parse_float(name: &str, v: &str) -> Result<f64, String> {
    v.trim()
        .parse()
        .map_err(|e| format!("invalid {name} `{v}`: {e}"))
}

impl PartialEq for StretchKey {
    fn eq(&self, other: &StretchKey) -> bool {
        self.bits() == other.bits() && self.source == other.source
    }
}

impl Eq for StretchKey {}

impl Hash for StretchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
        self.source.hash(state);
    }
}
