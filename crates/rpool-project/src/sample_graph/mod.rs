//! Peak summaries the engine writes for every pool entry.
//!
//! A graph file is a list of records terminated by the usual sentinel line:
//!
//! ```text
//! meta|filename|/path/to/file.wav
//! meta|timestamp|1700000000
//! meta|channels|2
//! meta|frame_count|44100
//! meta|sample_rate|44100
//! meta|length|1.0
//! p|0|h|0.5
//! p|0|l|-0.5
//! \
//! ```

mod cache;
mod ops;

use std::time::{SystemTime, UNIX_EPOCH};

use rpool_core::path::Utf8Path;
use rpool_core::NormalizedPath;

pub use self::cache::SampleGraphCache;
use crate::error::{Error, Result, ResultExt};
use crate::text_file;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleGraph {
    pub source: NormalizedPath,
    /// Seconds since the unix epoch when the graph was generated.
    pub timestamp: i64,
    pub frame_count: u64,
    pub sample_rate: u32,
    pub length_secs: f64,
    pub channels: Vec<ChannelPeaks>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelPeaks {
    pub high: Vec<f32>,
    pub low: Vec<f32>,
}

impl SampleGraph {
    pub fn load(path: &Utf8Path) -> Result<SampleGraph> {
        let records = text_file::read_records(path)?.ok_or_else(|| {
            Error::new_filesystem(path, std::io::ErrorKind::NotFound.into())
        })?;

        let mut source = None;
        let mut timestamp = None;
        let mut channel_count = None;
        let mut frame_count = 0;
        let mut sample_rate = 0;
        let mut length_secs = 0.0;
        let mut channels: Vec<ChannelPeaks> = Vec::new();

        for (line, record) in records {
            let malformed = |message: String| Error::new_malformed(path, line, message);
            let fields: Vec<&str> = record.split('|').collect();

            match fields.as_slice() {
                ["meta", "filename", value @ ..] => {
                    source = Some(NormalizedPath::new(value.join("|")));
                }
                ["meta", key, value] => {
                    let invalid = |e: &dyn std::fmt::Display| {
                        malformed(format!("invalid {key} `{value}`: {e}"))
                    };
                    match *key {
                        "timestamp" => {
                            timestamp = Some(value.parse::<i64>().map_err(|e| invalid(&e))?);
                        }
                        "channels" => {
                            channel_count = Some(value.parse::<usize>().map_err(|e| invalid(&e))?);
                        }
                        "frame_count" => {
                            frame_count = value.parse::<u64>().map_err(|e| invalid(&e))?;
                        }
                        "sample_rate" => {
                            sample_rate = value.parse::<u32>().map_err(|e| invalid(&e))?;
                        }
                        "length" => length_secs = value.parse::<f64>().map_err(|e| invalid(&e))?,
                        _ => tracing::debug!(%path, key, "unknown sample graph meta key"),
                    }
                }
                ["p", channel, kind, peak] => {
                    let channel: usize = channel
                        .parse()
                        .map_err(|e| malformed(format!("invalid channel `{channel}`: {e}")))?;
                    let peak: f32 = peak
                        .parse()
                        .map_err(|e| malformed(format!("invalid peak `{peak}`: {e}")))?;

                    if channel >= channels.len() {
                        channels.resize_with(channel + 1, ChannelPeaks::default);
                    }

                    match *kind {
                        "h" => channels[channel].high.push(peak),
                        "l" => channels[channel].low.push(peak),
                        _ => return Err(malformed(format!("invalid peak kind `{kind}`"))),
                    }
                }
                _ => return Err(malformed(format!("unexpected record `{record}`"))),
            }
        }

        let invalid = |message: &str| Error::InvalidSampleGraph {
            path: path.to_owned(),
            message: message.into(),
        };

        let source = source.ok_or_else(|| invalid("missing filename"))?;
        let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
        let channel_count = channel_count.ok_or_else(|| invalid("missing channel count"))?;

        if channel_count == 0 {
            return Err(invalid("zero channels"));
        }

        if channels.len() != channel_count {
            return Err(invalid("peak data does not match channel count"));
        }

        if channels.iter().any(|c| c.high.len() != c.low.len()) {
            return Err(invalid("unbalanced peak data"));
        }

        Ok(SampleGraph {
            source,
            timestamp,
            frame_count,
            sample_rate,
            length_secs,
            channels,
        })
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let mut records = vec![
            format!("meta|filename|{}", self.source),
            format!("meta|timestamp|{}", self.timestamp),
            format!("meta|channels|{}", self.channels.len()),
            format!("meta|frame_count|{}", self.frame_count),
            format!("meta|sample_rate|{}", self.sample_rate),
            format!("meta|length|{}", self.length_secs),
        ];

        for (idx, channel) in self.channels.iter().enumerate() {
            for (high, low) in channel.high.iter().zip(&channel.low) {
                records.push(format!("p|{idx}|h|{high}"));
                records.push(format!("p|{idx}|l|{low}"));
            }
        }

        text_file::write_records(path, records)
    }

    /// Whether `source_file` was modified after the graph was generated.
    pub fn is_stale(&self, source_file: &Utf8Path) -> Result<bool> {
        let modified = source_file
            .metadata()
            .and_then(|m| m.modified())
            .fs_context(source_file)?;

        Ok(unix_secs(modified) > self.timestamp)
    }
}

pub(crate) fn unix_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(v) => v.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
