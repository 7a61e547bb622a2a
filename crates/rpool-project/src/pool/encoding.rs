use rpool_core::{NormalizedPath, Uid};

use super::AudioPoolEntry;

pub fn encode_entry(entry: &AudioPoolEntry) -> String {
    format!("{}|{}", entry.uid, entry.path)
}

pub fn decode_entry(line: &str) -> Result<AudioPoolEntry, String> {
    let (uid, path) = line
        .split_once('|')
        .ok_or_else(|| format!("expected `uid|path`, got `{line}`"))?;

    let uid: Uid = uid.parse().map_err(|e| format!("invalid uid `{uid}`: {e}"))?;

    if path.is_empty() {
        return Err(format!("empty path for uid {uid}"));
    }

    Ok(AudioPoolEntry {
        uid,
        path: NormalizedPath::new(path),
    })
}
