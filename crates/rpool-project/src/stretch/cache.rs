use rpool_core::collections::HashMap;
use rpool_core::path::Utf8Path;
use rpool_core::{NormalizedPath, Uid};

use super::StretchKey;
use crate::error::{Error, Result};
use crate::text_file;

const MAP_SEPARATOR: &str = "|||";

/// Persistent record of rendered time-stretches.
///
/// `entries` maps a request to the uid of its rendered file, `originals`
/// maps every rendered file back to the file it was rendered from. Chains
/// are collapsed on insert, so the original of a rendered file is never
/// itself a rendered file.
#[derive(Debug, Clone, Default)]
pub struct StretchCache {
    entries: HashMap<StretchKey, Uid>,
    originals: HashMap<NormalizedPath, NormalizedPath>,
}

impl StretchCache {
    /// Reads both cache files. Missing files are empty caches.
    pub fn load(cache_file: &Utf8Path, map_file: &Utf8Path) -> Result<StretchCache> {
        let mut cache = StretchCache::default();

        for (line, record) in text_file::read_records(cache_file)?.unwrap_or_default() {
            let (key, uid) =
                StretchKey::decode(&record).map_err(|e| Error::new_malformed(cache_file, line, e))?;
            cache.entries.insert(key, uid);
        }

        for (line, record) in text_file::read_records(map_file)?.unwrap_or_default() {
            let (derived, original) = record.split_once(MAP_SEPARATOR).ok_or_else(|| {
                Error::new_malformed(map_file, line, "expected `derived|||original`")
            })?;
            cache
                .originals
                .insert(NormalizedPath::new(derived), NormalizedPath::new(original));
        }

        cache.collapse_chains();
        Ok(cache)
    }

    pub fn save(&self, cache_file: &Utf8Path, map_file: &Utf8Path) -> Result<()> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(key, &uid)| (uid, key.source().clone()));
        text_file::write_records(cache_file, entries.iter().map(|(key, &uid)| key.encode(uid)))?;

        let mut originals: Vec<_> = self.originals.iter().collect();
        originals.sort();
        text_file::write_records(
            map_file,
            originals
                .iter()
                .map(|(derived, original)| format!("{derived}{MAP_SEPARATOR}{original}")),
        )
    }

    pub fn get(&self, key: &StretchKey) -> Option<Uid> {
        self.entries.get(key).copied()
    }

    /// Records a render of `key` stored at `derived` under `uid`.
    pub fn insert(&mut self, key: StretchKey, uid: Uid, derived: NormalizedPath) {
        let original = self.resolve_original(key.source()).clone();
        self.originals.insert(derived, original);
        self.entries.insert(key, uid);
    }

    pub fn remove(&mut self, key: &StretchKey) -> Option<Uid> {
        self.entries.remove(key)
    }

    pub fn remove_derived(&mut self, derived: &NormalizedPath) -> Option<NormalizedPath> {
        self.originals.remove(derived)
    }

    /// The file `path` was rendered from, or `path` itself.
    pub fn resolve_original<'a>(&'a self, path: &'a NormalizedPath) -> &'a NormalizedPath {
        self.originals.get(path).unwrap_or(path)
    }

    pub fn is_derived(&self, path: &NormalizedPath) -> bool {
        self.originals.contains_key(path)
    }

    /// One past the largest uid any entry renders to, `0` when empty.
    pub fn next_uid(&self) -> Result<Uid> {
        match self.entries.values().copied().max() {
            Some(uid) => uid.checked_next().ok_or(Error::UidExhausted),
            None => Ok(Uid::ZERO),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StretchKey, Uid)> + '_ {
        self.entries.iter().map(|(k, &v)| (k, v))
    }

    pub fn originals(&self) -> impl Iterator<Item = (&NormalizedPath, &NormalizedPath)> + '_ {
        self.originals.iter()
    }

    fn collapse_chains(&mut self) {
        let limit = self.originals.len();
        let mut updates = Vec::new();

        for (derived, original) in &self.originals {
            let mut current = original;
            let mut hops = 0;

            while let Some(next) = self.originals.get(current) {
                hops += 1;
                if hops > limit || next == derived {
                    tracing::warn!(%derived, "cycle in stretch map, keeping first hop");
                    current = original;
                    break;
                }
                current = next;
            }

            if current != original {
                updates.push((derived.clone(), current.clone()));
            }
        }

        for (derived, original) in updates {
            tracing::debug!(%derived, %original, "collapsed stretch map chain");
            self.originals.insert(derived, original);
        }
    }
}
