mod encoding;
mod ops;

use rpool_core::collections::{HashMap, HashSet};
use rpool_core::path::Utf8Path;
use rpool_core::{NormalizedPath, Uid};

use crate::error::{Error, Result};
use crate::text_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPoolEntry {
    pub uid: Uid,
    pub path: NormalizedPath,
}

/// Registry of every audio file a project refers to.
///
/// Entries are never removed, uids are never reused. Paths are unique for
/// entries added through [`AudioPool::add_entry`]; a pool loaded from disk
/// may still contain duplicate paths, in which case the last entry wins in
/// [`AudioPool::by_path`] and [`AudioPool::find_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioPool {
    entries: Vec<AudioPoolEntry>,
}

impl AudioPool {
    pub fn new() -> AudioPool {
        AudioPool::default()
    }

    /// Reads a pool file. A missing file is an empty pool.
    pub fn load(path: &Utf8Path) -> Result<AudioPool> {
        let Some(records) = text_file::read_records(path)? else {
            return Ok(AudioPool::new());
        };

        let mut pool = AudioPool::new();
        let mut uids = HashSet::default();
        let mut paths = HashSet::default();

        for (line, record) in records {
            let entry = encoding::decode_entry(&record)
                .map_err(|e| Error::new_malformed(path, line, e))?;

            if !uids.insert(entry.uid) {
                return Err(Error::new_malformed(
                    path,
                    line,
                    format!("duplicate uid {}", entry.uid),
                ));
            }

            if !paths.insert(entry.path.clone()) {
                tracing::warn!(
                    uid = %entry.uid,
                    path = %entry.path,
                    "audio pool contains duplicate path"
                );
            }

            pool.entries.push(entry);
        }

        Ok(pool)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        text_file::write_records(path, self.entries.iter().map(encoding::encode_entry))
    }

    pub fn entries(&self) -> &[AudioPoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One past the largest uid in the pool, `0` for an empty pool.
    pub fn next_uid(&self) -> Result<Uid> {
        match self.entries.iter().map(|e| e.uid).max() {
            Some(uid) => uid.checked_next().ok_or(Error::UidExhausted),
            None => Ok(Uid::ZERO),
        }
    }

    /// Appends an entry, allocating a uid unless one is given.
    pub fn add_entry(&mut self, path: NormalizedPath, uid: Option<Uid>) -> Result<&AudioPoolEntry> {
        let uid = match uid {
            Some(uid) => uid,
            None => self.next_uid()?,
        };

        if self.get(uid).is_some() {
            return Err(Error::DuplicateUid { uid });
        }

        if self.find_path(&path).is_some() {
            return Err(Error::DuplicatePath {
                path: path.as_path().to_owned(),
            });
        }

        self.entries.push(AudioPoolEntry { uid, path });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn get(&self, uid: Uid) -> Option<&AudioPoolEntry> {
        self.entries.iter().find(|e| e.uid == uid)
    }

    pub fn get_or_err(&self, uid: Uid) -> Result<&AudioPoolEntry> {
        self.get(uid).ok_or(Error::UnknownUid { uid })
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.get(uid).is_some()
    }

    /// Uid of the last entry with the given path.
    pub fn find_path(&self, path: &NormalizedPath) -> Option<Uid> {
        self.entries
            .iter()
            .rev()
            .find(|e| &e.path == path)
            .map(|e| e.uid)
    }

    pub fn by_uid(&self) -> HashMap<Uid, &AudioPoolEntry> {
        self.entries.iter().map(|e| (e.uid, e)).collect()
    }

    pub fn by_path(&self) -> HashMap<&NormalizedPath, &AudioPoolEntry> {
        self.entries.iter().map(|e| (&e.path, e)).collect()
    }

    /// Points an existing entry at a different file.
    pub fn set_path(&mut self, uid: Uid, path: NormalizedPath) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.uid == uid)
            .ok_or(Error::UnknownUid { uid })?;
        entry.path = path;
        Ok(())
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut AudioPoolEntry> + '_ {
        self.entries.iter_mut()
    }
}
