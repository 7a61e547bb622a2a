use std::fs;

use rpool_core::path::Utf8PathBuf;
use rpool_core::{NormalizedPath, Uid};
use tracing::instrument;

use crate::error::{Error, Result, ResultExt};
use crate::gateway::Gateway;
use crate::project::Project;

impl<G: Gateway> Project<G> {
    /// Returns the uid of an audio file, registering it with the pool and
    /// the engine if it is not there yet.
    ///
    /// Files outside the project are copied into the samples mirror first.
    #[instrument(skip_all, fields(path = path.as_ref()), err)]
    pub fn get_or_create_uid(&mut self, path: impl AsRef<str>) -> Result<Uid> {
        let path = NormalizedPath::new(path);
        self.register_audio_file(&path, None, true)
    }

    pub(crate) fn register_audio_file(
        &mut self,
        path: &NormalizedPath,
        uid: Option<Uid>,
        copy_to_cache: bool,
    ) -> Result<Uid> {
        if copy_to_cache {
            self.cache_audio_file(path)?;
        }

        if let Some(uid) = self.pool.find_path(path) {
            return Ok(uid);
        }

        let uid = match uid {
            Some(uid) if self.pool.contains(uid) => return Err(Error::DuplicateUid { uid }),
            Some(uid) => uid,
            None => self.pool.next_uid()?,
        };

        self.create_sample_graph(path, uid)?;
        self.pool.add_entry(path.clone(), Some(uid))?;
        self.save_pool()?;

        tracing::info!(%uid, %path, "added audio file to pool");

        Ok(uid)
    }

    /// Path of a pool entry, as stored in the pool.
    pub fn audio_path(&self, uid: Uid) -> Result<&NormalizedPath> {
        Ok(&self.pool.get_or_err(uid)?.path)
    }

    /// Finds the file backing a pool path: the path itself, or its copy in
    /// the samples mirror.
    pub fn locate_audio_file(&self, path: &NormalizedPath) -> Result<Utf8PathBuf> {
        let long = self.layout.to_long_audio_path(path.as_str());
        if long.as_path().is_file() {
            return Ok(long.as_path().to_owned());
        }

        let candidate = self.layout.cache_path(&long);
        if candidate.is_file() {
            return Ok(candidate);
        }

        Err(Error::SourceFileNotFound {
            path: long.as_path().to_owned(),
            samples_candidate: candidate,
        })
    }

    /// Copies a file living outside the project into the samples mirror.
    ///
    /// Files already under `audio/` and files already mirrored are left
    /// alone. Each path is checked at most once per session.
    pub(crate) fn cache_audio_file(&mut self, path: &NormalizedPath) -> Result<()> {
        let audio_root = NormalizedPath::from(self.layout.audio_root.as_path());
        if self.cached_audio_files.contains(path) || path.starts_with(&audio_root) {
            return Ok(());
        }

        let cache_path = self.layout.cache_path(path);
        if !cache_path.is_file() {
            if !path.as_path().is_file() {
                return Err(Error::SourceFileNotFound {
                    path: path.as_path().to_owned(),
                    samples_candidate: cache_path,
                });
            }

            if let Some(parent) = cache_path.parent() {
                fs::create_dir_all(parent).fs_context(parent)?;
            }

            fs::copy(path.as_path(), &cache_path).fs_context(&cache_path)?;
            tracing::debug!(%path, %cache_path, "copied audio file into project");
        }

        self.cached_audio_files.insert(path.clone());
        Ok(())
    }

    /// Refreshes an audio file that changed on disk: updates the project's
    /// copy, drops its sample graph and asks the engine to reload it.
    #[instrument(skip_all, fields(path = path.as_ref()), err)]
    pub fn reload_audio_file(&mut self, path: impl AsRef<str>) -> Result<()> {
        let path = NormalizedPath::new(path);

        let Some(uid) = self.pool.find_path(&path) else {
            tracing::info!(%path, "not in the audio pool, nothing to reload");
            return Ok(());
        };

        let audio_root = NormalizedPath::from(self.layout.audio_root.as_path());
        let cache_path = self.layout.cache_path(&path);

        if !path.starts_with(&audio_root) && cache_path.is_file() && path.as_path().is_file() {
            fs::copy(path.as_path(), &cache_path).fs_context(&cache_path)?;
            tracing::debug!(%path, %cache_path, "refreshed project copy");
        }

        self.delete_sample_graph(uid)?;
        self.gateway.reload_audio_pool_item(uid)?;

        Ok(())
    }

    pub(crate) fn save_pool(&self) -> Result<()> {
        self.pool.save(&self.layout.audio_pool_file)
    }
}
