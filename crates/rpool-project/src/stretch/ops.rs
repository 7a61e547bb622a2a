use std::fs;
use std::io;

use rpool_core::path::{Utf8Path, Utf8PathBuf};
use rpool_core::{NormalizedPath, Uid};
use tracing::instrument;

use super::command::{self, ExternalRender};
use super::{AudioItem, Envelope, Render, StretchKey, StretchOutcome};
use crate::error::{Error, Result, ResultExt};
use crate::gateway::Gateway;
use crate::project::Project;

impl<G: Gateway> Project<G> {
    /// Points `item` at a file rendered with its stretch parameters,
    /// reusing an earlier render when one matches.
    ///
    /// The parameters on `item` are rounded in place. On success the item's
    /// uid refers to the rendered file. No-op parameters leave the item alone,
    /// or point it back at the original when it currently plays a render.
    #[instrument(skip_all, fields(uid = %item.uid, mode = item.stretch.mode.as_u8()), err)]
    pub fn request(&mut self, item: &mut AudioItem) -> Result<StretchOutcome> {
        item.stretch = item.stretch.rounded();
        let params = item.stretch;
        params.validate()?;

        let path = self.pool.get_or_err(item.uid)?.path.clone();
        let source = self.stretch.resolve_original(&path).clone();
        let derived = source != path;

        if params.is_identity() {
            if !derived {
                tracing::debug!("parameters are a no-op");
                return Ok(StretchOutcome::Unchanged);
            }

            let uid = self.get_or_create_uid(source)?;
            tracing::info!(%uid, derived = %path, "restored the original of a rendered file");
            item.uid = uid;
            return Ok(StretchOutcome::Restored(uid));
        }

        if derived {
            tracing::info!(
                derived = %path,
                original = %source,
                "stretching the original instead of a rendered file"
            );
        }

        let key = StretchKey::new(&params, source.clone());

        if let Some(uid) = self.stretch.get(&key) {
            if self.is_rendered(uid) {
                tracing::debug!(%uid, "time-stretch cache hit");
                item.uid = uid;
                return Ok(StretchOutcome::CacheHit(uid));
            }

            tracing::warn!(%uid, "discarding stale time-stretch cache entry");
            self.stretch.remove(&key);
            self.stretch.remove_derived(&self.layout.timestretch_file(uid));
            self.save_stretch_cache()?;
        }

        let source_file = self.locate_audio_file(&source)?;

        let uid = self.pool.next_uid()?.max(self.stretch.next_uid()?);
        let dest = self.layout.timestretch_file(uid);

        match fs::remove_file(dest.as_path()) {
            Ok(()) => tracing::debug!(%dest, "removed leftover render"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::new_filesystem(dest.as_path(), e)),
        }

        self.stretch.insert(key, uid, dest.clone());
        self.save_stretch_cache()?;

        self.render(params.render(), &source_file, dest.as_path())?;

        self.register_audio_file(&dest, Some(uid), false)?;
        item.uid = uid;

        tracing::info!(%uid, %dest, "rendered time-stretch");
        Ok(StretchOutcome::Rendered(uid))
    }

    /// The file `path` was rendered from, or `path` itself.
    pub fn resolve_original<'a>(&'a self, path: &'a NormalizedPath) -> &'a NormalizedPath {
        self.stretch.resolve_original(path)
    }

    /// Uid of the file a pool entry was rendered from, registering the
    /// original with the pool if needed. Entries that are not renders map to
    /// themselves.
    pub fn original_uid(&mut self, uid: Uid) -> Result<Uid> {
        let path = self.pool.get_or_err(uid)?.path.clone();
        let original = self.stretch.resolve_original(&path).clone();

        if original == path {
            tracing::debug!(%uid, "not a time-stretched file");
            return Ok(uid);
        }

        self.get_or_create_uid(original)
    }

    fn is_rendered(&self, uid: Uid) -> bool {
        match self.pool.get(uid) {
            Some(entry) => self.locate_audio_file(&entry.path).is_ok(),
            None => false,
        }
    }

    fn render(&mut self, render: Render, src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
        match render {
            Render::Envelope(envelope) => {
                match envelope {
                    Envelope::Pitch { start, end } => self.gateway.pitch_env(src, dst, start, end)?,
                    Envelope::Rate { start, end } => self.gateway.rate_env(src, dst, start, end)?,
                }

                if !dst.is_file() {
                    return Err(Error::StretchFailed {
                        command: format!("{envelope:?}"),
                        status: "produced no output file".into(),
                        stdout: String::new(),
                        stderr: String::new(),
                    });
                }

                Ok(())
            }
            Render::External(external) => self.render_external(external, src, dst),
        }
    }

    fn render_external(
        &self,
        render: ExternalRender,
        src: &Utf8Path,
        dst: &Utf8Path,
    ) -> Result<()> {
        let tools = &self.config.tools;

        let is_wav = src
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
            .unwrap_or(false);

        if render.needs_wav_input() && !is_wav {
            let temp = tempfile::Builder::new()
                .prefix(".rpool-convert-")
                .suffix(".wav")
                .tempfile_in(&self.layout.audio_tmp)
                .fs_context(&self.layout.audio_tmp)?
                .into_temp_path();

            let temp_path = Utf8PathBuf::from_path_buf(temp.to_path_buf())
                .map_err(|p| Error::new_non_utf8(&p))?;

            command::run(command::convert_to_wav(tools, src, &temp_path), &temp_path)?;
            command::run(render.command(tools, &temp_path, dst), dst)?;

            temp.close().fs_context(&temp_path)?;
            return Ok(());
        }

        command::run(render.command(tools, src, dst), dst)
    }

    pub(crate) fn save_stretch_cache(&self) -> Result<()> {
        self.stretch
            .save(&self.layout.stretch_file, &self.layout.stretch_map_file)
    }
}
