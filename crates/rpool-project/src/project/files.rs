use std::fs;
use std::io;

use rpool_core::path::Utf8PathBuf;
use tracing::instrument;

use super::Project;
use crate::error::{Error, Result, ResultExt};
use crate::text_file;

pub const PLUGIN_UID_LIMIT: u32 = 100_000;

impl<G> Project<G> {
    /// Allocates the next plugin uid from `projects/plugin_uid.txt`.
    #[instrument(skip_all, err)]
    pub fn next_plugin_uid(&self) -> Result<u32> {
        let path = &self.layout.plugin_uid_file;

        let uid = match fs::read_to_string(path) {
            Ok(text) => {
                let last: u32 = text
                    .trim()
                    .parse()
                    .map_err(|e| Error::new_malformed(path, 1, e))?;
                last + 1
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(Error::new_filesystem(path, e)),
        };

        if uid >= PLUGIN_UID_LIMIT {
            return Err(Error::PluginUidExhausted);
        }

        text_file::write_atomic(path, uid.to_string().as_bytes())?;
        Ok(uid)
    }

    /// Copies the state file of plugin `old` to plugin `new`. Returns
    /// `false` if `old` has no state file.
    pub fn copy_plugin(&self, old: u32, new: u32) -> Result<bool> {
        let src = self.layout.plugins.join(old.to_string());
        let dst = self.layout.plugins.join(new.to_string());

        let data = match fs::read(&src) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(%old, "plugin has no state file, nothing to copy");
                return Ok(false);
            }
            Err(e) => return Err(Error::new_filesystem(src, e)),
        };

        text_file::write_atomic(&dst, &data)?;
        Ok(true)
    }

    /// Returns an unused path for a glued audio file.
    pub fn next_glued_file_name(&mut self) -> Utf8PathBuf {
        loop {
            self.glued_index += 1;
            let path = self.layout.glued.join(format!("glued-{}.wav", self.glued_index));
            if !path.exists() {
                return path;
            }
        }
    }

    /// Deletes everything in the temporary audio folder.
    pub fn clear_audio_tmp_folder(&self) -> Result<()> {
        let dir = &self.layout.audio_tmp;

        let entries = match fs::read_dir(dir) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::new_filesystem(dir, e)),
        };

        for entry in entries {
            let path = entry.fs_context(dir)?.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            if let Err(e) = result {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove temporary file"
                );
            }
        }

        Ok(())
    }
}
