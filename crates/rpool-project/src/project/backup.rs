use std::fs::{self, File, OpenOptions};
use std::io;

use chrono::{Local, NaiveDateTime};
use rpool_core::path::{Utf8Path, Utf8PathBuf};
use tracing::instrument;

use super::Project;
use crate::error::{Error, Result, ResultExt};

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(Utf8PathBuf),
    /// A backup with the same name exists; nothing was written.
    AlreadyExists(Utf8PathBuf),
}

impl<G> Project<G> {
    /// Archives the `projects` folder into `backups/`, named after the
    /// current local time and the optional `name`.
    pub fn create_backup(&self, name: Option<&str>) -> Result<BackupOutcome> {
        self.create_backup_at(name, Local::now().naive_local())
    }

    #[instrument(skip_all, fields(name = name.unwrap_or_default()), err)]
    pub fn create_backup_at(
        &self,
        name: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<BackupOutcome> {
        let path = self.layout.backups.join(backup_file_name(name, time));

        fs::create_dir_all(&self.layout.backups).fs_context(&self.layout.backups)?;

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::error!(%path, "backup already exists");
                return Ok(BackupOutcome::AlreadyExists(path));
            }
            Err(e) => return Err(Error::new_filesystem(path, e)),
        };

        if let Err(error) = write_archive(file, &self.layout.projects) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(%path, error = %e, "failed to remove partial backup");
            }
            return Err(error);
        }

        tracing::info!(%path, "created backup");
        Ok(BackupOutcome::Created(path))
    }
}

pub(crate) fn backup_file_name(name: Option<&str>, time: NaiveDateTime) -> String {
    let mut file_name = time.format("%Y-%m-%d_%H-%M-%S").to_string();

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        file_name.push('-');
        file_name.extend(name.chars().map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        }));
    }

    file_name.push_str(".tar.zst");
    file_name
}

fn write_archive(file: File, projects: &Utf8Path) -> Result<()> {
    let encoder = zstd::Encoder::new(file, ZSTD_LEVEL)?;

    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all("projects", projects)
        .fs_context(projects)?;

    let encoder = builder.into_inner()?;
    let file = encoder.finish()?;
    file.sync_all()?;

    Ok(())
}
