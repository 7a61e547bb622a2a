use std::fs;

use rpool_core::path::{Utf8Path, Utf8PathBuf};
use rpool_core::{NormalizedPath, Uid};

use crate::error::{Error, Result, ResultExt};

/// Fixed directory layout under a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_file: Utf8PathBuf,
    pub root: Utf8PathBuf,
    pub audio_root: Utf8PathBuf,
    pub audio: Utf8PathBuf,
    pub audio_rec: Utf8PathBuf,
    pub audio_tmp: Utf8PathBuf,
    pub samplegraph: Utf8PathBuf,
    pub samples: Utf8PathBuf,
    pub timestretch: Utf8PathBuf,
    pub glued: Utf8PathBuf,
    pub user: Utf8PathBuf,
    pub backups: Utf8PathBuf,
    pub projects: Utf8PathBuf,
    pub plugins: Utf8PathBuf,
    pub plugin_uid_file: Utf8PathBuf,
    pub audio_pool_file: Utf8PathBuf,
    pub stretch_file: Utf8PathBuf,
    pub stretch_map_file: Utf8PathBuf,
}

impl ProjectLayout {
    pub fn new(project_file: &Utf8Path) -> Result<ProjectLayout> {
        let project_file = if project_file.is_absolute() {
            project_file.to_owned()
        } else {
            let cwd = std::env::current_dir()?;
            let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| Error::new_non_utf8(&p))?;
            cwd.join(project_file)
        };

        let project_file = Utf8PathBuf::from(NormalizedPath::from(project_file).into_string());

        let root = match project_file.parent() {
            Some(v) if project_file.file_name().is_some() => v.to_owned(),
            _ => {
                return Err(Error::InvalidProject {
                    path: project_file,
                    message: "not a file path".into(),
                })
            }
        };

        let audio_root = root.join("audio");
        let audio = audio_root.join("files");
        let projects = root.join("projects");

        Ok(ProjectLayout {
            audio_rec: audio_root.join("rec"),
            audio_tmp: audio.join("tmp"),
            samplegraph: audio_root.join("samplegraph"),
            samples: audio_root.join("samples"),
            timestretch: audio_root.join("timestretch"),
            glued: audio_root.join("glued"),
            user: root.join("user"),
            backups: root.join("backups"),
            plugins: projects.join("plugins"),
            plugin_uid_file: projects.join("plugin_uid.txt"),
            audio_pool_file: audio_root.join("audio_pool"),
            stretch_file: audio_root.join("stretch.txt"),
            stretch_map_file: audio_root.join("stretch_map.txt"),
            projects,
            audio,
            audio_root,
            root,
            project_file,
        })
    }

    pub fn folders(&self) -> [&Utf8Path; 12] {
        [
            &self.audio_root,
            &self.audio,
            &self.audio_rec,
            &self.audio_tmp,
            &self.backups,
            &self.glued,
            &self.plugins,
            &self.projects,
            &self.samplegraph,
            &self.samples,
            &self.timestretch,
            &self.user,
        ]
    }

    pub fn create_folders(&self) -> Result<()> {
        for folder in self.folders() {
            if !folder.is_dir() {
                tracing::debug!(%folder, "creating project folder");
                fs::create_dir_all(folder).fs_context(folder)?;
            }
        }
        Ok(())
    }

    /// Where a rendered time-stretch with the given uid is stored.
    pub fn timestretch_file(&self, uid: Uid) -> NormalizedPath {
        NormalizedPath::from(self.timestretch.join(format!("{uid}.wav")))
    }

    pub fn samplegraph_file(&self, uid: Uid) -> Utf8PathBuf {
        self.samplegraph.join(uid.to_string())
    }

    /// Location of the project's copy of an audio file living elsewhere.
    ///
    /// `/x/y.wav` maps to `samples/x/y.wav`, `C:/x/y.wav` to
    /// `samples/C/x/y.wav`.
    pub fn cache_path(&self, path: &NormalizedPath) -> Utf8PathBuf {
        let s = path.as_str();
        let bytes = s.as_bytes();

        let relative = if bytes.len() >= 2 && bytes[0] != b'/' && bytes[1] == b':' {
            format!("{}{}", &s[..1], &s[2..])
        } else {
            s.to_owned()
        };

        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            self.samples.clone()
        } else {
            self.samples.join(relative)
        }
    }

    /// Shortens a path inside the project: files in the samples mirror lose
    /// the mirror prefix, anything else under `audio/` gets the `!` escape.
    pub fn to_short_audio_path(&self, path: &NormalizedPath) -> String {
        let samples = NormalizedPath::from(self.samples.as_path());
        let audio_root = NormalizedPath::from(self.audio_root.as_path());

        if let Some(rest) = strip_dir_prefix(path.as_str(), samples.as_str()) {
            return rest.to_owned();
        }

        if let Some(rest) = strip_dir_prefix(path.as_str(), audio_root.as_str()) {
            return format!("!{rest}");
        }

        path.as_str().to_owned()
    }

    /// Expands a leading `!` to the project's audio folder.
    pub fn to_long_audio_path(&self, path: &str) -> NormalizedPath {
        match path.strip_prefix('!') {
            Some(rest) => NormalizedPath::new(format!("{}/{}", self.audio_root, rest)),
            None => NormalizedPath::new(path),
        }
    }
}

fn strip_dir_prefix<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(dir)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use rpool_core::path::Utf8Path;
    use rpool_core::{NormalizedPath, Uid};
    use tempfile::TempDir;

    use super::ProjectLayout;
    use crate::Result;

    fn layout() -> ProjectLayout {
        ProjectLayout::new(Utf8Path::new("/p/song/song.project")).unwrap()
    }

    #[test]
    fn folders() {
        let layout = layout();
        assert_eq!(layout.root, "/p/song");
        assert_eq!(layout.samples, "/p/song/audio/samples");
        assert_eq!(layout.audio_tmp, "/p/song/audio/files/tmp");
        assert_eq!(layout.plugins, "/p/song/projects/plugins");
        assert_eq!(layout.audio_pool_file, "/p/song/audio/audio_pool");
        assert_eq!(
            layout.timestretch_file(Uid(7)).as_str(),
            "/p/song/audio/timestretch/7.wav"
        );
        assert_eq!(layout.samplegraph_file(Uid(7)), "/p/song/audio/samplegraph/7");
    }

    #[test]
    fn create_folders_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let file = Utf8Path::from_path(dir.path()).unwrap().join("x.project");
        let layout = ProjectLayout::new(&file)?;

        layout.create_folders()?;
        layout.create_folders()?;

        for folder in layout.folders() {
            assert!(folder.is_dir(), "{folder} missing");
        }
        Ok(())
    }

    #[test]
    fn cache_path() {
        let layout = layout();
        assert_eq!(
            layout.cache_path(&NormalizedPath::new("/home/me/kick.wav")),
            "/p/song/audio/samples/home/me/kick.wav"
        );
        assert_eq!(
            layout.cache_path(&NormalizedPath::new("c:\\Users\\me\\kick.wav")),
            "/p/song/audio/samples/C/Users/me/kick.wav"
        );
        assert_eq!(
            layout.cache_path(&NormalizedPath::new("loops/a.wav")),
            "/p/song/audio/samples/loops/a.wav"
        );
    }

    #[test]
    fn short_and_long_paths() {
        let layout = layout();

        let cached = NormalizedPath::new("/p/song/audio/samples/home/me/kick.wav");
        assert_eq!(layout.to_short_audio_path(&cached), "/home/me/kick.wav");

        let stretched = NormalizedPath::new("/p/song/audio/timestretch/3.wav");
        let short = layout.to_short_audio_path(&stretched);
        assert_eq!(short, "!/timestretch/3.wav");
        assert_eq!(layout.to_long_audio_path(&short), stretched);

        let outside = NormalizedPath::new("/p/song/audio_other/x.wav");
        assert_eq!(layout.to_short_audio_path(&outside), "/p/song/audio_other/x.wav");
        assert_eq!(layout.to_long_audio_path("/elsewhere/x.wav").as_str(), "/elsewhere/x.wav");
    }
}
