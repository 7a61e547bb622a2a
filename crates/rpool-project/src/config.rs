use std::path::PathBuf;

use rpool_core::path::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::{Error, Result};

/// External programs used to render time-stretched audio.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub rubberband: PathBuf,
    pub sbsms: PathBuf,
    pub paulstretch: PathBuf,
    pub soundstretch: PathBuf,
    /// Converts non-WAV input for the SoundTouch modes.
    pub ffmpeg: PathBuf,
}

impl Default for Tools {
    fn default() -> Tools {
        Tools {
            rubberband: PathBuf::from("rubberband"),
            sbsms: PathBuf::from("sbsms"),
            paulstretch: PathBuf::from("paulstretch"),
            soundstretch: PathBuf::from("soundstretch"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: Tools,
    pub default_project_dir: Option<PathBuf>,
}

impl Config {
    /// Loads the user config file if there is one, then applies environment
    /// overrides. A malformed file is logged and ignored.
    pub fn load() -> Config {
        let mut config = match user_config_path() {
            Some(path) if path.exists() => match Config::load_from(&path) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(%error, "ignoring malformed config");
                    Config::default()
                }
            },
            _ => Config::default(),
        };

        config.apply_env(|key| std::env::var_os(key));
        config
    }

    pub fn load_from(path: &Utf8Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_owned(),
            message: e.to_string(),
        })?;

        toml::from_str(&text).map_err(|e| Error::Config {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| Error::Config {
            path: Utf8PathBuf::from("<string>"),
            message: e.to_string(),
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<std::ffi::OsString>) {
        let tools = &mut self.tools;
        let overrides: [(&str, &mut PathBuf); 5] = [
            ("RPOOL_RUBBERBAND", &mut tools.rubberband),
            ("RPOOL_SBSMS", &mut tools.sbsms),
            ("RPOOL_PAULSTRETCH", &mut tools.paulstretch),
            ("RPOOL_SOUNDSTRETCH", &mut tools.soundstretch),
            ("RPOOL_FFMPEG", &mut tools.ffmpeg),
        ];

        for (key, slot) in overrides {
            if let Some(value) = var(key).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }
    }

    pub fn default_project_dir(&self) -> PathBuf {
        if let Some(dir) = &self.default_project_dir {
            return dir.clone();
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rpool")
            .join("projects")
    }
}

fn user_config_path() -> Option<Utf8PathBuf> {
    let path = dirs::config_dir()?.join("rpool").join("config.toml");
    Utf8PathBuf::from_path_buf(path).ok()
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{Config, Tools};
    use crate::Result;

    #[test]
    fn defaults() -> Result<()> {
        let config = Config::from_toml_str("")?;
        assert_eq!(config.tools, Tools::default());
        assert!(config.default_project_dir.is_none());
        Ok(())
    }

    #[test]
    fn partial_tools_table() -> Result<()> {
        let config = Config::from_toml_str(
            r#"
            default_project_dir = "/srv/projects"

            [tools]
            rubberband = "/opt/rb/bin/rubberband"
            "#,
        )?;

        assert_eq!(config.tools.rubberband, PathBuf::from("/opt/rb/bin/rubberband"));
        assert_eq!(config.tools.sbsms, PathBuf::from("sbsms"));
        assert_eq!(config.default_project_dir(), PathBuf::from("/srv/projects"));
        Ok(())
    }

    #[test]
    fn malformed() {
        assert!(Config::from_toml_str("[tools\n").is_err());
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "RPOOL_SOUNDSTRETCH" => Some(OsString::from("/usr/local/bin/soundstretch")),
            "RPOOL_FFMPEG" => Some(OsString::new()),
            _ => None,
        });

        assert_eq!(
            config.tools.soundstretch,
            PathBuf::from("/usr/local/bin/soundstretch")
        );
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
    }
}
