use std::ffi::OsString;
use std::process::Command;

use rpool_core::path::Utf8Path;

use crate::config::Tools;
use crate::error::{Error, Result};

/// A render done by an external command-line program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExternalRender {
    Rubberband {
        rate: f64,
        pitch: f64,
        crispness: u32,
        formants: bool,
    },
    Sbsms {
        rate_start: f64,
        rate_end: f64,
        pitch_start: f64,
        pitch_end: f64,
    },
    Paulstretch {
        stretch: f64,
    },
    SoundTouch {
        rate: f64,
        pitch: f64,
        speech: bool,
    },
}

impl ExternalRender {
    /// SoundTouch only reads WAV files.
    pub fn needs_wav_input(&self) -> bool {
        matches!(self, ExternalRender::SoundTouch { .. })
    }

    pub fn command(&self, tools: &Tools, src: &Utf8Path, dst: &Utf8Path) -> Command {
        match *self {
            ExternalRender::Rubberband {
                rate,
                pitch,
                crispness,
                formants,
            } => {
                let mut command = Command::new(&tools.rubberband);
                command
                    .arg("-c")
                    .arg(crispness.to_string())
                    .arg("-t")
                    .arg(rate.to_string())
                    .arg("-p")
                    .arg(pitch.to_string())
                    .arg("-R")
                    .arg("--pitch-hq");
                if formants {
                    command.arg("-F");
                }
                command.arg(src).arg(dst);
                command
            }
            ExternalRender::Sbsms {
                rate_start,
                rate_end,
                pitch_start,
                pitch_end,
            } => {
                let mut command = Command::new(&tools.sbsms);
                command
                    .arg(src)
                    .arg(dst)
                    .arg((1.0 / rate_start).to_string())
                    .arg((1.0 / rate_end).to_string())
                    .arg(pitch_start.to_string())
                    .arg(pitch_end.to_string());
                command
            }
            ExternalRender::Paulstretch { stretch } => {
                let mut command = Command::new(&tools.paulstretch);
                command.arg("-s").arg(stretch.to_string()).arg(src).arg(dst);
                command
            }
            ExternalRender::SoundTouch { rate, pitch, speech } => {
                let mut command = Command::new(&tools.soundstretch);
                command
                    .arg(src)
                    .arg(dst)
                    .arg(format!("-pitch={pitch}"))
                    .arg(format!("-rate={}", (1.0 / rate - 1.0) * 100.0));
                if speech {
                    command.arg("-speech");
                }
                command
            }
        }
    }
}

pub fn convert_to_wav(tools: &Tools, src: &Utf8Path, dst: &Utf8Path) -> Command {
    let mut command = Command::new(&tools.ffmpeg);
    command.arg("-y").arg("-i").arg(src).arg(dst);
    command
}

/// Runs a render command to completion. It succeeds only if the program
/// exits cleanly and `dst` exists afterwards.
pub fn run(mut command: Command, dst: &Utf8Path) -> Result<()> {
    let description = describe(&command);
    tracing::info!(command = %description, "running external render");

    let output = command.output().map_err(|source| Error::Spawn {
        command: description.clone(),
        source,
    })?;

    let status = if !output.status.success() {
        Some(format!("exited with {}", output.status))
    } else if !dst.is_file() {
        Some("produced no output file".to_owned())
    } else {
        None
    };

    match status {
        None => Ok(()),
        Some(status) => Err(Error::StretchFailed {
            command: description,
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
    }
}

pub fn describe(command: &Command) -> String {
    let mut parts: Vec<OsString> = vec![command.get_program().to_owned()];
    parts.extend(command.get_args().map(|a| a.to_owned()));
    parts
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
