use rpool_core::path::Utf8Path;
use rpool_core::Uid;

use crate::error::{Error, Result};

/// The audio engine process, as seen from the project model.
///
/// Every call is synchronous. Failures are returned to the caller, never
/// swallowed.
pub trait Gateway {
    /// Renders `src` into `dst` with a pitch envelope going from `start` to
    /// `end` semitones.
    fn pitch_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()>;

    /// Renders `src` into `dst` with a playback rate envelope.
    fn rate_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()>;

    /// Loads an audio file into the engine's pool; the engine writes the
    /// sample graph for `uid` as a side effect.
    fn add_to_audio_pool(&mut self, path: &Utf8Path, uid: Uid) -> Result<()>;

    fn reload_audio_pool_item(&mut self, uid: Uid) -> Result<()>;
}

impl<G: Gateway + ?Sized> Gateway for &mut G {
    fn pitch_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()> {
        (**self).pitch_env(src, dst, start, end)
    }

    fn rate_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()> {
        (**self).rate_env(src, dst, start, end)
    }

    fn add_to_audio_pool(&mut self, path: &Utf8Path, uid: Uid) -> Result<()> {
        (**self).add_to_audio_pool(path, uid)
    }

    fn reload_audio_pool_item(&mut self, uid: Uid) -> Result<()> {
        (**self).reload_audio_pool_item(uid)
    }
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn pitch_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()> {
        (**self).pitch_env(src, dst, start, end)
    }

    fn rate_env(&mut self, src: &Utf8Path, dst: &Utf8Path, start: f64, end: f64) -> Result<()> {
        (**self).rate_env(src, dst, start, end)
    }

    fn add_to_audio_pool(&mut self, path: &Utf8Path, uid: Uid) -> Result<()> {
        (**self).add_to_audio_pool(path, uid)
    }

    fn reload_audio_pool_item(&mut self, uid: Uid) -> Result<()> {
        (**self).reload_audio_pool_item(uid)
    }
}

/// Gateway used when no engine is running.
///
/// Pool registrations are accepted: the engine reads the pool file when it
/// next opens the project. Envelope renders need the engine and fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

impl Gateway for OfflineGateway {
    fn pitch_env(
        &mut self,
        _src: &Utf8Path,
        _dst: &Utf8Path,
        _start: f64,
        _end: f64,
    ) -> Result<()> {
        Err(Error::new_gateway("pitch_env", "engine is not running"))
    }

    fn rate_env(&mut self, _src: &Utf8Path, _dst: &Utf8Path, _start: f64, _end: f64) -> Result<()> {
        Err(Error::new_gateway("rate_env", "engine is not running"))
    }

    fn add_to_audio_pool(&mut self, path: &Utf8Path, uid: Uid) -> Result<()> {
        tracing::debug!(%path, %uid, "engine offline, deferring pool load");
        Ok(())
    }

    fn reload_audio_pool_item(&mut self, uid: Uid) -> Result<()> {
        tracing::debug!(%uid, "engine offline, deferring reload");
        Ok(())
    }
}
