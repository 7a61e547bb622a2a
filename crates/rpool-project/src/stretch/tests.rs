use std::fs;

use rpool_core::path::Utf8Path;
use rpool_core::{NormalizedPath, Uid};
use tempfile::TempDir;

use super::command::describe;
use super::{
    AudioItem, ExternalRender, Render, StretchCache, StretchKey, StretchMode, StretchOutcome,
    StretchParams,
};
use crate::tests::{fake_tool, tool_log, utf8, Call, TestProject, ToolArgs};
use crate::{Config, Error, Result, Tools};

fn params(mode: StretchMode, rate: f64, pitch: f64) -> StretchParams {
    StretchParams {
        mode,
        rate,
        pitch,
        rate_end: rate,
        pitch_end: pitch,
        crispness: 5,
    }
}

#[test]
fn identity() {
    assert!(StretchParams::default().is_identity());
    assert!(params(StretchMode::PitchEnvelope, 1.5, 3.0).is_identity());
    assert!(params(StretchMode::RateEnvelope, 1.5, 3.0).is_identity());
    assert!(!params(StretchMode::Rubberband, 1.5, 0.0).is_identity());
    assert!(!params(StretchMode::Sbsms, 1.0, 2.0).is_identity());

    let mut envelope = params(StretchMode::RateEnvelope, 1.0, 0.0);
    envelope.rate_end = 2.0;
    assert!(!envelope.is_identity());
}

#[test]
fn rounding_merges_keys() {
    let a = params(StretchMode::Rubberband, 2.0000001, -0.0);
    let b = params(StretchMode::Rubberband, 2.0, 0.0);
    let source = NormalizedPath::new("/a.wav");

    assert_eq!(a.rounded(), b);
    assert_eq!(
        StretchKey::new(&a, source.clone()),
        StretchKey::new(&b, source.clone())
    );
    assert_ne!(
        StretchKey::new(&b, source.clone()),
        StretchKey::new(&b, NormalizedPath::new("/b.wav"))
    );
}

#[test]
fn key_encoding() -> std::result::Result<(), String> {
    let key = StretchKey::new(
        &params(StretchMode::SoundTouchSpeech, 0.5, -2.25),
        NormalizedPath::new("/loops/a|b.wav"),
    );

    let line = key.encode(Uid(12));
    assert_eq!(line, "8|0.5|-2.25|0.5|-2.25|5|/loops/a|b.wav|||12");
    assert_eq!(StretchKey::decode(&line)?, (key, Uid(12)));

    assert!(StretchKey::decode("9|1.0|0.0|1.0|0.0|5|/a.wav|||1").is_err());
    assert!(StretchKey::decode("3|1.0|0.0|1.0|0.0|5|/a.wav").is_err());
    assert!(StretchKey::decode("3|1.0|0.0").is_err());
    Ok(())
}

#[test]
fn commands() {
    let tools = Tools::default();
    let src = Utf8Path::new("/a.wav");
    let dst = Utf8Path::new("/b.wav");

    let cases = [
        (
            params(StretchMode::Rubberband, 2.0, 0.0),
            "rubberband -c 5 -t 2 -p 0 -R --pitch-hq /a.wav /b.wav",
        ),
        (
            params(StretchMode::RubberbandFormants, 2.0, 1.5),
            "rubberband -c 5 -t 2 -p 1.5 -R --pitch-hq -F /a.wav /b.wav",
        ),
        (
            StretchParams {
                rate_end: 1.0,
                pitch_end: 2.0,
                ..params(StretchMode::Sbsms, 2.0, 0.0)
            },
            "sbsms /a.wav /b.wav 0.5 1 0 2",
        ),
        (
            params(StretchMode::Paulstretch, 4.0, 0.0),
            "paulstretch -s 4 /a.wav /b.wav",
        ),
        (
            params(StretchMode::SoundTouch, 2.0, -1.0),
            "soundstretch /a.wav /b.wav -pitch=-1 -rate=-50",
        ),
        (
            params(StretchMode::SoundTouchSpeech, 0.5, 0.0),
            "soundstretch /a.wav /b.wav -pitch=0 -rate=100 -speech",
        ),
    ];

    for (params, expected) in cases {
        let Render::External(render) = params.render() else {
            panic!("{params:?} is not an external render");
        };
        assert_eq!(describe(&render.command(&tools, src, dst)), expected);
    }

    assert!(matches!(
        params(StretchMode::PitchEnvelope, 1.0, 2.0).render(),
        Render::Envelope(_)
    ));
    assert!(ExternalRender::SoundTouch {
        rate: 1.0,
        pitch: 0.0,
        speech: false
    }
    .needs_wav_input());
}

#[test]
fn cache_collapses_chains() -> Result<()> {
    let dir = TempDir::new()?;
    let root = utf8(dir.path());
    let cache_file = root.join("stretch.txt");
    let map_file = root.join("stretch_map.txt");

    fs::write(&cache_file, "3|2.0|0.0|1.0|0.0|5|/a.wav|||1\n\\")?;
    fs::write(&map_file, "/t/1.wav|||/a.wav\n/t/2.wav|||/t/1.wav\n\\")?;

    let cache = StretchCache::load(&cache_file, &map_file)?;
    assert_eq!(cache.len(), 1);

    let derived = NormalizedPath::new("/t/2.wav");
    assert_eq!(cache.resolve_original(&derived).as_str(), "/a.wav");

    let unrelated = NormalizedPath::new("/b.wav");
    assert_eq!(cache.resolve_original(&unrelated), &unrelated);
    assert!(!cache.is_derived(&unrelated));

    cache.save(&cache_file, &map_file)?;
    assert_eq!(
        fs::read_to_string(&map_file)?,
        "/t/1.wav|||/a.wav\n/t/2.wav|||/a.wav\n\\"
    );
    Ok(())
}

#[test]
fn cache_insert_keeps_one_hop() {
    let mut cache = StretchCache::default();
    let a = NormalizedPath::new("/a.wav");
    let t1 = NormalizedPath::new("/t/1.wav");
    let t2 = NormalizedPath::new("/t/2.wav");

    let p = params(StretchMode::Rubberband, 2.0, 0.0);
    cache.insert(StretchKey::new(&p, a.clone()), Uid(1), t1.clone());
    cache.insert(StretchKey::new(&p, t1.clone()), Uid(2), t2.clone());

    assert_eq!(cache.resolve_original(&t2), &a);
    assert_eq!(cache.next_uid().ok(), Some(Uid(3)));

    let last = NormalizedPath::new("/t/last.wav");
    let p = params(StretchMode::Rubberband, 4.0, 0.0);
    cache.insert(StretchKey::new(&p, a.clone()), Uid(u32::MAX), last);
    assert!(matches!(cache.next_uid(), Err(Error::UidExhausted)));
}

#[test]
fn identity_request_keeps_item() -> Result<()> {
    let mut test = TestProject::new()?;
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem::new(uid);
    assert_eq!(test.project.request(&mut item)?, StretchOutcome::Unchanged);
    assert_eq!(item.uid, uid);
    assert_eq!(test.project.pool.len(), 1);
    assert!(test.project.stretch.is_empty());
    Ok(())
}

#[test]
fn invalid_requests() -> Result<()> {
    let mut test = TestProject::new()?;
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem::new(Uid(99));
    assert!(matches!(
        test.project.request(&mut item),
        Err(Error::UnknownUid { .. })
    ));

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::Rubberband, 0.0, 0.0),
    };
    assert!(matches!(
        test.project.request(&mut item),
        Err(Error::InvalidStretch { .. })
    ));
    assert_eq!(item.uid, uid);
    Ok(())
}

#[cfg(unix)]
fn project_with_tools(exit_code: i32) -> Result<(TestProject, TempDir)> {
    let tools_dir = TempDir::new()?;
    let bin = utf8(tools_dir.path());

    let mut config = Config::default();
    config.tools.rubberband =
        fake_tool(&bin, "rubberband", ToolArgs::Trailing, exit_code)?.into();
    config.tools.soundstretch =
        fake_tool(&bin, "soundstretch", ToolArgs::Leading, exit_code)?.into();
    config.tools.ffmpeg = fake_tool(&bin, "ffmpeg", ToolArgs::Trailing, 0)?.into();

    Ok((TestProject::with_config(config)?, tools_dir))
}

#[cfg(unix)]
#[test]
fn render_then_cache_hit() -> Result<()> {
    let (mut test, tools_dir) = project_with_tools(0)?;
    let bin = utf8(tools_dir.path());
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::Rubberband, 2.0, 0.0),
    };
    item.stretch.rate_end = 1.0;

    let outcome = test.project.request(&mut item)?;
    assert_eq!(outcome, StretchOutcome::Rendered(Uid(1)));
    assert_eq!(item.uid, Uid(1));

    let dest = test.project.layout.timestretch_file(Uid(1));
    assert!(dest.as_path().is_file());
    assert_eq!(test.project.audio_path(Uid(1))?, &dest);
    assert_eq!(test.project.resolve_original(&dest).as_path(), kick.as_path());
    assert_eq!(
        test.project.gateway.calls.last(),
        Some(&Call::AddToAudioPool {
            path: dest.as_path().to_owned(),
            uid: Uid(1)
        })
    );

    let stretch_file = fs::read_to_string(&test.project.layout.stretch_file)?;
    assert_eq!(stretch_file, format!("3|2.0|0.0|1.0|0.0|5|{kick}|||1\n\\"));

    let mut other = AudioItem {
        uid,
        stretch: item.stretch,
    };
    other.stretch.rate = 2.0000001;
    assert_eq!(
        test.project.request(&mut other)?,
        StretchOutcome::CacheHit(Uid(1))
    );
    assert_eq!(other.uid, Uid(1));
    assert_eq!(tool_log(&bin, "rubberband").len(), 1);

    let mut test = test.reopen()?;
    let mut reopened = AudioItem {
        uid,
        stretch: item.stretch,
    };
    assert_eq!(
        test.project.request(&mut reopened)?,
        StretchOutcome::CacheHit(Uid(1))
    );
    assert_eq!(tool_log(&bin, "rubberband").len(), 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn derived_items_stretch_the_original() -> Result<()> {
    let (mut test, tools_dir) = project_with_tools(0)?;
    let bin = utf8(tools_dir.path());
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::Rubberband, 2.0, 0.0),
    };
    test.project.request(&mut item)?;
    assert_eq!(item.uid, Uid(1));

    item.stretch = params(StretchMode::Rubberband, 3.0, 0.0);
    assert_eq!(
        test.project.request(&mut item)?,
        StretchOutcome::Rendered(Uid(2))
    );

    let second = test.project.layout.timestretch_file(Uid(2));
    assert_eq!(test.project.resolve_original(&second).as_path(), kick.as_path());
    assert_eq!(test.project.original_uid(Uid(2))?, uid);
    assert_eq!(test.project.original_uid(uid)?, uid);

    let log = tool_log(&bin, "rubberband");
    assert_eq!(log.len(), 2);
    assert!(log[1].contains(&format!("{kick} ")), "{}", log[1]);

    // the identity check runs against the item's own parameters
    item.stretch = StretchParams::default();
    assert_eq!(
        test.project.request(&mut item)?,
        StretchOutcome::Restored(uid)
    );
    assert_eq!(item.uid, uid);
    Ok(())
}

#[cfg(unix)]
#[test]
fn resetting_a_stretched_item_restores_the_original() -> Result<()> {
    let (mut test, tools_dir) = project_with_tools(0)?;
    let bin = utf8(tools_dir.path());
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::Rubberband, 2.0, 0.0),
    };
    test.project.request(&mut item)?;
    assert_eq!(item.uid, Uid(1));

    item.stretch = StretchParams::default();
    assert_eq!(
        test.project.request(&mut item)?,
        StretchOutcome::Restored(uid)
    );
    assert_eq!(item.uid, uid);

    let path = test.project.audio_path(item.uid)?.clone();
    assert_eq!(test.project.resolve_original(&path), &path);
    assert_eq!(path.as_path(), kick.as_path());

    // no-op envelopes restore the original too, without touching the engine
    let mut item = AudioItem {
        uid: Uid(1),
        stretch: params(StretchMode::PitchEnvelope, 1.0, 3.0),
    };
    let calls = test.project.gateway.calls.len();
    assert_eq!(
        test.project.request(&mut item)?,
        StretchOutcome::Restored(uid)
    );
    assert_eq!(item.uid, uid);
    assert_eq!(test.project.gateway.calls.len(), calls);

    assert_eq!(test.project.pool.len(), 2);
    assert_eq!(tool_log(&bin, "rubberband").len(), 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn failed_render_leaves_item_alone() -> Result<()> {
    let (mut test, tools_dir) = project_with_tools(3)?;
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::Rubberband, 2.0, 0.0),
    };

    match test.project.request(&mut item) {
        Err(Error::StretchFailed { stderr, .. }) => assert_eq!(stderr.trim(), "boom"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(item.uid, uid);
    assert_eq!(test.project.pool.len(), 1);
    assert_eq!(test.project.stretch.len(), 1);

    let bin = utf8(tools_dir.path());
    test.project.config.tools.rubberband =
        fake_tool(&bin, "rubberband-ok", ToolArgs::Trailing, 0)?.into();

    assert!(matches!(
        test.project.request(&mut item)?,
        StretchOutcome::Rendered(_)
    ));
    assert_ne!(item.uid, uid);
    assert_eq!(test.project.pool.len(), 2);
    assert_eq!(test.project.stretch.len(), 1);
    Ok(())
}

#[cfg(unix)]
#[test]
fn soundstretch_converts_other_formats() -> Result<()> {
    let (mut test, tools_dir) = project_with_tools(0)?;
    let bin = utf8(tools_dir.path());
    let clap = test.write_audio("clap.flac")?;
    let uid = test.project.get_or_create_uid(&clap)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::SoundTouch, 2.0, 0.0),
    };
    assert!(matches!(
        test.project.request(&mut item)?,
        StretchOutcome::Rendered(_)
    ));

    let ffmpeg = tool_log(&bin, "ffmpeg");
    assert_eq!(ffmpeg.len(), 1);
    assert!(ffmpeg[0].starts_with(&format!("-y -i {clap} ")));

    let soundstretch = tool_log(&bin, "soundstretch");
    assert_eq!(soundstretch.len(), 1);
    assert!(soundstretch[0].starts_with(test.project.layout.audio_tmp.as_str()));
    assert!(soundstretch[0].ends_with("-pitch=0 -rate=-50"));

    assert_eq!(fs::read_dir(&test.project.layout.audio_tmp)?.count(), 0);
    Ok(())
}

#[test]
fn envelope_modes_use_the_engine() -> Result<()> {
    let mut test = TestProject::new()?;
    let kick = test.write_audio("kick.wav")?;
    let uid = test.project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: StretchParams {
            pitch_end: 2.0,
            ..params(StretchMode::PitchEnvelope, 1.0, 0.0)
        },
    };

    assert_eq!(
        test.project.request(&mut item)?,
        StretchOutcome::Rendered(Uid(1))
    );

    let dest = test.project.layout.timestretch_file(Uid(1));
    assert!(test.project.gateway.calls.contains(&Call::PitchEnv {
        src: kick.clone(),
        dst: dest.as_path().to_owned(),
        start: 0.0,
        end: 2.0,
    }));
    assert_eq!(item.uid, Uid(1));
    Ok(())
}

#[test]
fn offline_envelope_render_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let file = utf8(dir.path()).join("song.project");
    let mut project = crate::Project::open(&file, Config::default(), crate::OfflineGateway)?;

    let kick = utf8(dir.path()).join("kick.wav");
    crate::tests::write_audio(&kick)?;
    let uid = project.get_or_create_uid(&kick)?;

    let mut item = AudioItem {
        uid,
        stretch: params(StretchMode::RateEnvelope, 1.0, 0.0),
    };
    item.stretch.rate_end = 0.5;

    assert!(matches!(
        project.request(&mut item),
        Err(Error::Gateway { .. })
    ));
    assert_eq!(item.uid, uid);
    Ok(())
}
