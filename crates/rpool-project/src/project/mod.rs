mod backup;
mod files;
mod quirks;

use std::fs;

use rpool_core::collections::HashSet;
use rpool_core::path::Utf8Path;
use rpool_core::NormalizedPath;
use tracing::instrument;

pub use self::backup::BackupOutcome;
pub use self::quirks::{repair_corrupt_separators, Repair, RepairReport};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::gateway::Gateway;
use crate::layout::ProjectLayout;
use crate::pool::AudioPool;
use crate::sample_graph::SampleGraphCache;
use crate::stretch::StretchCache;
use crate::text_file;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    V1 = 1,
}

impl Version {
    const LATEST: Version = Version::V1;

    fn from_u32(v: u32) -> Result<Version> {
        match v {
            1 => Ok(Version::V1),
            found => Err(Error::UnsupportedVersion { found }),
        }
    }

    fn as_u32(self) -> u32 {
        self as u32
    }
}

/// An open project: its audio pool, time-stretch cache and sample graphs,
/// plus the engine gateway they talk to.
///
/// Every mutation of the pool or the stretch cache is written to disk
/// before the call that made it returns.
#[derive(Debug)]
pub struct Project<G> {
    pub(crate) layout: ProjectLayout,
    pub(crate) config: Config,
    pub(crate) gateway: G,
    pub(crate) pool: AudioPool,
    pub(crate) stretch: StretchCache,
    pub(crate) sample_graphs: SampleGraphCache,
    pub(crate) cached_audio_files: HashSet<NormalizedPath>,
    pub(crate) glued_index: u32,
}

impl<G: Gateway> Project<G> {
    /// Opens the project whose project file is `project_file`, creating a
    /// new project if the file does not exist.
    #[instrument(skip_all, fields(%project_file), err)]
    pub fn open(project_file: &Utf8Path, config: Config, gateway: G) -> Result<Project<G>> {
        let layout = ProjectLayout::new(project_file)?;

        if !layout.project_file.exists() {
            tracing::info!("project file does not exist, creating a new project");
            return Project::create_at(layout, config, gateway);
        }

        let version = read_version(&layout.project_file)?;
        tracing::debug!(version = version.as_u32(), "opening project");

        layout.create_folders()?;

        let pool = AudioPool::load(&layout.audio_pool_file)?;
        let stretch = StretchCache::load(&layout.stretch_file, &layout.stretch_map_file)?;

        let mut project = Project::new(layout, config, gateway, pool, stretch);
        project.run_quirks();

        tracing::info!(entries = project.pool.len(), "opened project");
        Ok(project)
    }

    /// Creates a new empty project. Fails if the project file exists.
    #[instrument(skip_all, fields(%project_file), err)]
    pub fn create(project_file: &Utf8Path, config: Config, gateway: G) -> Result<Project<G>> {
        let layout = ProjectLayout::new(project_file)?;

        if layout.project_file.exists() {
            return Err(Error::InvalidProject {
                path: layout.project_file,
                message: "project already exists".into(),
            });
        }

        Project::create_at(layout, config, gateway)
    }

    fn create_at(layout: ProjectLayout, config: Config, gateway: G) -> Result<Project<G>> {
        layout.create_folders()?;

        let pool = AudioPool::new();
        let stretch = StretchCache::default();

        pool.save(&layout.audio_pool_file)?;
        stretch.save(&layout.stretch_file, &layout.stretch_map_file)?;
        text_file::write_atomic(
            &layout.project_file,
            format!("{}\n", Version::LATEST.as_u32()).as_bytes(),
        )?;

        tracing::info!(root = %layout.root, "created project");

        Ok(Project::new(layout, config, gateway, pool, stretch))
    }

    fn new(
        layout: ProjectLayout,
        config: Config,
        gateway: G,
        pool: AudioPool,
        stretch: StretchCache,
    ) -> Project<G> {
        Project {
            layout,
            config,
            gateway,
            pool,
            stretch,
            sample_graphs: SampleGraphCache::default(),
            cached_audio_files: HashSet::default(),
            glued_index: 0,
        }
    }
}

impl<G> Project<G> {
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &AudioPool {
        &self.pool
    }

    pub fn stretch_cache(&self) -> &StretchCache {
        &self.stretch
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }
}

fn read_version(project_file: &Utf8Path) -> Result<Version> {
    let text = fs::read_to_string(project_file).fs_context(project_file)?;
    let line = text.lines().next().unwrap_or("").trim();

    let version = line.parse::<u32>().map_err(|_| Error::InvalidProject {
        path: project_file.to_owned(),
        message: format!("invalid version `{line}`"),
    })?;

    Version::from_u32(version)
}
