use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rpool_core::path::Utf8PathBuf;
use rpool_core::Uid;
use rpool_project::{
    AudioItem, BackupOutcome, Config, OfflineGateway, Project, Result, StretchMode, StretchParams,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpool")]
#[command(about = "Inspect and maintain a project's audio pool", long_about = None)]
struct Cli {
    /// Project file
    project: Utf8PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    New,

    /// List the audio pool
    Pool,

    /// Register an audio file and print its uid
    Add { file: String },

    /// Render a time-stretched copy of a pool entry and print its uid
    Stretch {
        uid: Uid,

        /// 1-2 engine envelopes, 3-4 rubberband, 5 sbsms, 6 paulstretch,
        /// 7-8 soundstretch
        #[arg(short, long, default_value = "3", value_parser = parse_mode)]
        mode: StretchMode,

        #[arg(short, long, default_value = "1.0")]
        rate: f64,

        /// Semitones
        #[arg(short, long, default_value = "0.0")]
        pitch: f64,

        /// Defaults to --rate
        #[arg(long)]
        rate_end: Option<f64>,

        /// Defaults to --pitch
        #[arg(long)]
        pitch_end: Option<f64>,

        #[arg(short, long, default_value = "5")]
        crispness: u32,
    },

    /// Print the uid of the file a pool entry was rendered from
    Original { uid: Uid },

    /// Reload an audio file that changed on disk
    Reload { file: String },

    /// Print a summary of a pool entry's sample graph
    Graph { uid: Uid },

    /// Archive the project's `projects` folder
    Backup {
        #[arg(short, long)]
        name: Option<String>,
    },
}

fn parse_mode(s: &str) -> Result<StretchMode, String> {
    s.parse::<u8>()
        .ok()
        .and_then(StretchMode::from_u8)
        .ok_or_else(|| format!("`{s}` is not a mode between 1 and 8"))
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(?error, "{error}");
            ExitCode::FAILURE
        }
    }
}

/// Relative paths that do not exist here are looked up in the default
/// project folder.
fn resolve_project_file(config: &Config, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() || path.exists() {
        return path;
    }

    match Utf8PathBuf::from_path_buf(config.default_project_dir()) {
        Ok(dir) => dir.join(path),
        Err(_) => path,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let project_file = resolve_project_file(&config, cli.project);

    if let Commands::New = cli.command {
        Project::create(&project_file, config, OfflineGateway)?;
        return Ok(());
    }

    let mut project = Project::open(&project_file, config, OfflineGateway)?;

    match cli.command {
        Commands::New => {}
        Commands::Pool => {
            for entry in project.pool().entries() {
                let short = project.layout().to_short_audio_path(&entry.path);
                println!("{}\t{}", entry.uid, short);
            }
        }
        Commands::Add { file } => {
            println!("{}", project.get_or_create_uid(file)?);
        }
        Commands::Stretch {
            uid,
            mode,
            rate,
            pitch,
            rate_end,
            pitch_end,
            crispness,
        } => {
            let mut item = AudioItem {
                uid,
                stretch: StretchParams {
                    mode,
                    rate,
                    pitch,
                    rate_end: rate_end.unwrap_or(rate),
                    pitch_end: pitch_end.unwrap_or(pitch),
                    crispness,
                },
            };

            let outcome = project.request(&mut item)?;
            tracing::info!(?outcome, "stretch finished");
            println!("{}", item.uid);
        }
        Commands::Original { uid } => {
            println!("{}", project.original_uid(uid)?);
        }
        Commands::Reload { file } => {
            project.reload_audio_file(file)?;
        }
        Commands::Graph { uid } => {
            let graph = project.sample_graph(uid)?;
            println!("source\t{}", graph.source);
            println!("channels\t{}", graph.channels.len());
            println!("frames\t{}", graph.frame_count);
            println!("sample_rate\t{}", graph.sample_rate);
            println!("length\t{:.3}s", graph.length_secs);
        }
        Commands::Backup { name } => match project.create_backup(name.as_deref())? {
            BackupOutcome::Created(path) => println!("{path}"),
            BackupOutcome::AlreadyExists(path) => {
                tracing::warn!(%path, "backup not created");
            }
        },
    }

    Ok(())
}
