mod config;
mod error;
mod gateway;
mod layout;
pub mod pool;
mod project;
pub mod sample_graph;
pub mod stretch;
mod text_file;


pub use self::config::{Config, Tools};
pub use self::error::{Error, Result};
pub use self::gateway::{Gateway, OfflineGateway};
pub use self::layout::ProjectLayout;
pub use self::pool::{AudioPool, AudioPoolEntry};
pub use self::project::{repair_corrupt_separators, BackupOutcome, Project, Repair, RepairReport};
pub use self::sample_graph::SampleGraph;
pub use self::stretch::{AudioItem, StretchMode, StretchOutcome, StretchParams};
pub use self::text_file::SENTINEL;
