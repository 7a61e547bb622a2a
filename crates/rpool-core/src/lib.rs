pub mod collections;
mod id;
pub mod path;

pub use self::id::Uid;
pub use self::path::{normalize, NormalizedPath};
