use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier of an audio file within one project's pool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Uid(pub u32);

impl Uid {
    pub const ZERO: Uid = Uid(0);

    /// The following uid, `None` once the counter is exhausted.
    pub fn checked_next(self) -> Option<Uid> {
        self.0.checked_add(1).map(Uid)
    }
}

impl From<u32> for Uid {
    fn from(v: u32) -> Uid {
        Uid(v)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Uid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Uid, Self::Err> {
        s.trim().parse().map(Uid)
    }
}
