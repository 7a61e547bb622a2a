//! Repairs applied to a project every time it is opened.

use rpool_core::path::Utf8Path;
use rpool_core::{NormalizedPath, Uid};

use super::Project;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::pool::AudioPool;

type Quirk<G> = fn(&mut Project<G>) -> Result<()>;

impl<G: Gateway> Project<G> {
    /// Runs every repair. A failing repair is logged and does not stop the
    /// others or the open.
    pub(crate) fn run_quirks(&mut self) {
        let quirks: [(&str, Quirk<G>); 1] =
            [("corrupt pool separators", Project::fix_pool_separators)];

        for (name, quirk) in quirks {
            if let Err(error) = quirk(self) {
                tracing::error!(?error, quirk = name, "project repair failed");
            }
        }
    }

    fn fix_pool_separators(&mut self) -> Result<()> {
        let report = repair_corrupt_separators(&mut self.pool, &self.layout.samples);

        for (uid, path) in &report.unrepaired {
            tracing::warn!(%uid, %path, "could not repair corrupt audio pool path");
        }

        if report.repaired.is_empty() {
            return Ok(());
        }

        for repair in &report.repaired {
            tracing::info!(
                uid = %repair.uid,
                from = %repair.from,
                to = %repair.to,
                "repaired audio pool path"
            );
        }

        self.save_pool()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub uid: Uid,
    pub from: NormalizedPath,
    pub to: NormalizedPath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub repaired: Vec<Repair>,
    pub unrepaired: Vec<(Uid, NormalizedPath)>,
}

/// Rewrites pool paths that were saved as `/:rest` by an old path bug.
///
/// An entry is left alone when its mirror copy `samples/:rest` exists. It is
/// rewritten to `/rest` when `samples/rest` exists, and reported as
/// unrepaired otherwise.
pub fn repair_corrupt_separators(pool: &mut AudioPool, samples: &Utf8Path) -> RepairReport {
    let mut report = RepairReport::default();

    for entry in pool.entries_mut() {
        let Some(rest) = entry.path.as_str().strip_prefix("/:") else {
            continue;
        };

        if samples.join(&entry.path.as_str()[1..]).exists() {
            continue;
        }

        if !rest.is_empty() && samples.join(rest).exists() {
            let to = NormalizedPath::new(format!("/{rest}"));
            report.repaired.push(Repair {
                uid: entry.uid,
                from: entry.path.clone(),
                to: to.clone(),
            });
            entry.path = to;
        } else {
            report.unrepaired.push((entry.uid, entry.path.clone()));
        }
    }

    report
}
