use std::fs;
use std::io;
use std::sync::Arc;

use rpool_core::{NormalizedPath, Uid};
use tracing::instrument;

use super::SampleGraph;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::project::Project;

impl<G: Gateway> Project<G> {
    /// Returns the sample graph of a pool entry, asking the engine to
    /// regenerate it when it is missing, invalid or older than its file.
    #[instrument(skip_all, fields(%uid), err)]
    pub fn sample_graph(&mut self, uid: Uid) -> Result<Arc<SampleGraph>> {
        let path = self.pool.get_or_err(uid)?.path.clone();
        let source_file = self.locate_audio_file(&path)?;

        if let Some(graph) = self.sample_graphs.get(uid) {
            if !graph.is_stale(&source_file)? {
                return Ok(graph);
            }
        }

        let graph_file = self.layout.samplegraph_file(uid);

        match SampleGraph::load(&graph_file) {
            Ok(graph) => {
                if !graph.is_stale(&source_file)? {
                    let graph = Arc::new(graph);
                    self.sample_graphs.insert(uid, graph.clone());
                    return Ok(graph);
                }
                tracing::info!(%uid, "sample graph is older than its file, regenerating");
            }
            Err(error) => {
                tracing::info!(%uid, %error, "sample graph is missing or invalid, regenerating");
            }
        }

        self.delete_sample_graph(uid)?;
        self.gateway.add_to_audio_pool(&source_file, uid)?;

        let graph = Arc::new(SampleGraph::load(&graph_file)?);
        self.sample_graphs.insert(uid, graph.clone());
        Ok(graph)
    }

    /// Drops a sample graph from memory and disk.
    pub fn delete_sample_graph(&mut self, uid: Uid) -> Result<()> {
        self.sample_graphs.remove(uid);

        let graph_file = self.layout.samplegraph_file(uid);
        match fs::remove_file(&graph_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::new_filesystem(graph_file, e)),
        }
    }

    /// Hands an audio file to the engine, which loads it and writes its
    /// sample graph.
    pub(crate) fn create_sample_graph(&mut self, path: &NormalizedPath, uid: Uid) -> Result<()> {
        let file = self.locate_audio_file(path)?;
        self.gateway.add_to_audio_pool(&file, uid)
    }
}
