use std::fmt;
use std::sync::Arc;

use rpool_core::collections::HashMap;
use rpool_core::Uid;

use super::SampleGraph;

#[derive(Default)]
pub struct SampleGraphCache {
    map: HashMap<Uid, Arc<SampleGraph>>,
}

impl SampleGraphCache {
    pub fn get(&self, uid: Uid) -> Option<Arc<SampleGraph>> {
        self.map.get(&uid).cloned()
    }

    pub fn insert(&mut self, uid: Uid, graph: Arc<SampleGraph>) {
        self.map.insert(uid, graph);
    }

    pub fn remove(&mut self, uid: Uid) -> Option<Arc<SampleGraph>> {
        self.map.remove(&uid)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for SampleGraphCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleGraphCache")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}
