use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::enhance::EnhancementQueue;
use crate::insight::InsightEngine;
use crate::seed;
use crate::store::RecordStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<RecordStore>,
    pub enhancements: EnhancementQueue,
}

impl AppState {
    pub fn new(engine: Arc<dyn InsightEngine>, enhancement_wait: Duration) -> Self {
        Self {
            workspace: None,
            store: None,
            enhancements: EnhancementQueue::new(engine, enhancement_wait),
        }
    }

    /// Opens (and seeds if new) the workspace at `path`. Returns whether
    /// seeding ran.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<bool> {
        let store = RecordStore::open(path)?;
        let seeded = seed::initialize(&store)?;
        // Outstanding enhancements belong to the store being replaced.
        if let Some(old) = self.store.as_ref() {
            self.enhancements.flush(old);
        }
        // Nothing in this process owns rows left pending by an earlier run.
        self.enhancements.settle_orphans(&store);
        tracing::info!(workspace = %path.to_string_lossy(), seeded, "workspace opened");
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        Ok(seeded)
    }

    pub fn shutdown(&mut self) {
        if let Some(store) = self.store.as_ref() {
            let applied = self.enhancements.flush(store);
            if applied > 0 {
                tracing::info!(applied, "applied outstanding feedback enhancements");
            }
        }
    }
}
