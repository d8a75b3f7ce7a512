//! ---
//! sl_section: "05-daemon"
//! sl_subsection: "binary"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Background message replay for the daemon."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use simlink_msg::{replay_until_cancelled, TopicBus};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Replay running on the blocking pool while the simulation steps.
pub struct Injector {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<simlink_msg::Result<usize>>,
}

impl Injector {
    pub fn start(bus: TopicBus, path: PathBuf) -> Self {
        info!(path = %path.display(), "replaying messages");
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle =
            tokio::task::spawn_blocking(move || replay_until_cancelled(&bus, path, &flag));
        Self { cancel, handle }
    }

    /// Stop the replay if it is still running and return how many records it published.
    pub async fn finish(self) -> Result<usize> {
        let interrupted = !self.handle.is_finished();
        self.cancel.store(true, Ordering::Release);
        let count = self.handle.await.context("replay task panicked")??;
        if interrupted {
            warn!(count, "replay cancelled at shutdown; remaining records skipped");
        } else {
            info!(count, "replay complete");
        }
        Ok(count)
    }
}
