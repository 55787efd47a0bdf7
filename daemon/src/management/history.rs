use crate::storage::file::{Config, FileIoWithBackup};
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use warden_protocol::management::console::ConsoleEntry;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_FLUSH_EVERY: usize = 10;

/// Bounded console scrollback, oldest entries evicted first.
#[derive(Debug)]
pub struct ConsoleHistory {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
    flush_every: usize,
    since_flush: usize,
    /// appends ever made; stamps snapshots so the persister can order them
    version: u64,
}

impl ConsoleHistory {
    pub fn with_entries(entries: Vec<ConsoleEntry>, capacity: usize, flush_every: usize) -> Self {
        let capacity = capacity.max(1);
        let skip = entries.len().saturating_sub(capacity);
        Self {
            entries: entries.into_iter().skip(skip).collect(),
            capacity,
            flush_every: flush_every.max(1),
            since_flush: 0,
            version: 0,
        }
    }

    /// Appends an entry; returns true when enough appends accumulated for a flush.
    pub fn append(&mut self, entry: ConsoleEntry) -> bool {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.version += 1;

        self.since_flush += 1;
        if self.since_flush >= self.flush_every {
            self.since_flush = 0;
            true
        } else {
            false
        }
    }

    /// The `n` most recent entries, oldest first.
    pub fn snapshot(&self, n: usize) -> Vec<ConsoleEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn all(&self) -> Vec<ConsoleEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Every entry, stamped with the current version.
    pub fn versioned(&self) -> (u64, Vec<ConsoleEntry>) {
        (self.version, self.all())
    }
}

pub struct HistoryFile;
impl FileIoWithBackup for HistoryFile {}
impl Config for HistoryFile {
    type ConfigType = Vec<ConsoleEntry>;
}

/// Reads persisted scrollback; anything unreadable counts as empty.
pub fn load_history(path: &Path) -> Vec<ConsoleEntry> {
    if !path.is_file() {
        return vec![];
    }
    match HistoryFile::load_config(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("ignoring unreadable console history {}: {}", path.display(), err);
            vec![]
        }
    }
}

/// Writes history snapshots in the background. Snapshots carry the history
/// version they were taken at and an older one never replaces a newer one.
pub struct HistoryPersister {
    path: Option<PathBuf>,
    tx: watch::Sender<(u64, Arc<Vec<ConsoleEntry>>)>,
    /// generation of the snapshot currently on disk
    written: Arc<Mutex<u64>>,
}

impl HistoryPersister {
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = watch::channel((0, Arc::new(vec![])));
        let written = Arc::new(Mutex::new(0));

        tokio::spawn({
            let path = path.clone();
            let written = written.clone();
            async move {
                while rx.changed().await.is_ok() {
                    let (generation, snapshot) = rx.borrow_and_update().clone();
                    Self::write(&path, &written, generation, snapshot).await;
                }
            }
        });

        Self {
            path: Some(path),
            tx,
            written,
        }
    }

    /// A persister that keeps nothing on disk.
    #[cfg(test)]
    pub fn disabled() -> Self {
        let (tx, _) = watch::channel((0, Arc::new(vec![])));
        Self {
            path: None,
            tx,
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Queues a snapshot for the background writer unless a newer one is queued.
    pub fn submit(&self, version: u64, snapshot: Vec<ConsoleEntry>) {
        self.tx.send_if_modified(|queued| {
            if version > queued.0 {
                *queued = (version, Arc::new(snapshot));
                true
            } else {
                false
            }
        });
    }

    /// Writes the snapshot now and waits for it to land.
    pub async fn flush(&self, version: u64, snapshot: Vec<ConsoleEntry>) {
        let Some(path) = &self.path else {
            return;
        };
        Self::write(path, &self.written, version, Arc::new(snapshot)).await;
    }

    async fn write(
        path: &Path,
        written: &Mutex<u64>,
        generation: u64,
        snapshot: Arc<Vec<ConsoleEntry>>,
    ) {
        let mut written = written.lock().await;
        if *written >= generation {
            return;
        }

        let target = path.to_path_buf();
        let len = snapshot.len();
        match tokio::task::spawn_blocking(move || HistoryFile::save_config(&target, &snapshot))
            .await
        {
            Ok(Ok(())) => {
                *written = generation;
                debug!("console history flushed ({} entries)", len);
            }
            Ok(Err(err)) => warn!("could not persist console history: {}", err),
            Err(err) => error!("console history writer failed: {}", err),
        }
    }
}
