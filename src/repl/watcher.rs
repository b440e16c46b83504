use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Watches flow documents and forwards change events to a channel.
///
/// notify runs its own background thread; events arrive on `tx`.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    watched: BTreeSet<PathBuf>,
}

impl FileWatcher {
    /// Create a new file watcher that sends events to the provided channel
    pub fn new(tx: Sender<notify::Result<Event>>) -> notify::Result<Self> {
        let watcher = notify::recommended_watcher(move |res| {
            // The receiver only goes away when the REPL exits
            let _ = tx.send(res);
        })?;

        Ok(Self {
            watcher,
            watched: BTreeSet::new(),
        })
    }

    /// Start watching a document. Watching the same path twice is a no-op.
    pub fn watch<P: AsRef<Path>>(&mut self, path: P) -> notify::Result<()> {
        let path = path.as_ref().to_path_buf();
        if self.watched.contains(&path) {
            return Ok(());
        }
        self.watcher.watch(&path, RecursiveMode::NonRecursive)?;
        self.watched.insert(path);
        Ok(())
    }

    /// Stop watching a document
    pub fn unwatch<P: AsRef<Path>>(&mut self, path: P) -> notify::Result<()> {
        let path = path.as_ref();
        self.watcher.unwatch(path)?;
        self.watched.remove(path);
        Ok(())
    }

    /// Paths currently watched
    pub fn watched(&self) -> impl Iterator<Item = &Path> {
        self.watched.iter().map(PathBuf::as_path)
    }
}

/// Paths in `event` whose contents may have changed
pub fn changed_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Modify(_) | EventKind::Create(_) => &event.paths,
        _ => &[],
    }
}
