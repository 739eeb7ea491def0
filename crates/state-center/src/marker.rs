use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

pub const RUNNING_MARKER_FILE: &str = "running.flag";
pub const CONTINUATION_MARKER_FILE: &str = "auto_booking.flag";

/// A boolean flag scoped to one browsing session. It survives page
/// navigation but not the end of the session.
pub trait RunMarker: Send + Sync {
    fn get(&self) -> bool;
    fn set(&self, value: bool);
}

/// In-process marker. Clones share the same flag, so a "navigation" that
/// rebuilds the engine can hand the clone to the new instance.
#[derive(Clone, Debug, Default)]
pub struct MemoryMarker {
    flag: Arc<AtomicBool>,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunMarker for MemoryMarker {
    fn get(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set(&self, value: bool) {
        self.flag.store(value, Ordering::SeqCst);
    }
}

/// Marker backed by the presence of a file inside a session directory.
#[derive(Clone, Debug)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, b"1")
    }
}

impl RunMarker for FileMarker {
    fn get(&self) -> bool {
        self.path.is_file()
    }

    fn set(&self, value: bool) {
        let result = if value {
            self.write()
        } else {
            match fs::remove_file(&self.path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        };
        if let Err(err) = result {
            warn!(path = %self.path.display(), value, error = %err, "failed to update run marker");
        }
    }
}

/// The two flags that carry a run across a full page reload.
#[derive(Clone)]
pub struct SessionMarkers {
    pub running: Arc<dyn RunMarker>,
    pub continuation: Arc<dyn RunMarker>,
}

impl SessionMarkers {
    pub fn new(running: Arc<dyn RunMarker>, continuation: Arc<dyn RunMarker>) -> Self {
        Self {
            running,
            continuation,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMarker::new()), Arc::new(MemoryMarker::new()))
    }

    /// File-backed markers under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            Arc::new(FileMarker::new(dir.join(RUNNING_MARKER_FILE))),
            Arc::new(FileMarker::new(dir.join(CONTINUATION_MARKER_FILE))),
        )
    }

    pub fn clear(&self) {
        self.running.set(false);
        self.continuation.set(false);
    }

    pub fn any_set(&self) -> bool {
        self.running.get() || self.continuation.get()
    }
}

impl std::fmt::Debug for SessionMarkers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMarkers")
            .field("running", &self.running.get())
            .field("continuation", &self.continuation.get())
            .finish()
    }
}
