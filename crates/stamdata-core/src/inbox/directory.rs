use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use super::{Inbox, InboxError, InboxResult};
use crate::clock::Clock;

/// Name of the sentinel file that locks an inbox
pub const LOCK_FILE_NAME: &str = "LOCKED";

/// How long a directory's size must stay unchanged before it is ready
pub const DEFAULT_STABILIZATION_PERIOD: Duration = Duration::from_secs(10);

/// Size samples not looked at for this long are forgotten
pub const DEFAULT_SIZE_CACHE_EXPIRY: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy)]
struct SizeSample {
    size: u64,
    /// First time this size was seen
    since: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

/// Inbox backed by the subdirectories of one directory
pub struct DirectoryInbox {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    stabilization_period: chrono::Duration,
    cache_expiry: chrono::Duration,
    sizes: HashMap<PathBuf, SizeSample>,
    ready: Vec<PathBuf>,
}

impl DirectoryInbox {
    /// Open the inbox at `<root>/<home>`, creating it if needed
    pub fn open(root: impl AsRef<Path>, home: &str, clock: Arc<dyn Clock>) -> InboxResult<Self> {
        let root = root.as_ref().join(home);
        fs::create_dir_all(&root).map_err(|e| InboxError::io(&root, e))?;

        debug!(inbox = %root.display(), "Opened inbox");

        Ok(Self {
            root,
            clock,
            stabilization_period: to_chrono(DEFAULT_STABILIZATION_PERIOD),
            cache_expiry: to_chrono(DEFAULT_SIZE_CACHE_EXPIRY),
            sizes: HashMap::new(),
            ready: Vec::new(),
        })
    }

    pub fn with_stabilization_period(mut self, period: Duration) -> Self {
        self.stabilization_period = to_chrono(period);
        self
    }

    pub fn with_size_cache_expiry(mut self, expiry: Duration) -> Self {
        self.cache_expiry = to_chrono(expiry);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    fn ensure_unlocked(&self) -> InboxResult<()> {
        if self.is_locked() {
            return Err(InboxError::Locked(self.root.clone()));
        }
        Ok(())
    }

    /// Immediate subdirectories, sorted by name
    fn data_sets(&self) -> InboxResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| InboxError::io(&self.root, e))?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InboxError::io(&self.root, e))?;
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => dirs.push(entry.path()),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(InboxError::io(entry.path(), e)),
            }
        }

        dirs.sort();
        Ok(dirs)
    }

    /// Record a size observation and report whether the directory is stable
    fn observe(&mut self, dir: &Path, size: u64, now: DateTime<Utc>) -> bool {
        match self.sizes.get_mut(dir) {
            Some(sample) if sample.size == size => {
                sample.last_access = now;
                now - sample.since >= self.stabilization_period
            }
            _ => {
                self.sizes.insert(
                    dir.to_path_buf(),
                    SizeSample {
                        size,
                        since: now,
                        last_access: now,
                    },
                );
                false
            }
        }
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        let expiry = self.cache_expiry;
        self.sizes.retain(|_, sample| now - sample.last_access < expiry);
    }
}

impl Inbox for DirectoryInbox {
    fn update(&mut self) -> InboxResult<()> {
        self.ensure_unlocked()?;

        let now = self.clock.now();
        self.purge_expired(now);

        let mut ready = Vec::new();
        let mut blocked = false;

        for dir in self.data_sets()? {
            let Some(size) = directory_size(&dir)? else {
                trace!(dir = %dir.display(), "Data set disappeared during scan");
                self.sizes.remove(&dir);
                continue;
            };

            let stable = self.observe(&dir, size, now);
            if !stable {
                trace!(dir = %dir.display(), size, "Data set not stable yet");
                blocked = true;
            } else if !blocked {
                ready.push(dir);
            }
        }

        self.ready = ready;
        Ok(())
    }

    fn top(&self) -> InboxResult<Option<PathBuf>> {
        self.ensure_unlocked()?;
        Ok(self.ready.first().cloned())
    }

    fn advance(&mut self) -> InboxResult<()> {
        self.ensure_unlocked()?;

        let head = self
            .ready
            .first()
            .cloned()
            .ok_or_else(|| InboxError::NothingToAdvance(self.root.clone()))?;

        match fs::remove_dir_all(&head) {
            Ok(()) => debug!(dataset = %head.display(), "Removed imported data set"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dataset = %head.display(), "Data set was already gone")
            }
            Err(e) => return Err(InboxError::Delete { path: head, source: e }),
        }

        self.ready.remove(0);
        self.sizes.remove(&head);
        Ok(())
    }

    fn ready_count(&self) -> InboxResult<usize> {
        self.ensure_unlocked()?;
        Ok(self.ready.len())
    }

    fn lock(&self) -> InboxResult<()> {
        let path = self.lock_file();
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| InboxError::Lock { path, source: e })?;

        warn!(inbox = %self.root.display(), "Inbox locked");
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.lock_file().exists()
    }
}

impl fmt::Display for DirectoryInbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inbox[{}]", self.root.display())
    }
}

impl fmt::Debug for DirectoryInbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryInbox")
            .field("root", &self.root)
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

/// Total size of all files below `dir`; `None` if `dir` itself is gone
fn directory_size(dir: &Path) -> InboxResult<Option<u64>> {
    let mut total = 0;

    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => {
                if e.depth() == 0 {
                    return Ok(None);
                }
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Err(InboxError::io(path, e.into()));
            }
        };

        if entry.file_type().is_file() {
            match entry.metadata() {
                Ok(meta) => total += meta.len(),
                Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => {}
                Err(e) => return Err(InboxError::io(entry.path(), e.into())),
            }
        }
    }

    Ok(Some(total))
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::{from_millis, ManualClock};

    fn inbox(root: &Path) -> (DirectoryInbox, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(from_millis(1_700_000_000_000)));
        let inbox = DirectoryInbox::open(root, "test", clock.clone()).unwrap();
        (inbox, clock)
    }

    #[test]
    fn test_open_creates_home_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (inbox, _) = inbox(tmp.path());

        assert!(tmp.path().join("test").is_dir());
        assert_eq!(inbox.to_string(), format!("Inbox[{}]", tmp.path().join("test").display()));
    }

    #[test]
    fn test_directory_size_is_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/one"), b"12345").unwrap();
        fs::write(tmp.path().join("a/b/two"), b"123").unwrap();

        assert_eq!(directory_size(&tmp.path().join("a")).unwrap(), Some(8));
        assert_eq!(directory_size(&tmp.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_size_change_restarts_stabilization() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut inbox, clock) = inbox(tmp.path());
        let dir = inbox.root().join("001");
        fs::create_dir(&dir).unwrap();

        inbox.update().unwrap();
        clock.advance(chrono::Duration::seconds(10));
        fs::write(dir.join("data"), b"more").unwrap();
        inbox.update().unwrap();
        assert_eq!(inbox.top().unwrap(), None);

        clock.advance(chrono::Duration::seconds(10));
        inbox.update().unwrap();
        assert_eq!(inbox.top().unwrap(), Some(dir));
    }

    #[test]
    fn test_expired_samples_are_forgotten() {
        let tmp = tempfile::tempdir().unwrap();
        let (inbox, clock) = inbox(tmp.path());
        let mut inbox = inbox.with_size_cache_expiry(Duration::from_secs(60));
        fs::create_dir(inbox.root().join("001")).unwrap();

        inbox.update().unwrap();
        assert_eq!(inbox.sizes.len(), 1);

        fs::remove_dir(inbox.root().join("001")).unwrap();
        clock.advance(chrono::Duration::seconds(61));
        inbox.update().unwrap();
        assert!(inbox.sizes.is_empty());
    }
}
