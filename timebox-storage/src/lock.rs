//! The concurrency gate: OS advisory whole-file locks plus a sentinel side
//! file enforcing writer priority (spec.md §4.7).

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::FileExt;
use timebox_core::{Result, TimeBoxError};
use tracing::{debug, trace};

/// Deadlines and poll cadence for the locking protocol. Defaults match
/// spec.md §4.7: a 60s writer deadline, a 30s reader deadline, 100ms polling.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    pub writer_deadline: Duration,
    pub reader_deadline: Duration,
    pub poll_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            writer_deadline: Duration::from_secs(60),
            reader_deadline: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

fn sentinel_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".lock");
    PathBuf::from(s)
}

/// A held shared (read) lock. The lock is released when the guard drops.
pub struct ReadGuard {
    file: File,
}

impl ReadGuard {
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// A held exclusive (write) lock, paired with a sibling temp path the caller
/// writes the new file contents to. `commit` atomically renames the temp
/// file into place; dropping without committing leaves the original file (if
/// any) untouched, strengthening the original truncate-in-place behaviour
/// per spec.md §5.
pub struct WriteGuard {
    lock_file: File,
    path: PathBuf,
    sentinel: PathBuf,
    owns_sentinel: bool,
    file_is_new: bool,
    committed: bool,
}

impl WriteGuard {
    pub fn temp_path(&self) -> PathBuf {
        let mut s = self.path.as_os_str().to_owned();
        s.push(".tmp");
        PathBuf::from(s)
    }

    /// Atomically replaces the target path with the contents written at
    /// `temp_path()`.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(self.temp_path(), &self.path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
        if self.owns_sentinel {
            let _ = fs::remove_file(&self.sentinel);
        }
        if !self.committed {
            let _ = fs::remove_file(self.temp_path());
            if self.file_is_new {
                let _ = fs::remove_file(&self.path);
            }
        }
    }
}

/// Acquires the writer lock per spec.md §4.7: wait out any sentinel left by
/// another writer, create our own sentinel, then take a non-blocking
/// exclusive lock on the data file, retrying until `config.writer_deadline`.
#[tracing::instrument(skip(config), fields(path = %path.display()))]
pub fn acquire_write(path: &Path, config: &LockConfig) -> Result<WriteGuard> {
    let sentinel = sentinel_path(path);
    let deadline = Instant::now() + config.writer_deadline;
    let file_is_new = !path.exists();

    let mut owns_sentinel = false;
    loop {
        if Instant::now() > deadline {
            debug!("writer deadline expired waiting for sentinel to clear");
            return Err(TimeBoxError::CouldNotAcquireLock);
        }
        if sentinel.exists() {
            trace!("sentinel held by another writer, polling");
            std::thread::sleep(config.poll_interval);
            continue;
        }
        match OpenOptions::new().write(true).create_new(true).open(&sentinel) {
            Ok(_) => {
                owns_sentinel = true;
                break;
            }
            Err(_) => {
                std::thread::sleep(config.poll_interval);
                continue;
            }
        }
    }

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;

    loop {
        if lock_file.try_lock_exclusive().is_ok() {
            debug!("acquired exclusive file lock");
            return Ok(WriteGuard {
                lock_file,
                path: path.to_path_buf(),
                sentinel,
                owns_sentinel,
                file_is_new,
                committed: false,
            });
        }
        if Instant::now() > deadline {
            debug!("writer deadline expired waiting for exclusive lock");
            if owns_sentinel {
                let _ = fs::remove_file(&sentinel);
            }
            return Err(TimeBoxError::CouldNotAcquireLock);
        }
        trace!("exclusive lock held by another process, polling");
        std::thread::sleep(config.poll_interval);
    }
}

/// Acquires the reader lock per spec.md §4.7: wait out any writer sentinel,
/// then take a non-blocking shared lock on the data file, retrying until
/// `config.reader_deadline`.
#[tracing::instrument(skip(config), fields(path = %path.display()))]
pub fn acquire_read(path: &Path, config: &LockConfig) -> Result<ReadGuard> {
    let sentinel = sentinel_path(path);
    let deadline = Instant::now() + config.reader_deadline;

    loop {
        if Instant::now() > deadline {
            debug!("reader deadline expired");
            return Err(TimeBoxError::CouldNotAcquireLock);
        }
        if sentinel.exists() {
            trace!("writer sentinel present, polling");
            std::thread::sleep(config.poll_interval);
            continue;
        }
        let file = OpenOptions::new().read(true).open(path)?;
        match file.try_lock_shared() {
            Ok(_) => {
                debug!("acquired shared file lock");
                return Ok(ReadGuard { file });
            }
            Err(_) => {
                trace!("exclusive lock held by a writer, polling");
                std::thread::sleep(config.poll_interval)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips_through_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.timebox");

        let config = LockConfig::default();
        let guard = acquire_write(&path, &config).unwrap();
        std::fs::write(guard.temp_path(), b"hello").unwrap();
        guard.commit().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!sentinel_path(&path).exists());

        let mut read_guard = acquire_read(&path, &config).unwrap();
        use std::io::Read;
        let mut buf = Vec::new();
        read_guard.file().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn dropping_without_commit_leaves_original_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.timebox");
        std::fs::write(&path, b"original").unwrap();

        {
            let guard = acquire_write(&path, &LockConfig::default()).unwrap();
            std::fs::write(guard.temp_path(), b"garbage").unwrap();
            // guard drops here without calling commit()
        }

        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert!(!sentinel_path(&path).exists());
    }

    #[test]
    fn dropping_a_fresh_file_without_commit_removes_the_stub() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.timebox");

        {
            let guard = acquire_write(&path, &LockConfig::default()).unwrap();
            let _ = guard; // no write, no commit
        }

        assert!(!path.exists());
    }

    #[test]
    fn sentinel_blocks_a_second_writer_until_released() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.timebox");
        let config = LockConfig {
            writer_deadline: Duration::from_millis(200),
            reader_deadline: Duration::from_millis(200),
            poll_interval: Duration::from_millis(20),
        };

        let guard = acquire_write(&path, &config).unwrap();
        let result = acquire_write(&path, &config);
        assert!(result.is_err());
        drop(guard);

        let guard2 = acquire_write(&path, &config).unwrap();
        drop(guard2);
    }
}
