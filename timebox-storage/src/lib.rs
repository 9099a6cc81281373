//! Reads and writes TimeBox files on disk: the binary layout (`layout`) and
//! the advisory-lock concurrency gate (`lock`) that wraps it.
//!
//! Unlike the rest of this workspace's storage layer, this crate is
//! deliberately synchronous: the locking protocol blocks a thread while it
//! polls for another writer's sentinel to clear, which maps onto `std::fs`
//! rather than an async runtime (spec.md §4.7).

pub mod layout;
pub mod lock;

use std::io::{BufReader, BufWriter};
use std::path::Path;

use lock::LockConfig;
use timebox_core::{Result, TimeBoxFile};
use tracing::{debug, instrument};

/// Reads the TimeBox file at `path` under a shared lock.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_file(path: impl AsRef<Path>) -> Result<TimeBoxFile> {
    read_file_with_config(path, &LockConfig::default())
}

pub fn read_file_with_config(path: impl AsRef<Path>, config: &LockConfig) -> Result<TimeBoxFile> {
    let path = path.as_ref();
    let mut guard = lock::acquire_read(path, config)?;
    debug!("acquired read lock");
    let mut reader = BufReader::new(guard.file());
    layout::read(&mut reader)
}

/// Writes `file` to `path` under an exclusive lock, via a temp file and
/// atomic rename (spec.md §4.7, §5).
#[instrument(skip(path, file), fields(path = %path.as_ref().display()))]
pub fn write_file(path: impl AsRef<Path>, file: &TimeBoxFile) -> Result<()> {
    write_file_with_config(path, file, &LockConfig::default())
}

pub fn write_file_with_config(
    path: impl AsRef<Path>,
    file: &TimeBoxFile,
    config: &LockConfig,
) -> Result<()> {
    let path = path.as_ref();
    let guard = lock::acquire_write(path, config)?;
    debug!("acquired write lock");
    let temp_path = guard.temp_path();
    {
        let mut writer = BufWriter::new(std::fs::File::create(&temp_path)?);
        layout::write(&mut writer, file)?;
        std::io::Write::flush(&mut writer)?;
    }
    guard.commit()?;
    debug!("committed write");
    Ok(())
}
