//! Filesystem capacity via `statvfs(2)`.

use std::path::Path;

use super::{Capacity, DiskReading, SourceError};

/// `total = blocks * frsize`, `free = bavail * frsize` (space available to
/// unprivileged users, so reserved blocks count as used).
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)] // field widths differ between libcs
pub fn usage(path: &Path) -> Result<DiskReading, SourceError> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| SourceError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::from(errno),
    })?;
    let fragment = stat.fragment_size() as u64;
    let total = (stat.blocks() as u64).saturating_mul(fragment);
    let free = (stat.blocks_available() as u64).saturating_mul(fragment);
    if total == 0 {
        return Err(SourceError::parse("statvfs", "filesystem reports no blocks"));
    }
    Ok(Capacity::from_total_free(total, free))
}

#[cfg(not(unix))]
pub fn usage(_path: &Path) -> Result<DiskReading, SourceError> {
    Err(SourceError::Unsupported)
}
