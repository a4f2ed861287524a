//! Directory and file helpers for the filesystem backend.
//!
//! Shard directories are shared by every process writing to the same data
//! root, so they are created group-writable (`0775`) regardless of the
//! process umask. The umask is process-global; [`UmaskGuard`] swaps it for
//! the duration of one creation call and restores it on drop, and a lock
//! keeps two guards from interleaving their save/restore.

use parking_lot::{Mutex, MutexGuard};
use std::fs::DirBuilder;
use std::io::{self, Write};
use std::path::Path;

/// Mode for newly created shard directories.
const DIR_MODE: u32 = 0o775;

/// Mode for stored blobs.
const FILE_MODE: u32 = 0o664;

static UMASK_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Overrides the process umask until dropped.
pub(crate) struct UmaskGuard {
    #[cfg(unix)]
    previous: libc::mode_t,
    _lock: MutexGuard<'static, ()>,
}

impl UmaskGuard {
    pub(crate) fn set(mask: u32) -> Self {
        let lock = UMASK_LOCK.lock();
        #[cfg(unix)]
        {
            // SAFETY: umask only swaps an integer in the process state.
            let previous = unsafe { libc::umask(mask as libc::mode_t) };
            Self {
                previous,
                _lock: lock,
            }
        }
        #[cfg(not(unix))]
        {
            let _ = mask;
            Self { _lock: lock }
        }
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            // SAFETY: see `set`.
            unsafe {
                libc::umask(self.previous);
            }
        }
    }
}

/// Create `path` and any missing parents.
///
/// Losing a race to another creator is success: the directory exists, which
/// is all the caller needs.
pub(crate) fn create_shared_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    let _umask = UmaskGuard::set(0);
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether the current process may create entries inside `dir`.
///
/// A missing directory is not writable.
pub(crate) fn is_writable(dir: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        let Ok(c_path) = std::ffi::CString::new(dir.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: c_path is a valid NUL-terminated string for the call.
        dir.is_dir() && unsafe { libc::access(c_path.as_ptr(), libc::W_OK) } == 0
    }
    #[cfg(not(unix))]
    {
        std::fs::metadata(dir)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }
}

/// Name prefix of in-progress writes.
pub(crate) const TEMP_PREFIX: &str = ".tmp-";

/// Write `bytes` to `dest` through a temp file in the same directory.
///
/// Readers see either the previous content or the full new content, never
/// a partial write. Concurrent writers race on the final rename; the last
/// one wins.
pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;

    let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_data()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))?;
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, reporting whether it existed.
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read a file, mapping "not found" to `None`.
pub(crate) fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
