//! File mode helpers.
//!
//! Unix gets exact modes. Elsewhere only the read-only bit is meaningful, so
//! a mode without owner write maps to read-only and everything else to
//! writable.

use std::fs;
use std::io;
use std::path::Path;

/// Mode for store directories.
pub(crate) const DIR_MODE: u32 = 0o700;
/// Mode for the document and restored files.
pub(crate) const PRIVATE_FILE_MODE: u32 = 0o600;
/// Mode for isolated copies.
pub(crate) const READ_ONLY_MODE: u32 = 0o400;

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)
}

/// Creates `dir` (and parents) and restricts it to the owner.
pub(crate) fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    set_mode(dir, DIR_MODE)
}
