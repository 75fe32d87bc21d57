use crate::error::{Error, IoOp, Result};
use crc32fast::Hasher;
use std::fs::{File, OpenOptions, Permissions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

/// An open file that remembers its path, so every failure names the file and the
/// operation that was attempted.
///
/// The descriptor is owned exclusively and released when the value is dropped,
/// on error paths included. A close that fails for any reason other than an
/// interrupted or already invalid descriptor aborts the process.
#[derive(Debug)]
pub struct ShardFile {
  path: PathBuf,
  file: ManuallyDrop<File>,
}

impl ShardFile {
  pub fn open_ro(path: &Path) -> Result<Self> {
    let file = File::open(path).map_err(|e| Error::io(IoOp::Open, path, e))?;
    Ok(Self {
      path: path.to_path_buf(),
      file: ManuallyDrop::new(file),
    })
  }

  /// Opens `path` for reading and writing, creating or truncating it. On Unix a newly
  /// created file receives the given permission bits (subject to the umask).
  pub fn open_rw(path: &Path, permissions: Option<&Permissions>) -> Result<Self> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
      use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
      if let Some(permissions) = permissions {
        opts.mode(permissions.mode());
      }
    }
    #[cfg(not(unix))]
    let _ = permissions;

    let file = opts.open(path).map_err(|e| Error::io(IoOp::Create, path, e))?;
    Ok(Self {
      path: path.to_path_buf(),
      file: ManuallyDrop::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn size_and_mode(&self) -> Result<(u64, Permissions)> {
    let metadata = self.file.metadata().map_err(|e| self.err(IoOp::Stat, e))?;
    Ok((metadata.len(), metadata.permissions()))
  }

  /// Reads up to `buf.len()` bytes. Returns 0 only at end of file.
  pub fn read_at_most(&mut self, buf: &mut [u8]) -> Result<usize> {
    loop {
      match self.file.read(buf) {
        Ok(n) => return Ok(n),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(self.err(IoOp::Read, e)),
      }
    }
  }

  /// Fills `buf` completely or fails.
  pub fn read_exactly(&mut self, buf: &mut [u8]) -> Result<()> {
    self.file.read_exact(buf).map_err(|e| self.err(IoOp::Read, e))
  }

  pub fn write_exactly(&mut self, buf: &[u8]) -> Result<()> {
    self.file.write_all(buf).map_err(|e| self.err(IoOp::Write, e))
  }

  pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
    self.file.seek(pos).map_err(|e| self.err(IoOp::Seek, e))
  }

  pub fn sync(&self) -> Result<()> {
    self.file.sync_all().map_err(|e| self.err(IoOp::Sync, e))
  }

  pub fn set_permissions(&self, permissions: Permissions) -> Result<()> {
    self
      .file
      .set_permissions(permissions)
      .map_err(|e| self.err(IoOp::SetPermissions, e))
  }

  /// Streams everything from the current position to end of file through a CRC32,
  /// using `buf` as the only working memory. Returns `(bytes_read, crc)`.
  pub fn checksum_to_end(&mut self, buf: &mut [u8]) -> Result<(u64, u32)> {
    let mut hasher = Hasher::new();
    let mut total = 0u64;
    loop {
      let n = self.read_at_most(buf)?;
      if n == 0 {
        break;
      }
      hasher.update(&buf[..n]);
      total += n as u64;
    }
    Ok((total, hasher.finalize()))
  }

  /// Copies exactly `len` bytes from `self` into `dst`, feeding them through `hasher`.
  pub fn copy_exactly(&mut self, dst: &mut ShardFile, len: u64, buf: &mut [u8], hasher: &mut Hasher) -> Result<()> {
    let mut remaining = len;
    while remaining > 0 {
      let want = remaining.min(buf.len() as u64) as usize;
      let n = self.read_at_most(&mut buf[..want])?;
      if n == 0 {
        return Err(self.err(
          IoOp::Read,
          io::Error::new(io::ErrorKind::UnexpectedEof, "file ended early, was it modified?"),
        ));
      }
      hasher.update(&buf[..n]);
      dst.write_exactly(&buf[..n])?;
      remaining -= n as u64;
    }
    Ok(())
  }

  fn err(&self, op: IoOp, source: io::Error) -> Error {
    Error::io(op, &self.path, source)
  }
}

impl Drop for ShardFile {
  fn drop(&mut self) {
    // SAFETY: `file` is taken exactly once and never touched afterwards.
    let file = unsafe { ManuallyDrop::take(&mut self.file) };
    close_or_abort(&self.path, file);
  }
}

#[cfg(unix)]
fn close_or_abort(path: &Path, file: File) {
  use std::os::fd::IntoRawFd;

  if let Err(errno) = nix::unistd::close(file.into_raw_fd()) {
    if close_error_is_fatal(errno) {
      tracing::error!(target: "chainsaw", "Failed to close {}: {}", path.display(), errno);
      std::process::abort();
    }
  }
}

#[cfg(not(unix))]
fn close_or_abort(_path: &Path, file: File) {
  drop(file);
}

/// Linux releases the descriptor even when `close` is interrupted, so EINTR counts
/// as closed and is never retried.
#[cfg(unix)]
fn close_error_is_fatal(errno: nix::errno::Errno) -> bool {
  use nix::errno::Errno;
  !matches!(errno, Errno::EINTR | Errno::EBADF)
}
