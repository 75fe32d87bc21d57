use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// Returns the final component of `path`, the name recorded in every shard header.
pub fn base_name(path: &Path) -> Result<&OsStr> {
  path
    .file_name()
    .ok_or_else(|| Error::InvalidName(format!("{} has no file name", path.display())))
}

/// Generates a shard filename from a base name.
/// Format: report.bin@2.3 (shard 2 of 3)
pub fn shard_filename(base: &OsStr, idx: u16, count: u16) -> OsString {
  let mut name = base.to_os_string();
  name.push(format!("@{}.{}", idx, count));
  name
}

/// Builds the path of shard `idx`. Without a `shard_dir` the suffix is appended to the
/// source path itself, so shards land next to the source.
pub fn shard_path(source: &Path, shard_dir: Option<&Path>, idx: u16, count: u16) -> Result<PathBuf> {
  match shard_dir {
    Some(dir) => Ok(dir.join(shard_filename(base_name(source)?, idx, count))),
    None => Ok(PathBuf::from(shard_filename(source.as_os_str(), idx, count))),
  }
}

/// Parses the `(idx, count)` pair from a shard filename.
pub fn parse_shard_suffix(filename: &str) -> Option<(u16, u16)> {
  let (_, suffix) = filename.rsplit_once('@')?;
  let (idx, count) = suffix.split_once('.')?;
  Some((idx.parse().ok()?, count.parse().ok()?))
}

/// Turns a name read from a shard header into a relative path, refusing anything that is
/// not a single plain path component.
pub fn name_to_path(name: &[u8]) -> Result<PathBuf> {
  if name.contains(&b'/') || name.contains(&b'\\') {
    return Err(Error::InvalidName(format!(
      "{:?} contains a path separator",
      String::from_utf8_lossy(name)
    )));
  }

  let path = PathBuf::from(bytes_to_os_string(name));

  // Prevent directory traversal
  let mut components = path.components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(path),
    _ => Err(Error::InvalidName(format!(
      "{:?} is not a plain file name",
      String::from_utf8_lossy(name)
    ))),
  }
}

#[cfg(unix)]
fn bytes_to_os_string(bytes: &[u8]) -> OsString {
  use std::os::unix::ffi::OsStrExt;
  OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
fn bytes_to_os_string(bytes: &[u8]) -> OsString {
  OsString::from(String::from_utf8_lossy(bytes).into_owned())
}
