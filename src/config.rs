use crate::error::{Error, Result};
use crate::header::ShardHeader;
use std::path::PathBuf;

/// Number of shards produced when the caller gives no size limit.
pub const DEFAULT_SHARD_COUNT: u16 = 8;

/// Size of the transient streaming buffer used by split and join.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64 KB

/// Defines whether finished files are flushed to the physical disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  /// Call `fsync` on every shard once its header is committed, and on the
  /// reconstructed file once it has been verified.
  Strict,

  /// Never call `fsync` automatically. Relies on the OS background
  /// flush mechanism.
  Async,
}

/// How the splitter decides the size of each shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardLimit {
  /// Upper bound on every shard file in bytes, header included.
  /// Must leave room for at least one payload byte.
  MaxSize(u64),

  /// Split into at most this many shards of nearly equal size.
  Count(u16),
}

impl ShardLimit {
  /// Resolves the limit into the number of payload bytes each shard carries
  /// for a source of `original_size` bytes.
  pub fn payload_capacity(&self, original_size: u64) -> Result<u64> {
    let header = ShardHeader::SIZE as u64;
    match *self {
      ShardLimit::MaxSize(max) if max <= header => Err(Error::Config(format!(
        "max shard size {} must exceed the {} byte header",
        max, header
      ))),
      ShardLimit::MaxSize(max) => Ok(max - header),
      ShardLimit::Count(0) => Err(Error::Config("shard count must be at least 1".into())),
      ShardLimit::Count(count) => Ok(original_size.div_ceil(count as u64).max(1)),
    }
  }
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
  pub shard_limit: ShardLimit,

  /// Directory that receives the shards. When `None`, each shard is written
  /// next to the source as `<source>@<idx>.<count>`.
  /// Created if missing.
  pub shard_dir: Option<PathBuf>,

  /// Default: 64 KB.
  pub buffer_size: usize,

  pub sync_mode: SyncMode,
}

impl Default for SplitOptions {
  fn default() -> Self {
    Self {
      shard_limit: ShardLimit::Count(DEFAULT_SHARD_COUNT),
      shard_dir: None,
      buffer_size: DEFAULT_BUFFER_SIZE,
      sync_mode: SyncMode::Strict,
    }
  }
}

impl SplitOptions {
  pub fn new(shard_limit: ShardLimit) -> Self {
    Self {
      shard_limit,
      ..Default::default()
    }
  }

  /// Limits every shard file, header included, to `bytes`.
  pub fn with_max_shard_size(bytes: u64) -> Self {
    Self::new(ShardLimit::MaxSize(bytes))
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.buffer_size == 0 {
      return Err(Error::Config("buffer size must be at least 1 byte".into()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct JoinOptions {
  /// Directory in which the reconstructed file is created under its original
  /// name. When `None`, the current working directory is used.
  pub output_dir: Option<PathBuf>,

  /// Default: 64 KB.
  pub buffer_size: usize,

  pub sync_mode: SyncMode,

  /// Copy the permission bits of the first shard onto the reconstructed file.
  /// Shards inherit them from the source at split time.
  /// Default: true.
  pub preserve_permissions: bool,
}

impl Default for JoinOptions {
  fn default() -> Self {
    Self {
      output_dir: None,
      buffer_size: DEFAULT_BUFFER_SIZE,
      sync_mode: SyncMode::Strict,
      preserve_permissions: true,
    }
  }
}

impl JoinOptions {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: Some(output_dir.into()),
      ..Default::default()
    }
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.buffer_size == 0 {
      return Err(Error::Config("buffer size must be at least 1 byte".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_max_size_must_exceed_header() {
    assert!(ShardLimit::MaxSize(288).payload_capacity(10).is_err());
    assert_eq!(ShardLimit::MaxSize(289).payload_capacity(10).unwrap(), 1);
    assert_eq!(ShardLimit::MaxSize(4_000_000).payload_capacity(0).unwrap(), 3_999_712);
  }

  #[test]
  fn test_count_capacity() {
    assert_eq!(ShardLimit::Count(8).payload_capacity(80).unwrap(), 10);
    assert_eq!(ShardLimit::Count(8).payload_capacity(81).unwrap(), 11);
    // An empty source still needs a non-zero capacity.
    assert_eq!(ShardLimit::Count(8).payload_capacity(0).unwrap(), 1);
    assert!(ShardLimit::Count(0).payload_capacity(10).is_err());
  }

  #[test]
  fn test_defaults() {
    let split = SplitOptions::default();
    assert_eq!(split.shard_limit, ShardLimit::Count(DEFAULT_SHARD_COUNT));
    assert_eq!(split.buffer_size, DEFAULT_BUFFER_SIZE);

    let join = JoinOptions::new("/tmp/out");
    assert_eq!(join.output_dir, Some(PathBuf::from("/tmp/out")));
    assert!(join.preserve_permissions);

    let mut bad = SplitOptions::with_max_shard_size(1024);
    bad.buffer_size = 0;
    assert!(bad.validate().is_err());
  }
}
