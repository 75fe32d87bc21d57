use thiserror::Error;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every failure the crate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The bytes on disk are not a well-formed shard, or a header cannot be encoded.
  Format,
  /// Shards are individually valid but do not form one complete set.
  Consistency,
  /// A checksum did not match its recorded value.
  Corruption,
  /// The operating system refused an open/read/write/seek/stat.
  Io,
  /// The caller supplied unusable options.
  Config,
}

/// The file operation that was being attempted when an I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
  Open,
  Create,
  CreateDir,
  Read,
  Write,
  Seek,
  Stat,
  Sync,
  SetPermissions,
}

impl fmt::Display for IoOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let verb = match self {
      IoOp::Open => "open",
      IoOp::Create => "create",
      IoOp::CreateDir => "create directory",
      IoOp::Read => "read",
      IoOp::Write => "write",
      IoOp::Seek => "seek",
      IoOp::Stat => "stat",
      IoOp::Sync => "sync",
      IoOp::SetPermissions => "set permissions on",
    };
    f.write_str(verb)
  }
}

#[derive(Error, Debug)]
pub enum Error {
  #[error("could not {op} {path:?}")]
  Io {
    op: IoOp,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("could not open {path:?} as a shard")]
  NotAShard {
    path: PathBuf,
    #[source]
    source: Box<Error>,
  },

  // --- Format ---
  #[error("the file is too small to be a shard ({size} bytes)")]
  TooSmall { size: u64 },

  #[error("shard header truncated after {len} bytes")]
  TruncatedHeader { len: usize },

  #[error("bad magic {found:#010x}, the file is not a shard")]
  BadMagic { found: u32 },

  #[error("header records a shard size of {recorded} bytes but the file is {actual} bytes")]
  SizeMismatch { recorded: u64, actual: u64 },

  #[error("shard index {idx} is outside 1..={count}")]
  IndexOutOfRange { idx: u16, count: u16 },

  #[error("the file name is {len} bytes, a shard header holds at most {max}")]
  NameTooLong { len: usize, max: usize },

  #[error("invalid original file name: {0}")]
  InvalidName(String),

  #[error("{size} bytes would need {count} shards, more than the {} a header can index", u16::MAX)]
  TooManyShards { size: u64, count: u64 },

  // --- Consistency ---
  #[error("no shards to join")]
  NoShards,

  #[error("got {supplied} file name(s) but expected {expected} shard(s)")]
  CountMismatch { supplied: usize, expected: u16 },

  #[error("shard {path:?} doesn't match ({field} differs)")]
  ShardMismatch { path: PathBuf, field: &'static str },

  #[error("shard {path:?} is a duplicate of shard {idx}")]
  DuplicateShard { path: PathBuf, idx: u16 },

  #[error("shard {idx} of {count} is missing")]
  MissingShard { idx: u16, count: u16 },

  // --- Corruption ---
  #[error("shard {path:?} is damaged: expected CRC32 {expected:#010x}, got {actual:#010x}")]
  DamagedShard { path: PathBuf, expected: u32, actual: u32 },

  #[error(
    "output did not reconstruct correctly: expected {expected_size} bytes with CRC32 {expected_crc:#010x}, \
     got {actual_size} bytes with CRC32 {actual_crc:#010x}"
  )]
  ReconstructionFailed {
    expected_size: u64,
    actual_size: u64,
    expected_crc: u32,
    actual_crc: u32,
  },

  #[error("Configuration Error: {0}")]
  Config(String),
}

impl Error {
  pub(crate) fn io(op: IoOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
    Error::Io {
      op,
      path: path.into(),
      source,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Io { .. } => ErrorKind::Io,
      Error::NotAShard { source, .. } => source.kind(),
      Error::TooSmall { .. }
      | Error::TruncatedHeader { .. }
      | Error::BadMagic { .. }
      | Error::SizeMismatch { .. }
      | Error::IndexOutOfRange { .. }
      | Error::NameTooLong { .. }
      | Error::InvalidName(_)
      | Error::TooManyShards { .. } => ErrorKind::Format,
      Error::NoShards
      | Error::CountMismatch { .. }
      | Error::ShardMismatch { .. }
      | Error::DuplicateShard { .. }
      | Error::MissingShard { .. } => ErrorKind::Consistency,
      Error::DamagedShard { .. } | Error::ReconstructionFailed { .. } => ErrorKind::Corruption,
      Error::Config(_) => ErrorKind::Config,
    }
  }

  /// Returns the innermost error of this crate's own type, skipping `NotAShard` wrappers.
  pub fn root(&self) -> &Error {
    match self {
      Error::NotAShard { source, .. } => source.root(),
      other => other,
    }
  }

  /// Renders the error followed by every underlying cause, outermost first.
  pub fn chain(&self) -> ErrorChain<'_> {
    ErrorChain(self)
  }
}

pub struct ErrorChain<'a>(&'a Error);

impl fmt::Display for ErrorChain<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)?;
    let mut cause = self.0.source();
    while let Some(err) = cause {
      write!(f, ": {}", err)?;
      cause = StdError::source(err);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_chain_renders_every_cause() {
    let err = Error::NotAShard {
      path: PathBuf::from("x@1.2"),
      source: Box::new(Error::io(
        IoOp::Open,
        "x@1.2",
        io::Error::new(io::ErrorKind::NotFound, "gone"),
      )),
    };

    assert_eq!(
      err.chain().to_string(),
      "could not open \"x@1.2\" as a shard: could not open \"x@1.2\": gone"
    );
  }

  #[test]
  fn test_wrapped_kind_follows_cause() {
    let format = Error::NotAShard {
      path: PathBuf::from("a"),
      source: Box::new(Error::BadMagic { found: 0 }),
    };
    assert_eq!(format.kind(), ErrorKind::Format);
    assert!(matches!(format.root(), Error::BadMagic { found: 0 }));

    let io = Error::NotAShard {
      path: PathBuf::from("a"),
      source: Box::new(Error::io(IoOp::Read, "a", io::Error::other("boom"))),
    };
    assert_eq!(io.kind(), ErrorKind::Io);
  }

  #[test]
  fn test_taxonomy() {
    assert_eq!(Error::NoShards.kind(), ErrorKind::Consistency);
    assert_eq!(Error::MissingShard { idx: 2, count: 3 }.kind(), ErrorKind::Consistency);
    assert_eq!(Error::TooManyShards { size: 1, count: 70_000 }.kind(), ErrorKind::Format);
    assert_eq!(
      Error::DamagedShard {
        path: PathBuf::from("a"),
        expected: 1,
        actual: 2
      }
      .kind(),
      ErrorKind::Corruption
    );
    assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Config);
  }
}
