#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chainsaw::{JoinOptions, SplitOptions, SyncMode};
use tempfile::TempDir;

pub const HEADER: u64 = chainsaw::ShardHeader::SIZE as u64;

pub struct TestEnv {
  // The TempDir guard must be kept alive to prevent premature deletion of the directory.
  pub _dir: TempDir,
  pub root: PathBuf,
  /// Join output goes here so it never collides with the source.
  pub out: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let out = root.join("out");
    fs::create_dir(&out).unwrap();
    Self { _dir: dir, root, out }
  }

  /// Writes a source file of `len` deterministic bytes.
  pub fn write_source(&self, name: &str, len: usize) -> PathBuf {
    self.write_bytes(name, &pattern(len))
  }

  pub fn write_bytes(&self, name: &str, data: &[u8]) -> PathBuf {
    let path = self.root.join(name);
    fs::write(&path, data).unwrap();
    path
  }

  pub fn join_opts(&self) -> JoinOptions {
    let mut opts = JoinOptions::new(&self.out);
    opts.sync_mode = SyncMode::Async;
    opts
  }

  pub fn output(&self, name: &str) -> PathBuf {
    self.out.join(name)
  }
}

/// Split options bounded by `max` bytes per shard file, without fsync.
pub fn split_opts(max: u64) -> SplitOptions {
  let mut opts = SplitOptions::with_max_shard_size(max);
  opts.sync_mode = SyncMode::Async;
  opts
}

pub fn pattern(len: usize) -> Vec<u8> {
  (0..len as u64).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect()
}

/// Flips every bit of the byte at `offset`.
pub fn flip_byte(path: &Path, offset: usize) {
  let mut data = fs::read(path).unwrap();
  data[offset] ^= 0xFF;
  fs::write(path, data).unwrap();
}

/// Sorted names of the entries in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(dir)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}
