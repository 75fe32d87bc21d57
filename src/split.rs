use crate::config::{SplitOptions, SyncMode};
use crate::error::{Error, IoOp, Result};
use crate::file::ShardFile;
use crate::header::{self, ShardHeader};
use crate::util;
use crc32fast::Hasher;
use tracing::{debug, info};
use std::fs::{self, Permissions};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

/// What a successful split produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
  pub original_size: u64,
  pub original_crc: u32,
  /// Shard paths in index order (`shards[0]` is shard 1).
  pub shards: Vec<PathBuf>,
}

/// Number of shards needed to carry `original_size` bytes at `capacity` payload bytes each.
/// An empty source still yields one (empty) shard.
pub fn shard_count_for(original_size: u64, capacity: u64) -> Result<u16> {
  let count = original_size.div_ceil(capacity).max(1);
  u16::try_from(count).map_err(|_| Error::TooManyShards {
    size: original_size,
    count,
  })
}

/// Splits `source` into a numbered set of shards.
///
/// The source is read twice: once for its whole-file CRC32, then again while the
/// shards are written. Existing files with the same shard names are overwritten.
/// If a shard fails to write, shards already written are left in place.
pub fn split(source: impl AsRef<Path>, options: &SplitOptions) -> Result<SplitReport> {
  let source = source.as_ref();
  options.validate()?;

  // Reject unrepresentable names before touching the filesystem.
  let name = util::base_name(source)?;
  header::encode_name(name.as_encoded_bytes())?;

  let mut input = ShardFile::open_ro(source)?;
  let (original_size, permissions) = input.size_and_mode()?;

  // Pass 1: whole-file checksum.
  let mut buffer = vec![0u8; options.buffer_size];
  let (_, original_crc) = input.checksum_to_end(&mut buffer)?;
  input.seek(SeekFrom::Start(0))?;

  let capacity = options.shard_limit.payload_capacity(original_size)?;
  let shard_count = shard_count_for(original_size, capacity)?;

  if let Some(dir) = &options.shard_dir {
    fs::create_dir_all(dir).map_err(|e| Error::io(IoOp::CreateDir, dir, e))?;
  }

  let mut header = ShardHeader::new(shard_count, original_size, original_crc, name.as_encoded_bytes())?;
  let mut remaining = original_size;
  let mut shards = Vec::with_capacity(shard_count as usize);

  // Pass 2: stream the payloads.
  for shard_idx in 1..=shard_count {
    let payload_size = capacity.min(remaining);
    let path = util::shard_path(source, options.shard_dir.as_deref(), shard_idx, shard_count)?;

    header.shard_idx = shard_idx;
    header.shard_size = ShardHeader::SIZE as u64 + payload_size;
    header.shard_crc = 0;

    write_shard(&mut input, &path, &mut header, &permissions, &mut buffer, options.sync_mode)?;
    debug!(target: "chainsaw", "Wrote {} ({} payload bytes, crc {:#010x})", path.display(), payload_size, header.shard_crc);

    remaining -= payload_size;
    shards.push(path);
  }

  info!(
    target: "chainsaw",
    "Split {} ({} bytes, crc {:#010x}) into {} shard(s)",
    source.display(),
    original_size,
    original_crc,
    shard_count
  );

  Ok(SplitReport {
    original_size,
    original_crc,
    shards,
  })
}

/// Writes one shard with a two-phase header commit: the header goes out first with a
/// zero checksum, the payload is streamed behind it, then the header is rewritten in
/// place once the payload checksum is known.
fn write_shard(
  input: &mut ShardFile,
  path: &Path,
  header: &mut ShardHeader,
  permissions: &Permissions,
  buffer: &mut [u8],
  sync_mode: SyncMode,
) -> Result<()> {
  let mut out = ShardFile::open_rw(path, Some(permissions))?;

  out.write_exactly(&header.to_bytes())?;

  let mut hasher = Hasher::new();
  input.copy_exactly(&mut out, header.payload_size(), buffer, &mut hasher)?;
  header.shard_crc = hasher.finalize();

  out.seek(SeekFrom::Start(0))?;
  out.write_exactly(&header.to_bytes())?;

  if sync_mode == SyncMode::Strict {
    out.sync()?;
  }
  Ok(())
}
