use crate::config::{JoinOptions, SyncMode};
use crate::error::{Error, Result};
use crate::file::ShardFile;
use crate::header::ShardHeader;
use crate::util;
use crc32fast::Hasher;
use tracing::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

/// Shard paths keyed by shard index, built while validating a join request.
#[derive(Debug)]
pub struct ShardSet<'a> {
  count: u16,
  shards: BTreeMap<u16, &'a Path>,
}

impl<'a> ShardSet<'a> {
  pub fn new(count: u16) -> Self {
    Self {
      count,
      shards: BTreeMap::new(),
    }
  }

  pub fn insert(&mut self, idx: u16, path: &'a Path) -> Result<()> {
    if self.shards.contains_key(&idx) {
      return Err(Error::DuplicateShard {
        path: path.to_path_buf(),
        idx,
      });
    }
    self.shards.insert(idx, path);
    Ok(())
  }

  /// Fails with the lowest index in `1..=count` that has no shard.
  pub fn ensure_complete(&self) -> Result<()> {
    match (1..=self.count).find(|idx| !self.shards.contains_key(idx)) {
      Some(idx) => Err(Error::MissingShard { idx, count: self.count }),
      None => Ok(()),
    }
  }

  /// Iterates ascending by shard index.
  pub fn iter(&self) -> impl Iterator<Item = (u16, &'a Path)> + '_ {
    self.shards.iter().map(|(&idx, &path)| (idx, path))
  }

  pub fn len(&self) -> usize {
    self.shards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.shards.is_empty()
  }
}

/// Opens and validates a single shard, returning its header.
pub fn inspect(path: impl AsRef<Path>) -> Result<ShardHeader> {
  open_shard(path.as_ref()).map(|(_, header)| header)
}

/// Reassembles the file that `shard_paths` were split from.
///
/// The paths may be given in any order; the first one supplies the reference header
/// every other shard must agree with. The output is created under the name recorded in
/// the headers. Returns the path of the reconstructed file. On failure a partially
/// written output may be left behind.
pub fn join<P: AsRef<Path>>(shard_paths: &[P], options: &JoinOptions) -> Result<PathBuf> {
  options.validate()?;

  let (first, rest) = shard_paths.split_first().ok_or(Error::NoShards)?;
  let first = first.as_ref();

  let (master_file, master) = open_shard(first)?;
  let (_, permissions) = master_file.size_and_mode()?;
  drop(master_file);

  if shard_paths.len() != master.shard_count as usize {
    return Err(Error::CountMismatch {
      supplied: shard_paths.len(),
      expected: master.shard_count,
    });
  }

  let mut set = ShardSet::new(master.shard_count);
  set.insert(master.shard_idx, first)?;
  for path in rest {
    let path = path.as_ref();
    let (_, header) = open_shard(path)?;
    if let Some(field) = master.mismatched_field(&header) {
      return Err(Error::ShardMismatch {
        path: path.to_path_buf(),
        field,
      });
    }
    set.insert(header.shard_idx, path)?;
  }
  set.ensure_complete()?;

  let name = util::name_to_path(master.name_bytes())?;
  let destination = match &options.output_dir {
    Some(dir) => dir.join(name),
    None => name,
  };

  let mut output = ShardFile::open_rw(&destination, options.preserve_permissions.then_some(&permissions))?;
  let mut buffer = vec![0u8; options.buffer_size];
  let mut total_hasher = Hasher::new();

  for (idx, path) in set.iter() {
    // Re-validate: the file may have changed since the first pass.
    let (mut input, header) = open_shard(path)?;
    if let Some(field) = master.mismatched_field(&header) {
      return Err(Error::ShardMismatch {
        path: path.to_path_buf(),
        field,
      });
    }
    if header.shard_idx != idx {
      return Err(Error::ShardMismatch {
        path: path.to_path_buf(),
        field: "shard_idx",
      });
    }

    let mut shard_hasher = Hasher::new();
    loop {
      let n = input.read_at_most(&mut buffer)?;
      if n == 0 {
        break;
      }
      total_hasher.update(&buffer[..n]);
      shard_hasher.update(&buffer[..n]);
      output.write_exactly(&buffer[..n])?;
    }

    let actual = shard_hasher.finalize();
    if actual != header.shard_crc {
      return Err(Error::DamagedShard {
        path: path.to_path_buf(),
        expected: header.shard_crc,
        actual,
      });
    }
    debug!(target: "chainsaw", "Appended shard {}/{} from {}", idx, master.shard_count, input.path().display());
  }

  let actual_size = output.seek(SeekFrom::Current(0))?;
  let actual_crc = total_hasher.finalize();
  if actual_size != master.original_size || actual_crc != master.original_crc {
    return Err(Error::ReconstructionFailed {
      expected_size: master.original_size,
      actual_size,
      expected_crc: master.original_crc,
      actual_crc,
    });
  }

  if options.preserve_permissions {
    output.set_permissions(permissions)?;
  }
  if options.sync_mode == SyncMode::Strict {
    output.sync()?;
  }

  info!(
    target: "chainsaw",
    "Joined {} shard(s) into {} ({} bytes, crc {:#010x})",
    set.len(),
    destination.display(),
    actual_size,
    actual_crc
  );
  Ok(destination)
}

/// Opens `path` and checks that it is a self-consistent shard: large enough to hold a
/// header, correct magic, a recorded size equal to the real size, and an index inside
/// its count. Every failure is wrapped in `Error::NotAShard` naming the path.
fn open_shard(path: &Path) -> Result<(ShardFile, ShardHeader)> {
  read_shard(path).map_err(|source| Error::NotAShard {
    path: path.to_path_buf(),
    source: Box::new(source),
  })
}

fn read_shard(path: &Path) -> Result<(ShardFile, ShardHeader)> {
  let mut file = ShardFile::open_ro(path)?;
  let (size, _) = file.size_and_mode()?;
  if size < ShardHeader::SIZE as u64 {
    return Err(Error::TooSmall { size });
  }

  let mut buf = [0u8; ShardHeader::SIZE];
  file.read_exactly(&mut buf)?;
  let header = ShardHeader::from_bytes(&buf)?;

  if header.shard_size != size {
    return Err(Error::SizeMismatch {
      recorded: header.shard_size,
      actual: size,
    });
  }
  header.check_index()?;

  if let Some((idx, count)) = path.file_name().and_then(|n| n.to_str()).and_then(util::parse_shard_suffix) {
    if (idx, count) != (header.shard_idx, header.shard_count) {
      warn!(
        target: "chainsaw",
        "{} is named as shard {}.{} but its header says {}.{}",
        path.display(),
        idx,
        count,
        header.shard_idx,
        header.shard_count
      );
    }
  }

  Ok((file, header))
}
