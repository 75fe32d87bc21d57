mod common;
use common::{HEADER, TestEnv, flip_byte, split_opts};

use std::fs;

use chainsaw::{Error, ErrorKind, ShardHeader};

#[test]
fn test_flipped_payload_byte_names_the_shard() {
  let env = TestEnv::new();
  let source = env.write_source("data.bin", 3000);
  let shards = chainsaw::split(&source, &split_opts(HEADER + 1000)).unwrap().shards;

  // Damage the middle shard's payload only; its header stays valid.
  flip_byte(&shards[1], ShardHeader::SIZE + 123);

  let err = chainsaw::join(&shards, &env.join_opts()).unwrap_err();
  match err {
    Error::DamagedShard { ref path, expected, actual } => {
      assert_eq!(path, &shards[1]);
      assert_ne!(expected, actual);
    }
    ref other => panic!("expected corruption error, got {other:?}"),
  }
  assert_eq!(err.kind(), ErrorKind::Corruption);
  assert!(err.to_string().contains("data.bin@2.3"));
}

#[test]
fn test_every_payload_position_is_detected() {
  let env = TestEnv::new();
  let source = env.write_source("data.bin", 40);
  let shards = chainsaw::split(&source, &split_opts(HEADER + 20)).unwrap().shards;

  for shard in &shards {
    for offset in 0..20 {
      let original = fs::read(shard).unwrap();
      flip_byte(shard, ShardHeader::SIZE + offset);

      let err = chainsaw::join(&shards, &env.join_opts()).unwrap_err();
      assert!(
        matches!(err, Error::DamagedShard { ref path, .. } if path == shard),
        "offset {offset} in {}: {err:?}",
        shard.display()
      );

      fs::write(shard, original).unwrap();
    }
  }

  // Restored shards join cleanly again.
  chainsaw::join(&shards, &env.join_opts()).unwrap();
}

#[test]
fn test_tampered_shard_checksum_detected() {
  let env = TestEnv::new();
  let source = env.write_source("data.bin", 500);
  let shards = chainsaw::split(&source, &split_opts(HEADER + 300)).unwrap().shards;

  let mut bytes = fs::read(&shards[0]).unwrap();
  let mut header = ShardHeader::from_bytes(&bytes).unwrap();
  header.shard_crc ^= 1;
  bytes[..ShardHeader::SIZE].copy_from_slice(&header.to_bytes());
  fs::write(&shards[0], &bytes).unwrap();

  let err = chainsaw::join(&shards, &env.join_opts()).unwrap_err();
  assert!(matches!(err, Error::DamagedShard { ref path, .. } if path == &shards[0]));
}

#[test]
fn test_whole_file_checksum_mismatch() {
  let env = TestEnv::new();
  let source = env.write_source("data.bin", 500);
  let shards = chainsaw::split(&source, &split_opts(HEADER + 300)).unwrap().shards;

  // Every header agrees on a wrong whole-file CRC, and every payload CRC is intact,
  // so only the final check can catch it.
  for shard in &shards {
    let mut bytes = fs::read(shard).unwrap();
    let mut header = ShardHeader::from_bytes(&bytes).unwrap();
    header.original_crc = header.original_crc.wrapping_add(1);
    bytes[..ShardHeader::SIZE].copy_from_slice(&header.to_bytes());
    fs::write(shard, &bytes).unwrap();
  }

  let err = chainsaw::join(&shards, &env.join_opts()).unwrap_err();
  match err {
    Error::ReconstructionFailed {
      expected_size,
      actual_size,
      expected_crc,
      actual_crc,
    } => {
      assert_eq!(expected_size, 500);
      assert_eq!(actual_size, 500);
      assert_eq!(expected_crc, actual_crc.wrapping_add(1));
    }
    ref other => panic!("expected reconstruction failure, got {other:?}"),
  }
  assert_eq!(err.kind(), ErrorKind::Corruption);
}

#[test]
fn test_whole_file_size_mismatch() {
  let env = TestEnv::new();
  let source = env.write_source("data.bin", 500);
  let shards = chainsaw::split(&source, &split_opts(HEADER + 300)).unwrap().shards;

  for shard in &shards {
    let mut bytes = fs::read(shard).unwrap();
    let mut header = ShardHeader::from_bytes(&bytes).unwrap();
    header.original_size += 1;
    bytes[..ShardHeader::SIZE].copy_from_slice(&header.to_bytes());
    fs::write(shard, &bytes).unwrap();
  }

  let err = chainsaw::join(&shards, &env.join_opts()).unwrap_err();
  assert!(matches!(
    err,
    Error::ReconstructionFailed {
      expected_size: 501,
      actual_size: 500,
      ..
    }
  ));
}
