use crate::error::{Error, Result};
use byteorder::{ByteOrder, NativeEndian};
use std::borrow::Cow;
use std::fmt;

pub const SHARD_MAGIC: u32 = 0xB007_C8AD;

/// Capacity of the fixed name field, terminator included.
pub const NAME_FIELD_LEN: usize = 256;

/// Longest base name a header accepts. The name plus its terminator must stay below the field capacity.
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 2;

const MAGIC_AT: usize = 0;
const IDX_AT: usize = 4;
const COUNT_AT: usize = 6;
const ORIGINAL_SIZE_AT: usize = 8;
const ORIGINAL_CRC_AT: usize = 16;
const SHARD_SIZE_AT: usize = 20;
const SHARD_CRC_AT: usize = 28;
const NAME_AT: usize = 32;

/// The exact binary layout of a Shard Header on disk (288 bytes), packed, host byte order.
///
/// [Magic: 4]
/// [Shard Index: 2]
/// [Shard Count: 2]
/// [Original Size: 8]
/// [Original CRC32: 4]
/// [Shard Size: 8]
/// [Shard CRC32: 4]
/// [Original Name: 256]
///
/// Files written on a machine of one byte order are not readable on the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHeader {
  /// 1-based position of this shard within its set.
  pub shard_idx: u16,
  pub shard_count: u16,
  pub original_size: u64,
  pub original_crc: u32,
  /// Size of the shard file, header included.
  pub shard_size: u64,
  /// CRC32 of the payload only.
  pub shard_crc: u32,
  /// Null-terminated, zero-padded base name of the source file.
  pub original_name: [u8; NAME_FIELD_LEN],
}

impl ShardHeader {
  pub const SIZE: usize = 4 + 2 + 2 + 8 + 4 + 8 + 4 + NAME_FIELD_LEN; // 288 bytes

  /// Builds the header fields shared by every shard of one split.
  /// `shard_idx`, `shard_size` and `shard_crc` are filled in per shard.
  pub fn new(shard_count: u16, original_size: u64, original_crc: u32, name: &[u8]) -> Result<Self> {
    Ok(Self {
      shard_idx: 1,
      shard_count,
      original_size,
      original_crc,
      shard_size: Self::SIZE as u64,
      shard_crc: 0,
      original_name: encode_name(name)?,
    })
  }

  pub fn to_bytes(&self) -> [u8; Self::SIZE] {
    let mut buf = [0u8; Self::SIZE];
    NativeEndian::write_u32(&mut buf[MAGIC_AT..IDX_AT], SHARD_MAGIC);
    NativeEndian::write_u16(&mut buf[IDX_AT..COUNT_AT], self.shard_idx);
    NativeEndian::write_u16(&mut buf[COUNT_AT..ORIGINAL_SIZE_AT], self.shard_count);
    NativeEndian::write_u64(&mut buf[ORIGINAL_SIZE_AT..ORIGINAL_CRC_AT], self.original_size);
    NativeEndian::write_u32(&mut buf[ORIGINAL_CRC_AT..SHARD_SIZE_AT], self.original_crc);
    NativeEndian::write_u64(&mut buf[SHARD_SIZE_AT..SHARD_CRC_AT], self.shard_size);
    NativeEndian::write_u32(&mut buf[SHARD_CRC_AT..NAME_AT], self.shard_crc);
    buf[NAME_AT..].copy_from_slice(&self.original_name);
    buf
  }

  /// Decodes a header from the start of `buf`. Bytes past the header are ignored.
  pub fn from_bytes(buf: &[u8]) -> Result<Self> {
    if buf.len() < Self::SIZE {
      return Err(Error::TruncatedHeader { len: buf.len() });
    }

    let magic = NativeEndian::read_u32(&buf[MAGIC_AT..IDX_AT]);
    if magic != SHARD_MAGIC {
      return Err(Error::BadMagic { found: magic });
    }

    let mut original_name = [0u8; NAME_FIELD_LEN];
    original_name.copy_from_slice(&buf[NAME_AT..Self::SIZE]);
    if !original_name.contains(&0) {
      return Err(Error::InvalidName("name field is not null-terminated".into()));
    }

    Ok(Self {
      shard_idx: NativeEndian::read_u16(&buf[IDX_AT..COUNT_AT]),
      shard_count: NativeEndian::read_u16(&buf[COUNT_AT..ORIGINAL_SIZE_AT]),
      original_size: NativeEndian::read_u64(&buf[ORIGINAL_SIZE_AT..ORIGINAL_CRC_AT]),
      original_crc: NativeEndian::read_u32(&buf[ORIGINAL_CRC_AT..SHARD_SIZE_AT]),
      shard_size: NativeEndian::read_u64(&buf[SHARD_SIZE_AT..SHARD_CRC_AT]),
      shard_crc: NativeEndian::read_u32(&buf[SHARD_CRC_AT..NAME_AT]),
      original_name,
    })
  }

  pub fn check_index(&self) -> Result<()> {
    if self.shard_idx == 0 || self.shard_idx > self.shard_count {
      return Err(Error::IndexOutOfRange {
        idx: self.shard_idx,
        count: self.shard_count,
      });
    }
    Ok(())
  }

  /// The stored name without its terminator and padding.
  pub fn name_bytes(&self) -> &[u8] {
    let end = self.original_name.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
    &self.original_name[..end]
  }

  pub fn original_name(&self) -> Cow<'_, str> {
    String::from_utf8_lossy(self.name_bytes())
  }

  pub fn payload_size(&self) -> u64 {
    self.shard_size.saturating_sub(Self::SIZE as u64)
  }

  /// Compares the set-wide fields of two headers and names the first one that differs.
  pub fn mismatched_field(&self, other: &ShardHeader) -> Option<&'static str> {
    if self.shard_count != other.shard_count {
      Some("shard_count")
    } else if self.original_size != other.original_size {
      Some("original_size")
    } else if self.original_crc != other.original_crc {
      Some("original_crc")
    } else if self.name_bytes() != other.name_bytes() {
      Some("original_name")
    } else {
      None
    }
  }
}

impl fmt::Display for ShardHeader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{{ shard_idx: {}, shard_count: {}, original_size: {}, original_crc: {:#010x}, shard_size: {}, shard_crc: {:#010x}, original_name: {:?} }}",
      self.shard_idx,
      self.shard_count,
      self.original_size,
      self.original_crc,
      self.shard_size,
      self.shard_crc,
      self.original_name()
    )
  }
}

/// Copies `name` into a zero-padded name field. Names that would not leave room for the
/// terminator are rejected rather than truncated.
pub fn encode_name(name: &[u8]) -> Result<[u8; NAME_FIELD_LEN]> {
  if name.is_empty() {
    return Err(Error::InvalidName("empty name".into()));
  }
  if name.contains(&0) {
    return Err(Error::InvalidName("name contains a null byte".into()));
  }
  if name.len() > MAX_NAME_LEN {
    return Err(Error::NameTooLong {
      len: name.len(),
      max: MAX_NAME_LEN,
    });
  }

  let mut field = [0u8; NAME_FIELD_LEN];
  field[..name.len()].copy_from_slice(name);
  Ok(field)
}
