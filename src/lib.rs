//! # Chainsaw
//!
//! `chainsaw` splits an arbitrary file into a numbered, self-describing set of
//! shards for easier transport, and later joins those shards back into a
//! byte-exact copy of the original.
//!
//! ## Key Features
//!
//! * **Self-describing shards**: Every shard starts with a fixed 288-byte header
//!   naming its position in the set, the original file, and both checksums.
//! * **Integrity**: CRC32 of every shard payload and of the whole file, verified
//!   again while joining.
//! * **Set validation**: Join distinguishes "not a shard", "wrong shard set" and
//!   "corrupted shard" before (or while) writing the output.
//! * **Bounded memory**: Split and join stream through a fixed-size buffer
//!   regardless of file size.
//!
//! Shards are named `<source>@<index>.<count>`, with a 1-based index.
//!
//! ## Example
//!
//! ```no_run
//! use chainsaw::{JoinOptions, SplitOptions};
//!
//! # fn main() -> chainsaw::Result<()> {
//! // Split into shards of at most 4 MB (header included)
//! let report = chainsaw::split("report.bin", &SplitOptions::with_max_shard_size(4_000_000))?;
//! assert_eq!(report.shards.len(), 3);
//!
//! // Order does not matter when joining
//! let mut shards = report.shards.clone();
//! shards.reverse();
//! let restored = chainsaw::join(&shards, &JoinOptions::new("restored"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! - **Host byte order**: Headers are written in native byte order and cannot be
//!   read on a machine of the opposite endianness.
//! - **No rollback**: A failed split or join leaves whatever it already wrote.

mod config;
mod error;
mod file;
mod header;
mod join;
mod split;
mod util;

// Re-exports for the flat public API
pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_SHARD_COUNT, JoinOptions, ShardLimit, SplitOptions, SyncMode};
pub use error::{Error, ErrorChain, ErrorKind, IoOp, Result};
pub use header::{MAX_NAME_LEN, NAME_FIELD_LEN, SHARD_MAGIC, ShardHeader};
pub use join::{ShardSet, inspect, join};
pub use split::{SplitReport, split};
pub use util::{parse_shard_suffix, shard_filename};
