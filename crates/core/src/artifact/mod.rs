//! Zero-copy mapped artifacts.
//!
//! Both artifacts attach to a borrowed byte buffer and are queried in place:
//! a [`StringTable`] of offset-indexed short strings and a [`MappedMap`] of
//! hash-bucketed key-value records. `attach` validates the header against the
//! buffer and reports the artifact's size so several artifacts can be
//! concatenated in one file and attached in sequence.

pub mod mapped_map;
pub mod string_table;

pub use mapped_map::{MapKey, MappedMap, Record};
pub use string_table::StringTable;

use crate::Pair;

/// Merge table artifact: adjacent pair of token ids to merged id.
pub type MergeTable<'a> = MappedMap<'a, Pair, u32>;

/// Encode cache artifact: word bytes to precomputed id sequence.
pub type EncodeCache<'a> = MappedMap<'a, &'a [u8], Vec<u32>>;
