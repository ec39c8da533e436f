//! bytepair-core - Core primitives for the bytepair BPE tokenizer
//!
//! This crate provides the pieces shared by training and inference:
//!
//! - Word splitting over raw bytes (`split`)
//! - Little-endian buffer framing (`buffer`)
//! - Zero-copy mapped artifacts: a short-string table and a hash-indexed
//!   key-value map, both attachable to an external byte buffer (`artifact`)
//!
//! The tokenizer is byte-level: text is treated as raw bytes everywhere, and
//! token ids below [`BYTE_TOKEN_COUNT`] map bijectively to single bytes.

pub mod error;
pub use error::{Result, TokenizerError};

pub mod buffer;
pub use buffer::{BufferReader, BufferWriter};

pub mod split;
pub use split::{split_by_words, split_prefix_body_suffix};

pub mod artifact;
pub use artifact::{EncodeCache, MappedMap, MergeTable, StringTable};

/// A pair of adjacent token ids.
pub type Pair = (u32, u32);

/// Number of reserved single-byte tokens; ids in `[0, 256)` decode to the
/// byte equal to the id.
pub const BYTE_TOKEN_COUNT: usize = 256;

/// Hard cap on the byte length of any token sequence in the artifact's
/// string table (1-byte length prefix).
pub const MAX_TOKEN_BYTES: usize = 255;
