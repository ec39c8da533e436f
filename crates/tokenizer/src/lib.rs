//! bytepair-tokenizer - Inference over a trained bytepair artifact
//!
//! [`Tokenizer`] owns the artifact bytes (typically loaded from a file);
//! [`TokenizerView`] attaches zero-copy to any borrowed buffer. Both encode
//! text to token ids and decode ids back to text by querying the mapped
//! string table, merge table, and word cache in place.

pub mod tokenizer;
pub use tokenizer::{Tokenizer, TokenizerView};

pub use bytepair_core::{Result, TokenizerError};
