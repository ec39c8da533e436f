//! bytepair-training - Corpus ingestion and BPE training
//!
//! Builds a byte-level BPE model from a corpus: words are counted (optionally
//! in parallel over byte ranges of a file), the merge loop collapses the most
//! frequent adjacent token pair until the target vocabulary size is reached,
//! and the result is serialized into the mapped artifact that
//! `bytepair-tokenizer` attaches at inference time.

pub mod training;
pub use training::trainer::{TokenizerTrainer, TrainerConfig};

pub use bytepair_core::{Result, TokenizerError};
