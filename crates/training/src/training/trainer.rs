//! BPE trainer: initial id assignment, the merge loop, cache construction,
//! and artifact serialization.

use std::path::Path;

use ahash::AHashMap;
use tracing::{debug, info};

use bytepair_core::{
    EncodeCache, MergeTable, Pair, Result, StringTable, BYTE_TOKEN_COUNT, MAX_TOKEN_BYTES,
};

use super::corpus::{count_words_in_file, count_words_in_text, WordVocab};
use super::queue::{MergeQueue, VocabEntry};

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Target vocabulary size, including the 256 byte tokens. Must be ≥ 256.
    pub size: usize,
    /// Minimum number of times a word must appear in the corpus to take part
    /// in the merge loop.
    pub min_count: u64,
    /// Maximum number of ingestion workers. Must be ≥ 1.
    pub max_worker: usize,
    /// Number of most frequent words whose encodings are precomputed into the
    /// artifact's cache; 0 disables the cache.
    pub cache_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            size: BYTE_TOKEN_COUNT,
            min_count: 1,
            max_worker: 1,
            cache_size: 0,
        }
    }
}

/// Byte-level BPE trainer.
///
/// Ingest with [`train_on_corpus`](Self::train_on_corpus) /
/// [`train_on_text`](Self::train_on_text) (repeatable; counts accumulate),
/// then call [`build_bpe`](Self::build_bpe) once and serialize with
/// [`save`](Self::save).
pub struct TokenizerTrainer {
    config: TrainerConfig,
    word_vocab: WordVocab,
    vocab: Vec<VocabEntry>,
    merge_table: AHashMap<Pair, u32>,
    id_to_seq: Vec<Vec<u8>>,
    cache: AHashMap<Vec<u8>, Vec<u32>>,
}

impl TokenizerTrainer {
    /// Panics if `size` is below the 256 byte tokens or `max_worker` is zero;
    /// those are caller bugs, not recoverable conditions.
    pub fn new(config: TrainerConfig) -> Self {
        assert!(
            config.size >= BYTE_TOKEN_COUNT,
            "vocabulary size {} is below the {BYTE_TOKEN_COUNT} byte tokens",
            config.size
        );
        assert!(config.max_worker >= 1, "max_worker must be at least 1");

        Self {
            config,
            word_vocab: WordVocab::new(),
            vocab: Vec::new(),
            merge_table: AHashMap::new(),
            id_to_seq: Vec::new(),
            cache: AHashMap::new(),
        }
    }

    /// Ingest up to `symbols_count` bytes of `path` (0 means the whole file).
    pub fn train_on_corpus(&mut self, path: impl AsRef<Path>, symbols_count: u64) -> Result<()> {
        count_words_in_file(
            path.as_ref(),
            symbols_count,
            self.config.max_worker,
            &mut self.word_vocab,
        )
    }

    /// Ingest an in-memory text.
    pub fn train_on_text(&mut self, text: &str) {
        count_words_in_text(text.as_bytes(), &mut self.word_vocab);
    }

    /// Run the merge loop and build the encode cache. Must be called exactly
    /// once, after all ingestion; a second call is a caller bug and panics.
    pub fn build_bpe(&mut self) {
        assert!(
            self.id_to_seq.is_empty() && self.merge_table.is_empty(),
            "build_bpe may only be called once"
        );

        self.init_id_to_seq();
        self.create_vocab_from_word_vocab();
        info!(
            words = self.vocab.len(),
            target_size = self.config.size,
            "training bpe"
        );
        self.train_bpe();
        info!(
            vocab_size = self.id_to_seq.len(),
            merges = self.merge_table.len(),
            "bpe training finished"
        );
        self.build_cache();

        // Training-only state is dead weight from here on.
        self.word_vocab = WordVocab::new();
        self.vocab = Vec::new();
    }

    /// Learned merge table: adjacent pair → merged id.
    pub fn merge_table(&self) -> &AHashMap<Pair, u32> {
        &self.merge_table
    }

    /// Byte sequence every token id decodes to, indexed by id.
    pub fn id_to_seq(&self) -> &[Vec<u8>] {
        &self.id_to_seq
    }

    /// Serialize the trained model into its binary artifact: string table,
    /// merge table, then cache, concatenated.
    pub fn save(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        StringTable::write_to_buffer(&self.id_to_seq, &mut buffer);
        MergeTable::write_to_buffer(
            self.merge_table.iter().map(|(&pair, id)| (pair, id)),
            &mut buffer,
        );
        EncodeCache::write_to_buffer(
            self.cache.iter().map(|(word, ids)| (word.as_slice(), ids)),
            &mut buffer,
        );
        buffer
    }

    fn init_id_to_seq(&mut self) {
        self.id_to_seq.reserve(self.config.size);
        for byte in 0..BYTE_TOKEN_COUNT {
            self.id_to_seq.push(vec![byte as u8]);
        }
    }

    fn create_vocab_from_word_vocab(&mut self) {
        self.vocab.reserve(self.word_vocab.len());
        for (word, &count) in &self.word_vocab {
            if count < self.config.min_count {
                continue;
            }
            self.vocab.push(VocabEntry {
                ids: word.iter().map(|&byte| byte as u32).collect(),
                text: word.clone(),
                count,
            });
        }
    }

    fn train_bpe(&mut self) {
        let mut queue = MergeQueue::new(&mut self.vocab, self.config.size);

        while self.id_to_seq.len() < self.config.size {
            let Some(pair) = queue.pop() else {
                break;
            };

            let merged_len = self.id_to_seq[pair.0 as usize].len()
                + self.id_to_seq[pair.1 as usize].len();
            if merged_len > MAX_TOKEN_BYTES {
                // The string table frames entries with a 1-byte length, so a
                // longer token can never be serialized.
                debug!(?pair, merged_len, "discarding over-long merge");
                queue.discard(pair);
                continue;
            }

            let new_id = self.id_to_seq.len() as u32;
            self.merge_table.insert(pair, new_id);
            let mut sequence = self.id_to_seq[pair.0 as usize].clone();
            sequence.extend_from_slice(&self.id_to_seq[pair.1 as usize]);
            self.id_to_seq.push(sequence);

            queue.merge(pair, new_id);
        }
    }

    fn build_cache(&mut self) {
        if self.config.cache_size == 0 {
            return;
        }

        // The queue left the vocabulary sorted by count descending.
        let cache_size = self.config.cache_size.min(self.vocab.len());
        info!(entries = cache_size, "building encode cache");
        for entry in &self.vocab[..cache_size] {
            self.cache.insert(entry.text.clone(), entry.ids.clone());
        }
    }
}
