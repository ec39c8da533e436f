//! The inference-side tokenizer.

use std::path::Path;

use bytepair_core::split::split_by_words;
use bytepair_core::{EncodeCache, MergeTable, Pair, Result, StringTable, TokenizerError};

/// Zero-copy view over a serialized tokenizer artifact.
///
/// The artifact is the concatenation of three sections in fixed order: the
/// id → byte-sequence string table, the merge table, and the encode cache.
/// Attaching validates each section's header against the buffer; lookups then
/// read the buffer in place. Every slice handed out borrows from the buffer.
pub struct TokenizerView<'a> {
    id_to_seq: StringTable<'a>,
    merge_table: MergeTable<'a>,
    cache: EncodeCache<'a>,
}

impl<'a> TokenizerView<'a> {
    /// Attach to the artifact at the start of `data` without copying.
    pub fn attach(data: &'a [u8]) -> Result<Self> {
        let mut offset = 0;
        let (id_to_seq, consumed) = StringTable::attach(data)?;
        offset += consumed;
        let (merge_table, consumed) = MergeTable::attach(&data[offset..])?;
        offset += consumed;
        let (cache, _) = EncodeCache::attach(&data[offset..])?;

        Ok(Self {
            id_to_seq,
            merge_table,
            cache,
        })
    }

    /// Vocabulary size, counting the 256 byte tokens.
    pub fn vocab_size(&self) -> usize {
        self.id_to_seq.len()
    }

    /// Number of learned merges.
    pub fn merge_count(&self) -> usize {
        self.merge_table.len()
    }

    /// Number of precomputed words in the encode cache.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Look up the id an adjacent pair merges into, if that merge was
    /// learned.
    pub fn merge_id(&self, pair: Pair) -> Result<Option<u32>> {
        self.merge_table.get(&pair)
    }

    /// Encode raw bytes into token ids, word by word, in order.
    ///
    /// The tokenizer is byte-level, so any byte string encodes; text is not
    /// required to be UTF-8.
    pub fn encode_bytes(&self, text: &[u8]) -> Result<Vec<u32>> {
        let mut ids = Vec::with_capacity(text.len());
        for word in split_by_words(text) {
            match self.cache.get(word)? {
                Some(cached) => ids.extend_from_slice(&cached),
                None => self.encode_word(word, &mut ids)?,
            }
        }
        Ok(ids)
    }

    /// Encode `text` into token ids.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.encode_bytes(text.as_bytes())
    }

    /// Encode a single word by replaying merges: start from raw bytes and
    /// repeatedly apply the merge with the smallest resulting id (ties to the
    /// leftmost position). Smaller ids are older merges, so this reproduces
    /// the training order.
    fn encode_word(&self, word: &[u8], output: &mut Vec<u32>) -> Result<()> {
        let mut ids: Vec<u32> = word.iter().map(|&byte| byte as u32).collect();

        while ids.len() >= 2 {
            let mut best: Option<(u32, usize)> = None;
            for i in 1..ids.len() {
                if let Some(merged) = self.merge_id((ids[i - 1], ids[i]))? {
                    if best.map_or(true, |(best_id, _)| merged < best_id) {
                        best = Some((merged, i - 1));
                    }
                }
            }

            let Some((new_id, position)) = best else {
                break;
            };
            ids[position] = new_id;
            ids.remove(position + 1);
        }

        output.extend_from_slice(&ids);
        Ok(())
    }

    /// Decode ids back into text. An id outside the vocabulary is a caller
    /// bug and panics; the concatenated bytes not forming valid UTF-8 is an
    /// error (use [`decode_bytes`](Self::decode_bytes) for raw output).
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        Ok(String::from_utf8(self.decode_bytes(ids)?)?)
    }

    /// Decode ids into raw bytes. Panics on an id outside the vocabulary.
    pub fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(ids.len() * 2);
        for &id in ids {
            bytes.extend_from_slice(self.decode_token(id)?);
        }
        Ok(bytes)
    }

    /// Borrow the byte sequence a single id decodes to. Panics on an id
    /// outside the vocabulary.
    pub fn decode_token(&self, id: u32) -> Result<&'a [u8]> {
        self.id_to_seq.get(id)
    }
}

/// Tokenizer owning its artifact bytes.
///
/// Construction validates the artifact once; the per-call views it hands to
/// [`TokenizerView`] re-read only the three section headers.
pub struct Tokenizer {
    memory: Vec<u8>,
}

impl Tokenizer {
    /// Load an artifact file into memory and attach to it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let memory = std::fs::read(path).map_err(|err| TokenizerError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_bytes(memory)
    }

    /// Take ownership of artifact bytes and attach to them.
    pub fn from_bytes(memory: Vec<u8>) -> Result<Self> {
        TokenizerView::attach(&memory)?;
        Ok(Self { memory })
    }

    /// Borrowing view over the owned artifact.
    pub fn view(&self) -> Result<TokenizerView<'_>> {
        TokenizerView::attach(&self.memory)
    }

    /// The raw artifact bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }

    pub fn encode_bytes(&self, text: &[u8]) -> Result<Vec<u32>> {
        self.view()?.encode_bytes(text)
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.view()?.encode(text)
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.view()?.decode(ids)
    }

    pub fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>> {
        self.view()?.decode_bytes(ids)
    }

    pub fn decode_token(&self, id: u32) -> Result<&[u8]> {
        self.view()?.decode_token(id)
    }

    pub fn vocab_size(&self) -> Result<usize> {
        Ok(self.view()?.vocab_size())
    }
}
