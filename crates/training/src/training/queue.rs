//! Priority queue over adjacent-pair frequencies with lazy invalidation.
//!
//! Candidates live in a flat vector; an index map guarantees one record per
//! pair, and an 8-ary max-heap orders candidate indices by the count they
//! carried when last pushed. The heap is never purged in place: bulk merges
//! leave behind duplicates and tombstones, and `pop` resolves both lazily by
//! comparing a candidate's heap-time count against its live count.

use ahash::{AHashMap, AHashSet};
use dary_heap::OctonaryHeap;
use std::collections::BTreeSet;

use bytepair_core::Pair;

/// A training-time word: its current token-id sequence, original bytes, and
/// corpus occurrence count.
#[derive(Debug, Clone)]
pub struct VocabEntry {
    /// Current token ids; shrinks as merges collapse pairs.
    pub ids: Vec<u32>,
    /// Word bytes.
    pub text: Vec<u8>,
    /// How many times this word appears in the corpus.
    pub count: u64,
}

/// A pair-frequency record.
#[derive(Debug)]
struct Candidate {
    pair: Pair,
    /// Count carried by the newest heap entry for this candidate.
    queue_count: u64,
    /// Live aggregate count, maintained incrementally under merges.
    real_count: u64,
    /// Vocabulary entries holding at least one occurrence of the pair.
    /// Ordered so that candidate creation during a merge is deterministic.
    entries: BTreeSet<u32>,
}

/// Heap key: the candidate's count at push time plus its index.
///
/// Equal counts resolve to the earliest-created candidate, which makes the
/// pop order a pure function of the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    count: u64,
    candidate: u32,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.candidate.cmp(&self.candidate))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Merge queue: yields the currently most frequent adjacent pair and rewrites
/// the vocabulary in place when a pair is merged.
pub struct MergeQueue<'a> {
    vocab: &'a mut [VocabEntry],
    candidates: Vec<Candidate>,
    index: AHashMap<Pair, u32>,
    heap: OctonaryHeap<HeapEntry>,
}

impl<'a> MergeQueue<'a> {
    /// Build the queue over `vocab`.
    ///
    /// Sorts the vocabulary by count descending (ties by word bytes, so the
    /// whole training run is deterministic), then aggregates every adjacent
    /// pair of every entry.
    pub fn new(vocab: &'a mut [VocabEntry], capacity: usize) -> Self {
        vocab.sort_by(|first, second| {
            second
                .count
                .cmp(&first.count)
                .then_with(|| first.text.cmp(&second.text))
        });

        let mut queue = Self {
            vocab,
            candidates: Vec::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
            heap: OctonaryHeap::with_capacity(capacity),
        };

        for vocab_index in 0..queue.vocab.len() {
            let entry = &queue.vocab[vocab_index];
            let count = entry.count;
            let pairs: Vec<Pair> = entry
                .ids
                .windows(2)
                .map(|window| (window[0], window[1]))
                .collect();
            for pair in pairs {
                queue.update_candidate(pair, count, vocab_index as u32);
            }
        }

        for candidate_index in 0..queue.candidates.len() {
            let entry = HeapEntry {
                count: queue.candidates[candidate_index].queue_count,
                candidate: candidate_index as u32,
            };
            queue.heap.push(entry);
        }
        queue
    }

    /// Pop the most frequent live pair.
    ///
    /// Tombstones (live count zero) are skipped; stale heap keys are
    /// refreshed to the live count and pushed back rather than returned.
    pub fn pop(&mut self) -> Option<Pair> {
        while let Some(entry) = self.heap.pop() {
            let candidate = &mut self.candidates[entry.candidate as usize];
            if candidate.real_count == 0 {
                continue;
            }
            if candidate.real_count == candidate.queue_count {
                return Some(candidate.pair);
            }
            candidate.queue_count = candidate.real_count;
            self.heap.push(HeapEntry {
                count: candidate.queue_count,
                candidate: entry.candidate,
            });
        }
        None
    }

    /// Apply the merge `pair → new_id` across every vocabulary entry that
    /// holds the pair, maintaining all neighboring pair counts incrementally.
    pub fn merge(&mut self, pair: Pair, new_id: u32) {
        let Some(&candidate_index) = self.index.get(&pair) else {
            return;
        };
        let affected = std::mem::take(&mut self.candidates[candidate_index as usize].entries);

        let mut touched: AHashSet<Pair> = AHashSet::new();
        for vocab_index in affected {
            let old_ids = std::mem::take(&mut self.vocab[vocab_index as usize].ids);
            let count = self.vocab[vocab_index as usize].count;

            let mut new_ids = Vec::with_capacity(old_ids.len());
            let mut i = 0;
            while i < old_ids.len() {
                if i + 1 < old_ids.len() && old_ids[i] == pair.0 && old_ids[i + 1] == pair.1 {
                    // `new_ids` is empty exactly when the match is at the
                    // start of the sequence and there is no left neighbor.
                    if let Some(&left) = new_ids.last() {
                        // The current left adjacency is (left, old_ids[i]);
                        // for a chain of matches `left` is the id minted by
                        // the previous match, whose pair was just added.
                        self.decrement_real_count((left, old_ids[i]), count);
                        let new_left = (left, new_id);
                        self.update_candidate(new_left, count, vocab_index);
                        touched.insert(new_left);
                    }
                    if i + 2 < old_ids.len() {
                        self.decrement_real_count((old_ids[i + 1], old_ids[i + 2]), count);
                        let new_right = (new_id, old_ids[i + 2]);
                        self.update_candidate(new_right, count, vocab_index);
                        touched.insert(new_right);
                    }
                    new_ids.push(new_id);
                    i += 2;
                } else {
                    new_ids.push(old_ids[i]);
                    i += 1;
                }
            }
            self.vocab[vocab_index as usize].ids = new_ids;
        }

        let merged = &mut self.candidates[candidate_index as usize];
        merged.real_count = 0;
        merged.queue_count = 0;

        for new_pair in touched {
            let index = self.index[&new_pair];
            self.heap.push(HeapEntry {
                count: self.candidates[index as usize].queue_count,
                candidate: index,
            });
        }
    }

    /// Permanently retire a pair without merging it (used when the merged
    /// token would exceed the artifact's string length cap).
    pub fn discard(&mut self, pair: Pair) {
        if let Some(&candidate_index) = self.index.get(&pair) {
            let candidate = &mut self.candidates[candidate_index as usize];
            candidate.real_count = 0;
            candidate.queue_count = 0;
            candidate.entries.clear();
        }
    }

    /// Sort key of the vocabulary after queue construction: count descending.
    /// Exposed so the trainer can take the most frequent entries for the
    /// encode cache without re-sorting.
    pub fn into_vocab(self) -> &'a mut [VocabEntry] {
        self.vocab
    }

    fn update_candidate(&mut self, pair: Pair, count: u64, vocab_index: u32) {
        match self.index.get(&pair) {
            None => {
                let candidate_index = self.candidates.len() as u32;
                self.index.insert(pair, candidate_index);
                let mut entries = BTreeSet::new();
                entries.insert(vocab_index);
                self.candidates.push(Candidate {
                    pair,
                    queue_count: count,
                    real_count: count,
                    entries,
                });
            }
            Some(&candidate_index) => {
                let candidate = &mut self.candidates[candidate_index as usize];
                candidate.queue_count += count;
                candidate.real_count += count;
                candidate.entries.insert(vocab_index);
            }
        }
    }

    fn decrement_real_count(&mut self, pair: Pair, count: u64) {
        if let Some(&candidate_index) = self.index.get(&pair) {
            let candidate = &mut self.candidates[candidate_index as usize];
            candidate.real_count = candidate.real_count.saturating_sub(count);
        }
    }

    #[cfg(test)]
    fn real_count(&self, pair: Pair) -> u64 {
        self.index
            .get(&pair)
            .map(|&index| self.candidates[index as usize].real_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &[u8], count: u64) -> VocabEntry {
        VocabEntry {
            ids: text.iter().map(|&byte| byte as u32).collect(),
            text: text.to_vec(),
            count,
        }
    }

    #[test]
    fn test_initial_counts_aggregate_across_entries() {
        let mut vocab = vec![entry(b"ab", 3), entry(b"abc", 2), entry(b"b", 10)];
        let queue = MergeQueue::new(&mut vocab, 16);

        assert_eq!(queue.real_count((b'a' as u32, b'b' as u32)), 5);
        assert_eq!(queue.real_count((b'b' as u32, b'c' as u32)), 2);
    }

    #[test]
    fn test_pop_returns_most_frequent_pair() {
        let mut vocab = vec![entry(b"ab", 3), entry(b"cd", 7)];
        let mut queue = MergeQueue::new(&mut vocab, 16);

        assert_eq!(queue.pop(), Some((b'c' as u32, b'd' as u32)));
    }

    #[test]
    fn test_merge_rewrites_entries_and_counts() {
        // "abab" x2: merging (a, b) -> X leaves "XX".
        let mut vocab = vec![entry(b"abab", 2)];
        let mut queue = MergeQueue::new(&mut vocab, 16);

        let a = b'a' as u32;
        let b = b'b' as u32;
        let x = 256;

        assert_eq!(queue.pop(), Some((a, b)));
        queue.merge((a, b), x);

        // The chained merge must cancel the transient (X, a) pair and leave
        // exactly one (X, X) adjacency; (b, a) is decremented only once.
        assert_eq!(queue.real_count((a, b)), 0);
        assert_eq!(queue.real_count((b, a)), 0);
        assert_eq!(queue.real_count((x, a)), 0);
        assert_eq!(queue.real_count((x, x)), 2);

        let vocab = queue.into_vocab();
        assert_eq!(vocab[0].ids, vec![x, x]);

        // Only (X, X) is left to merge.
        let mut queue = MergeQueue::new(vocab, 16);
        assert_eq!(queue.pop(), Some((x, x)));
        queue.merge((x, x), 257);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_merge_updates_neighbor_pairs() {
        let mut vocab = vec![entry(b"xaby", 4)];
        let mut queue = MergeQueue::new(&mut vocab, 16);

        let (x, a, b, y) = (b'x' as u32, b'a' as u32, b'b' as u32, b'y' as u32);
        queue.merge((a, b), 256);

        assert_eq!(queue.real_count((x, a)), 0);
        assert_eq!(queue.real_count((b, y)), 0);
        assert_eq!(queue.real_count((x, 256)), 4);
        assert_eq!(queue.real_count((256, y)), 4);
        assert_eq!(queue.into_vocab()[0].ids, vec![x, 256, y]);
    }

    #[test]
    fn test_stale_entries_are_requeued_not_returned() {
        // (l, o) appears in both words; merging (h, e) in the more frequent
        // one does not change (l, o), but merging (l, l) does.
        let mut vocab = vec![entry(b"llo", 5), entry(b"lo", 3)];
        let mut queue = MergeQueue::new(&mut vocab, 16);

        let l = b'l' as u32;
        let o = b'o' as u32;
        assert_eq!(queue.real_count((l, o)), 8);

        assert_eq!(queue.pop(), Some((l, o)));
        queue.merge((l, o), 256);

        // (l, l) lost its right context in "llo" -> "l X"; its live count is
        // now that of the (l, X) pair instead.
        assert_eq!(queue.real_count((l, l)), 0);
        assert_eq!(queue.real_count((l, 256)), 5);
        assert_eq!(queue.pop(), Some((l, 256)));
    }

    #[test]
    fn test_tombstones_are_skipped() {
        let mut vocab = vec![entry(b"ab", 2), entry(b"cd", 1)];
        let mut queue = MergeQueue::new(&mut vocab, 16);

        queue.discard((b'a' as u32, b'b' as u32));
        assert_eq!(queue.pop(), Some((b'c' as u32, b'd' as u32)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_equal_counts_pop_deterministically() {
        for _ in 0..8 {
            let mut vocab = vec![entry(b"zy", 1), entry(b"ab", 1), entry(b"mn", 1)];
            let mut queue = MergeQueue::new(&mut vocab, 16);

            // Vocabulary sorts by (count desc, text asc): "ab", "mn", "zy",
            // and ties pop in candidate creation order.
            assert_eq!(queue.pop(), Some((b'a' as u32, b'b' as u32)));
            queue.merge((b'a' as u32, b'b' as u32), 256);
            assert_eq!(queue.pop(), Some((b'm' as u32, b'n' as u32)));
            queue.merge((b'm' as u32, b'n' as u32), 257);
            assert_eq!(queue.pop(), Some((b'z' as u32, b'y' as u32)));
        }
    }

    #[test]
    fn test_exhausted_queue_pops_none() {
        let mut vocab = vec![entry(b"a", 5)];
        let mut queue = MergeQueue::new(&mut vocab, 4);
        assert_eq!(queue.pop(), None);
    }
}
