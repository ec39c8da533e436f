//! Word counting over corpora.
//!
//! A corpus is reduced to a word → occurrence-count map using the byte-level
//! splitter. Files above a size threshold are ingested in parallel: the byte
//! range is cut into one chunk per worker, each worker counts words in the
//! lines starting inside its chunk into a local map, and the local maps are
//! merged by summing. Chunk boundaries fall inside lines; a worker starts
//! reading mid-line at its chunk start and reads one line past its chunk end,
//! so words straddling a boundary are counted approximately. The resulting
//! small miscount is accepted and covered by tests.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::debug;

use bytepair_core::split::split_by_words;
use bytepair_core::{Result, TokenizerError};

/// Word bytes → occurrence count.
pub type WordVocab = AHashMap<Vec<u8>, u64>;

/// Files at or below this size are always ingested on one thread.
const SINGLE_THREAD_FILE_SIZE: u64 = 16 * 1024;

/// Count the words of an in-memory text into `vocab`.
pub fn count_words_in_text(text: &[u8], vocab: &mut WordVocab) {
    for word in split_by_words(text) {
        if word.is_empty() {
            continue;
        }
        *vocab.entry(word.to_vec()).or_insert(0) += 1;
    }
}

/// Count the words of `path` into `vocab`.
///
/// `symbols_count` limits ingestion to the first N bytes (0 means the whole
/// file). The limit is checked after each completed line, so the final line
/// may extend past it.
pub fn count_words_in_file(
    path: &Path,
    symbols_count: u64,
    max_worker: usize,
    vocab: &mut WordVocab,
) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|err| TokenizerError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let mut file_size = metadata.len();
    if symbols_count > 0 {
        file_size = file_size.min(symbols_count);
    }

    if max_worker == 1 || file_size <= SINGLE_THREAD_FILE_SIZE {
        let counted = scan_range(path, 0, file_size)?;
        merge_vocabs(vocab, counted);
        return Ok(());
    }

    let chunk_size = (file_size / max_worker as u64).max(1);
    let ranges: Vec<(u64, u64)> = (0..max_worker as u64)
        .map(|worker| {
            (
                worker * chunk_size,
                file_size.min((worker + 1) * chunk_size),
            )
        })
        .filter(|(begin, end)| begin < end)
        .collect();
    debug!(workers = ranges.len(), file_size, "parallel corpus ingestion");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_worker)
        .build()
        .map_err(|err| TokenizerError::Training(format!("failed to build worker pool: {err}")))?;

    let counted = pool.install(|| {
        ranges
            .into_par_iter()
            .map(|(begin, end)| scan_range(path, begin, end))
            .try_reduce(WordVocab::new, |mut merged, counted| {
                merge_vocabs(&mut merged, counted);
                Ok(merged)
            })
    })?;
    merge_vocabs(vocab, counted);
    Ok(())
}

/// Count the words of the lines in `[begin, end)` of `path`.
///
/// Reads from `begin` (which may be mid-line) and stops after the first
/// completed line at or past `end`.
fn scan_range(path: &Path, begin: u64, end: u64) -> Result<WordVocab> {
    let io_err = |err| TokenizerError::Io {
        path: path.to_path_buf(),
        err,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(begin)).map_err(io_err)?;

    let mut vocab = WordVocab::new();
    let mut position = begin;
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).map_err(io_err)?;
        if read == 0 {
            break;
        }
        position += read as u64;

        if line.last() == Some(&b'\n') {
            line.pop();
        }
        count_words_in_text(&line, &mut vocab);

        if position >= end {
            break;
        }
    }
    Ok(vocab)
}

fn merge_vocabs(into: &mut WordVocab, from: WordVocab) {
    if into.is_empty() {
        *into = from;
        return;
    }
    for (word, count) in from {
        *into.entry(word).or_insert(0) += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_count_words_in_text() {
        let mut vocab = WordVocab::new();
        count_words_in_text(b"Hello, world!", &mut vocab);

        assert_eq!(vocab.get(b"Hello".as_slice()), Some(&1));
        assert_eq!(vocab.get(b",".as_slice()), Some(&1));
        assert_eq!(vocab.get(b" world".as_slice()), Some(&1));
        assert_eq!(vocab.get(b"!".as_slice()), Some(&1));
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn test_counts_accumulate() {
        let mut vocab = WordVocab::new();
        count_words_in_text(b"one two two", &mut vocab);
        count_words_in_text(b"two", &mut vocab);

        assert_eq!(vocab.get(b"one".as_slice()), Some(&1));
        // A leading single space glues to the word, so the repeated word
        // shows up both bare and space-prefixed.
        assert_eq!(vocab.get(b" two".as_slice()), Some(&2));
        assert_eq!(vocab.get(b"two".as_slice()), Some(&1));
    }

    fn write_corpus(lines: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..lines {
            writeln!(file, "hello world number {i} over and over").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_single_threaded_file_ingestion() {
        let file = write_corpus(10);
        let mut vocab = WordVocab::new();
        count_words_in_file(file.path(), 0, 1, &mut vocab).unwrap();

        assert_eq!(vocab.get(b"hello".as_slice()), Some(&10));
        assert_eq!(vocab.get(b" world".as_slice()), Some(&10));
    }

    #[test]
    fn test_symbols_count_limits_ingestion() {
        let file = write_corpus(100);
        let mut limited = WordVocab::new();
        // One line is well over 16 bytes, so only the first line (checked
        // after completion) lands.
        count_words_in_file(file.path(), 16, 1, &mut limited).unwrap();
        assert_eq!(limited.get(b"hello".as_slice()), Some(&1));
    }

    #[test]
    fn test_parallel_ingestion_never_undercounts() {
        // Large enough to clear the single-thread threshold.
        let file = write_corpus(2000);

        let mut serial = WordVocab::new();
        count_words_in_file(file.path(), 0, 1, &mut serial).unwrap();
        let mut parallel = WordVocab::new();
        count_words_in_file(file.path(), 0, 4, &mut parallel).unwrap();

        // Boundary lines are fully read by the preceding worker and their
        // tails re-read by the next one, so parallel counts are a superset.
        for (word, &count) in &serial {
            let parallel_count = parallel.get(word).copied().unwrap_or(0);
            assert!(
                parallel_count >= count,
                "undercounted {:?}: {} < {}",
                String::from_utf8_lossy(word),
                parallel_count,
                count
            );
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut vocab = WordVocab::new();
        let result = count_words_in_file(Path::new("/nonexistent/corpus.txt"), 0, 1, &mut vocab);
        assert!(matches!(result, Err(TokenizerError::Io { .. })));
    }
}
