//! End-to-end tests: train, serialize, attach, encode, decode.

use std::io::Write;

use bytepair_tokenizer::{Tokenizer, TokenizerView};
use bytepair_training::{TokenizerTrainer, TrainerConfig};

fn train_on_text(text: &str, size: usize, cache_size: usize) -> Vec<u8> {
    let mut trainer = TokenizerTrainer::new(TrainerConfig {
        size,
        min_count: 1,
        max_worker: 1,
        cache_size,
    });
    trainer.train_on_text(text);
    trainer.build_bpe();
    trainer.save()
}

#[test]
fn first_token_of_hello_world_decodes_to_hello() {
    let buffer = train_on_text("Hello, world!", 266, 10);
    let tokenizer = Tokenizer::from_bytes(buffer).unwrap();

    let ids = tokenizer.encode("Hello, world!").unwrap();
    assert!(!ids.is_empty());
    assert_eq!(tokenizer.decode_token(ids[0]).unwrap(), b"Hello");
}

#[test]
fn corpus_roundtrip_covers_whitespace_edges() {
    let mut corpus = tempfile::NamedTempFile::new().unwrap();
    for _ in 0..50 {
        writeln!(corpus, "Hello, world!").unwrap();
        writeln!(corpus, "So long, and thanks for all the fish.").unwrap();
    }
    corpus.flush().unwrap();

    let mut trainer = TokenizerTrainer::new(TrainerConfig {
        size: 16384,
        min_count: 1,
        max_worker: 1,
        cache_size: 10,
    });
    trainer.train_on_corpus(corpus.path(), 0).unwrap();
    trainer.build_bpe();

    let buffer = trainer.save();
    let tokenizer = Tokenizer::from_bytes(buffer).unwrap();

    for text in [
        "",
        " ",
        "  ",
        "Hello, world!",
        " Hello, world!",
        "  Hello, world!",
        "   Hello, world!",
        "Hello, world! ",
        "Hello, world!  ",
        "Hello, world!   ",
    ] {
        let ids = tokenizer.encode(text).unwrap();
        assert_eq!(tokenizer.decode(&ids).unwrap(), text, "failed for {text:?}");
    }
}

#[test]
fn roundtrip_holds_for_unseen_text() {
    let buffer = train_on_text("Hello, world!", 266, 10);
    let view = TokenizerView::attach(&buffer).unwrap();

    // Words never seen in training fall back to byte tokens and still
    // decode exactly.
    for text in [
        "Goodbye, moon?",
        "tabs\tnewlines\nand returns\r",
        "unicode: naïve café 日本語",
    ] {
        let ids = view.encode(text).unwrap();
        assert_eq!(view.decode(&ids).unwrap(), text, "failed for {text:?}");
    }

    // The tokenizer is byte-level: invalid UTF-8 encodes and round-trips
    // through the raw-bytes surface.
    for bytes in [
        &[0xFF][..],
        &[0xED, 0xA0, 0x80][..],
        &[0xF0, 0x28, b' ', 0x8C, 0xBC][..],
    ] {
        let ids = view.encode_bytes(bytes).unwrap();
        assert_eq!(
            view.decode_bytes(&ids).unwrap(),
            bytes,
            "failed for {bytes:?}"
        );
    }
}

#[test]
fn attached_artifact_reproduces_trainer_lookups() {
    let mut trainer = TokenizerTrainer::new(TrainerConfig {
        size: 300,
        min_count: 1,
        max_worker: 1,
        cache_size: 10,
    });
    trainer.train_on_text("the cat sat on the mat, the cat sat.");
    trainer.build_bpe();

    let buffer = trainer.save();
    let view = TokenizerView::attach(&buffer).unwrap();

    assert_eq!(view.vocab_size(), trainer.id_to_seq().len());
    assert_eq!(view.merge_count(), trainer.merge_table().len());

    // Every merge recorded in memory resolves identically through the
    // mapped artifact, and every id decodes to the same byte sequence.
    for (&pair, &id) in trainer.merge_table() {
        assert_eq!(
            view.merge_id(pair).unwrap(),
            Some(id),
            "pair {pair:?} resolved differently"
        );
    }
    for (id, sequence) in trainer.id_to_seq().iter().enumerate() {
        assert_eq!(view.decode_token(id as u32).unwrap(), sequence.as_slice());
    }
}

#[test]
fn cached_and_uncached_encodings_agree() {
    let text = "Hello, world! Hello, world! Hello, world!";
    let with_cache = train_on_text(text, 280, 100);
    let without_cache = train_on_text(text, 280, 0);

    let cached = TokenizerView::attach(&with_cache).unwrap();
    let uncached = TokenizerView::attach(&without_cache).unwrap();
    assert!(cached.cache_size() > 0);
    assert_eq!(uncached.cache_size(), 0);

    let probe = "Hello, world!";
    assert_eq!(
        cached.encode(probe).unwrap(),
        uncached.encode(probe).unwrap()
    );
}

#[test]
fn parallel_and_serial_training_both_roundtrip() {
    let mut corpus = tempfile::NamedTempFile::new().unwrap();
    for i in 0..3000 {
        writeln!(corpus, "line {i} with some repeated words, repeated words!").unwrap();
    }
    corpus.flush().unwrap();

    for max_worker in [1, 4] {
        let mut trainer = TokenizerTrainer::new(TrainerConfig {
            size: 1000,
            min_count: 2,
            max_worker,
            cache_size: 50,
        });
        trainer.train_on_corpus(corpus.path(), 0).unwrap();
        trainer.build_bpe();

        let tokenizer = Tokenizer::from_bytes(trainer.save()).unwrap();
        let text = "repeated words, repeated words!";
        let ids = tokenizer.encode(text).unwrap();
        assert_eq!(tokenizer.decode(&ids).unwrap(), text);
    }
}
