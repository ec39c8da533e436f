//! Train command implementation.

use clap::Parser;

/// Train command arguments.
#[derive(Parser)]
pub struct TrainCommand {
    /// Corpus files to train on
    #[arg(short, long, required = true, num_args = 1..)]
    pub corpus: Vec<String>,

    /// Output path for the trained model
    #[arg(short, long)]
    pub output: String,

    /// Target vocabulary size (including the 256 byte tokens)
    #[arg(short, long, default_value_t = 16384)]
    pub size: usize,

    /// Minimum word occurrence count to take part in training
    #[arg(long, default_value_t = 1)]
    pub min_count: u64,

    /// Maximum number of ingestion workers
    #[arg(long, default_value_t = 1)]
    pub max_worker: usize,

    /// Number of most frequent words to precompute into the encode cache
    #[arg(long, default_value_t = 0)]
    pub cache_size: usize,

    /// Only ingest the first N bytes of each corpus file (0 = whole file)
    #[arg(long, default_value_t = 0)]
    pub symbols_count: u64,
}

use anyhow::Result as AnyhowResult;
use bytepair_training::{TokenizerTrainer, TrainerConfig};

pub fn run(cmd: TrainCommand) -> AnyhowResult<()> {
    let config = TrainerConfig {
        size: cmd.size,
        min_count: cmd.min_count,
        max_worker: cmd.max_worker,
        cache_size: cmd.cache_size,
    };
    let mut trainer = TokenizerTrainer::new(config);

    for corpus in &cmd.corpus {
        println!("Ingesting {corpus}...");
        trainer.train_on_corpus(corpus, cmd.symbols_count)?;
    }

    trainer.build_bpe();

    let buffer = trainer.save();
    std::fs::write(&cmd.output, &buffer)?;

    println!(
        "Trained {} tokens ({} merges), wrote {} bytes to {}",
        trainer.id_to_seq().len(),
        trainer.merge_table().len(),
        buffer.len(),
        cmd.output
    );

    Ok(())
}
