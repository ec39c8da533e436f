//! Inspect command implementation.

use clap::Parser;

/// Inspect command arguments.
#[derive(Parser)]
pub struct InspectCommand {
    /// Path to the trained tokenizer model
    #[arg(short, long)]
    pub tokenizer: String,

    /// Dump the vocabulary as JSON (id -> token string) to this path
    #[arg(long)]
    pub vocab_json: Option<String>,
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;

use anyhow::Result as AnyhowResult;
use bytepair_tokenizer::Tokenizer;

pub fn run(cmd: InspectCommand) -> AnyhowResult<()> {
    let tokenizer = Tokenizer::load(&cmd.tokenizer)?;
    let view = tokenizer.view()?;

    println!("Model: {}", cmd.tokenizer);
    println!("  Artifact size: {} bytes", tokenizer.as_bytes().len());
    println!("  Vocabulary:    {} tokens", view.vocab_size());
    println!("  Merges:        {}", view.merge_count());
    println!("  Cached words:  {}", view.cache_size());

    if let Some(path) = &cmd.vocab_json {
        // Token bytes are not necessarily UTF-8; render lossily for display.
        // Keyed by id so tokens with identical lossy renderings stay apart.
        let vocab: BTreeMap<u32, String> = (0..view.vocab_size() as u32)
            .map(|id| {
                let token = view.decode_token(id)?;
                Ok((id, String::from_utf8_lossy(token).into_owned()))
            })
            .collect::<AnyhowResult<_>>()?;

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &vocab)?;
        println!("Wrote vocabulary JSON to {path}");
    }

    Ok(())
}
