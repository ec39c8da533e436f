//! Decode command implementation.

use clap::Parser;

/// Decode command arguments.
#[derive(Parser)]
pub struct DecodeCommand {
    /// Path to the trained tokenizer model
    #[arg(short, long)]
    pub tokenizer: String,

    /// Whitespace-separated token IDs ("-" reads stdin)
    #[arg(short, long)]
    pub input: String,
}

use anyhow::{Context, Result as AnyhowResult};
use bytepair_tokenizer::Tokenizer;

pub fn run(cmd: DecodeCommand) -> AnyhowResult<()> {
    let tokenizer = Tokenizer::load(&cmd.tokenizer)?;

    let input = if cmd.input == "-" {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        cmd.input
    };

    let ids: Vec<u32> = input
        .split_whitespace()
        .map(|token| token.parse::<u32>().with_context(|| format!("invalid token id {token:?}")))
        .collect::<AnyhowResult<_>>()?;

    println!("{}", tokenizer.decode(&ids)?);

    Ok(())
}
