use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;

use ngram_lm::{BasicWordIndex, ContextToDataMapTrie, ModelBuilder};

#[derive(Parser, Debug)]
struct Args {
    #[clap(long)]
    arpa_path: PathBuf,
    #[clap(default_value = "this is a test sentence")]
    sentence: String,
    #[clap(long, default_value_t = 5)]
    order: usize,
}

fn main() -> anyhow::Result<()> {
    let Args { arpa_path, sentence, order } = Args::parse();

    let reader = BufReader::new(File::open(&arpa_path)?);
    let (model, _report) = ModelBuilder::<BasicWordIndex, ContextToDataMapTrie>::new(order).build(reader)?;

    let words: Vec<&str> = sentence.split_ascii_whitespace().collect();
    let score = model.cumulative_log_prob(&words)?;
    eprintln!("cumulative log P(\"{}\") = {score}", words.join(" "));

    for window in words.windows(2) {
        let conditional = model.conditional_log_prob(window)?;
        eprintln!("  log P({} | {}) = {conditional}", window[1], window[0]);
    }

    Ok(())
}
