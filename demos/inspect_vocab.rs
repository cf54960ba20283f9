use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;

use ngram_lm::{BasicWordIndex, ContextToDataMapTrie, ModelBuilder};

#[derive(Parser, Debug)]
struct Args {
    #[clap(long)]
    arpa_path: PathBuf,
    #[clap(long, default_value_t = 5)]
    order: usize,
}

fn main() -> anyhow::Result<()> {
    let Args { arpa_path, order } = Args::parse();

    let reader = BufReader::new(File::open(&arpa_path)?);
    let (model, report) = ModelBuilder::<BasicWordIndex, ContextToDataMapTrie>::new(order).build(reader)?;

    eprintln!(
        "Ingested {} model of order {}: {:?} m-grams declared, {:?} committed, {:?} lines skipped",
        arpa_path.display(),
        model.order(),
        report.declared_counts,
        report.inserted_counts,
        report.skipped_lines,
    );
    eprintln!("id of \"the\": {}", model.word_id("the"));
    eprintln!("id of an out-of-vocabulary token: {}", model.word_id("this-should-not-exist"));

    Ok(())
}
