//! Loads decimal identifiers, one per line, into a bitset and reports how much
//! memory the bitset needed.

use anyhow::{bail, Context};
use clap::Parser;
use cow_bitset::{alloc_stats, bit_count_to_block_count, Bitset, BITS_PER_BLOCK, BLOCK_WORDS};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadids")]
#[command(about = "Load identifiers into a sparse bitset and print allocation statistics")]
/// Each input line, after trimming surrounding whitespace, must consist of
/// decimal digits only. A line such as `123abc` or `-5` is rejected rather
/// than read up to its first non-digit.
struct Args {
    /// File of identifiers, one per line (stdin if omitted)
    input: Option<PathBuf>,

    /// Largest accepted identifier
    #[arg(long, default_value_t = 999_999_999)]
    max_id: usize,

    /// Log block-level activity
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// The whole trimmed line as a decimal id, `None` on any stray character.
fn parse_id(line: &str) -> Option<usize> {
    let text = line.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn run(args: &Args) -> anyhow::Result<()> {
    let bit_count = args.max_id.checked_add(1).context("--max-id is too large")?;
    println!(
        "BlockWords = {}, IdsPerBlock = {}, IdCount = {}, BlockCount = {}",
        BLOCK_WORDS,
        BITS_PER_BLOCK,
        bit_count,
        bit_count_to_block_count(bit_count)
    );
    let mut bitset = Bitset::allocate(bit_count).context("allocating bitset")?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    info!("loading ids into bitset");
    let mut ids = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        let Some(id) = parse_id(&line) else {
            bail!("line {}: cannot parse {:?} as an id", line_no + 1, line.trim());
        };
        if id > args.max_id {
            bail!("line {}: id {} out of range", line_no + 1, id);
        }
        bitset.set(id).with_context(|| format!("setting id {}", id))?;
        ids += 1;
    }
    debug!(ids, blocks = bitset.block_count(), "finished loading");

    let stats = alloc_stats();
    println!(
        "{} ids ({} distinct): {} allocs, {:.2} MiB allocated",
        ids,
        bitset.population_count(),
        stats.allocs,
        stats.bytes as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
