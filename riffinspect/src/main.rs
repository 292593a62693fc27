use anyhow::Context;
use clap::Parser;
use riff::wave::Format;
use riff::{FileType, FourCC, Reader};
use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lists the chunks of a RIFF file.
#[derive(Parser, Debug)]
#[command(name = "riffinspect")]
#[command(version)]
struct Cli {
    /// File to inspect; reads stdin when omitted.
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Don't decode the format chunk of WAVE files.
    #[arg(long = "no-format", default_value_t = false)]
    no_format: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let input: Box<dyn Read> = match &cli.path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin()),
    };

    let reader = Reader::new(input).context("reading RIFF header")?;
    println!("file type: {}", reader.file_type());
    println!("size: {}", reader.size());

    let decode_format = reader.file_type() == FileType::WAVE && !cli.no_format;
    let mut format = None;
    for chunk in reader {
        let chunk = chunk.context("reading chunk")?;
        println!("{} ({} bytes)", chunk.id, chunk.data.len());

        if decode_format && chunk.id == FourCC::FMT {
            let f = Format::try_from(&chunk).context("decoding format chunk")?;
            print_format(&f);
            format = Some(f);
        } else if chunk.id == FourCC::DATA {
            if let Some(f) = &format {
                println!("  audio length: {:?}", f.audio_length(chunk.data.len() as u64));
            }
        }
    }

    Ok(())
}

fn print_format(format: &Format) {
    println!(
        "  {}Hz, {}-bit, {}-channel, {} audio",
        format.sample_rate, format.bits_per_sample, format.channels, format.audio_format
    );
    if let Err(err) = format.validate() {
        tracing::warn!(%err, "format chunk describes unplayable audio");
    }
    println!(
        "  block align: {}, bytes per second: {}",
        format.block_align(),
        format.bytes_per_second()
    );
}

