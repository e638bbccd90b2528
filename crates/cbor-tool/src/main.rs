use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use cbor_object::codec::Reader;
use cbor_object::{
    default_registry, encode_value_with_options, from_json_str_with, to_json_string,
    DecodeOptions, Decoder, EncodeOptions, JsonOptions, Value,
};
use clap::{ArgAction, Parser, Subcommand};
use clap_verbosity_flag::WarnLevel;
use log::{debug, info};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<WarnLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CBOR to JSON, one line per top-level item
    ToJson {
        #[command(flatten)]
        input: CborInput,
    },
    /// Print CBOR in diagnostic notation, one line per top-level item
    Diag {
        #[command(flatten)]
        input: CborInput,
    },
    /// Convert a JSON document to CBOR, written to stdout
    FromJson {
        /// Input file, or "-" for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Sort map keys and use the shortest forms
        #[arg(long, action = ArgAction::SetTrue)]
        canonical: bool,
        /// Reject duplicate keys and top-level scalars
        #[arg(long, action = ArgAction::SetTrue)]
        strict: bool,
    },
}

#[derive(clap::Args)]
struct CborInput {
    /// Input file, or "-" for stdin
    #[arg(default_value = "-")]
    input: PathBuf,
    /// Accept maps that repeat a key (the last entry wins)
    #[arg(long, action = ArgAction::SetTrue)]
    allow_duplicate_keys: bool,
    /// Maximum nesting of arrays, maps and tags
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,
}

impl CborInput {
    fn options(&self) -> DecodeOptions {
        let mut options = DecodeOptions::new();
        if self.allow_duplicate_keys {
            options = options.allow_duplicate_keys();
        }
        if let Some(depth) = self.max_depth {
            options = options.with_max_depth(depth);
        }
        options
    }
}

fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .context("failed to read stdin")?;
        Ok(data)
    } else {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

/// Decodes every top-level item in `data`.
fn decode_sequence(data: &[u8], options: DecodeOptions) -> anyhow::Result<Vec<Value>> {
    let mut decoder = Decoder::with_registry(Reader::new(data), default_registry(), options);
    let mut items = Vec::new();
    while !decoder.is_at_end()? {
        let start = decoder.position();
        let item = decoder
            .read()
            .with_context(|| format!("invalid CBOR item at offset {}", start))?;
        debug!("decoded item {} ({} bytes)", items.len(), decoder.position() - start);
        items.push(item);
    }
    Ok(items)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.cmd {
        Commands::ToJson { input } => {
            let data = read_input(&input.input)?;
            let items = decode_sequence(&data, input.options())?;
            info!("converting {} items to JSON", items.len());
            for item in &items {
                writeln!(out, "{}", to_json_string(item)?)?;
            }
        }
        Commands::Diag { input } => {
            let data = read_input(&input.input)?;
            for item in decode_sequence(&data, input.options())? {
                writeln!(out, "{}", item)?;
            }
        }
        Commands::FromJson {
            input,
            canonical,
            strict,
        } => {
            let data = read_input(&input)?;
            let text = std::str::from_utf8(&data).context("input is not UTF-8")?;
            let text = text.strip_prefix('\u{feff}').unwrap_or(text);
            let json_options = if strict {
                JsonOptions::strict()
            } else {
                JsonOptions::new()
            };
            let value = from_json_str_with(text, json_options)?;
            let encode_options = if canonical {
                EncodeOptions::canonical()
            } else {
                EncodeOptions::new()
            };
            let bytes = encode_value_with_options(&value, encode_options)?;
            info!("wrote {} bytes of CBOR", bytes.len());
            out.write_all(&bytes)?;
        }
    }
    out.flush()?;
    Ok(())
}
