//! nefdec CLI - Nikon NEF compressed raw decoding utility.
//!
//! Decodes the compressed strip of a NEF file given the offsets of its
//! linearization table and pixel data, and inspects the table itself.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use nef_decoder_rs::nef::huffman::{HuffmanTable, HuffmanVariant};
use nef_decoder_rs::nef::NefDecoder;
use nef_decoder_rs::{BitDepth, ByteOrder, NefParameters, RawImage, SplitAlignment};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Decoder for Nikon NEF compressed raw data
#[derive(Parser)]
#[command(name = "nefdec")]
#[command(author = "nef-decoder-rs contributors")]
#[command(version)]
#[command(about = "Decode and inspect Nikon NEF compressed raw data", long_about = None)]
#[command(after_help = "EXAMPLES:
    nefdec decode -i DSC_0001.NEF --meta-offset 0x3f2e --data-offset 0x1a2b00 \\
        --bits 12 -H 2868 --raw-width 4352 -o raw.pgm -f pgm
    nefdec info -i DSC_0001.NEF --meta-offset 0x3f2e --bits 14
    nefdec tables

Offsets are absolute file positions: --meta-offset points at the value of
maker note tag 0x96, --data-offset at the raw IFD's strip.")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a compressed NEF strip to raw samples or a PGM image
    #[command(visible_alias = "d")]
    Decode {
        /// Input file path
        #[arg(short, long, help = "Path to the NEF file")]
        input: PathBuf,

        /// Output file path for decoded samples
        #[arg(short, long, help = "Path for the output file")]
        output: PathBuf,

        /// Output format: raw (u16 little-endian) or pgm (16-bit binary PGM)
        #[arg(short, long, default_value = "raw", value_enum)]
        format: OutputFormat,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Offset of the compressed pixel data
        #[arg(long, value_parser = parse_offset)]
        data_offset: usize,

        /// Rows to decode
        #[arg(short = 'H', long)]
        height: usize,

        /// Coded samples per row
        #[arg(long)]
        raw_width: usize,

        /// Samples written per row (defaults to the raw width minus the left margin)
        #[arg(short, long)]
        width: Option<usize>,

        /// Coded columns skipped before the first written one
        #[arg(long, default_value = "0")]
        left_margin: usize,

        /// Keep the bit position when the Huffman table switches mid-image
        #[arg(long)]
        continuous_split: bool,
    },

    /// Display the linearization table
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the NEF file")]
        input: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// List the compiled-in Huffman tables
    #[command(visible_alias = "l")]
    Tables,
}

#[derive(clap::Args)]
struct LayoutArgs {
    /// Offset of the linearization table
    #[arg(short, long, value_parser = parse_offset)]
    meta_offset: usize,

    /// Sample precision: 12 or 14
    #[arg(short, long, default_value = "12")]
    bits: u8,

    /// Metadata is little-endian ("II" maker note)
    #[arg(long)]
    little_endian: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Raw u16 little-endian samples
    Raw,
    /// Portable GrayMap, 16-bit
    Pgm,
}

static LOGGER: SimpleLogger = SimpleLogger;

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };
            let args = record.args();

            match record.level() {
                log::Level::Error => eprintln!("Error ({}): {}", target, args),
                log::Level::Warn => eprintln!("Warning ({}): {}", target, args),
                log::Level::Info => eprintln!("Info ({}): {}", target, args),
                log::Level::Debug => eprintln!("Debug ({}): {}", target, args),
                log::Level::Trace => eprintln!("Trace ({}): {}", target, args),
            }
        }
    }

    fn flush(&self) {}
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            format,
            layout,
            data_offset,
            height,
            raw_width,
            width,
            left_margin,
            continuous_split,
        } => parameters(&layout, height, raw_width)
            .map(|parameters| {
                let width = width.unwrap_or(raw_width.saturating_sub(left_margin));
                let split_alignment = if continuous_split {
                    SplitAlignment::Continuous
                } else {
                    SplitAlignment::ByteAligned
                };
                parameters
                    .with_visible_window(left_margin, width)
                    .with_split_alignment(split_alignment)
            })
            .and_then(|parameters| {
                decode_image(&input, &output, &format, layout.meta_offset, data_offset, parameters)
            }),
        Commands::Info { input, layout } => show_info(&input, &layout),
        Commands::Tables => list_tables(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_offset(value: &str) -> Result<usize, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", value, e))
}

fn parameters(
    layout: &LayoutArgs,
    height: usize,
    raw_width: usize,
) -> Result<NefParameters, Box<dyn std::error::Error>> {
    let bit_depth = BitDepth::from_bits(layout.bits)?;
    let byte_order = if layout.little_endian {
        ByteOrder::LittleEndian
    } else {
        ByteOrder::BigEndian
    };
    Ok(NefParameters::new(bit_depth, height, raw_width)?.with_byte_order(byte_order))
}

fn decode_image(
    input: &PathBuf,
    output: &PathBuf,
    format: &OutputFormat,
    meta_offset: usize,
    data_offset: usize,
    parameters: NefParameters,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    let mut decoder = NefDecoder::new(&data, parameters)?;
    let image = decoder.decode(meta_offset, data_offset)?;

    match format {
        OutputFormat::Raw => {
            let bytes: Vec<u8> = image.data.iter().flat_map(|v| v.to_le_bytes()).collect();
            fs::write(output, bytes)?;
        }
        OutputFormat::Pgm => {
            write_pgm(output, &image)?;
        }
    }

    println!(
        "✓ Decoded {}x{} image ({}-bit) to {:?}",
        image.width,
        image.height,
        parameters.bit_depth.bits(),
        output
    );
    Ok(())
}

fn show_info(input: &PathBuf, layout: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let parameters = parameters(layout, 1, 1)?;
    let mut decoder = NefDecoder::new(&data, parameters)?;
    let header = decoder.read_header(layout.meta_offset)?;

    let variant = header.huffman_variant(parameters.bit_depth);
    let seeds = header.vertical_predictors;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();
    println!("Linearization table at {:#x}:", layout.meta_offset);
    println!(
        "  Version:     {:#04x} {:#04x}",
        header.version[0], header.version[1]
    );
    println!("  Kind:        {}", header.kind.name());
    println!(
        "  Predictors:  even [{}, {}], odd [{}, {}]",
        seeds[0][0], seeds[0][1], seeds[1][0], seeds[1][1]
    );
    println!("  Samples:     {}", header.curve_size);
    if header.step > 0 {
        println!("  Step:        {}", header.step);
    }
    println!("  Curve:       {} entries", header.curve.len());
    println!("  Table:       {}", variant.name());
    if header.split_row > 0 {
        let after = variant.after_split().map_or("none", |v| v.name());
        println!("  Split row:   {} (then {})", header.split_row, after);
    }
    Ok(())
}

fn list_tables() -> Result<(), Box<dyn std::error::Error>> {
    println!("Compiled-in Huffman tables:");
    println!();
    for variant in HuffmanVariant::ALL {
        let table = HuffmanTable::from_variant(variant)?;
        println!(
            "  {:>2}  {:<26} max code length {:>2}, {:>2} codes",
            variant as u8,
            variant.name(),
            table.max_code_length(),
            table.code_count()
        );
    }
    println!();
    Ok(())
}

fn write_pgm(path: &PathBuf, image: &RawImage) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = fs::File::create(path)?;
    write!(file, "P5\n{} {}\n65535\n", image.width, image.height)?;
    let bytes: Vec<u8> = image.data.iter().flat_map(|v| v.to_be_bytes()).collect();
    file.write_all(&bytes)?;
    Ok(())
}
