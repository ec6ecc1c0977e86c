use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use memchr::memchr_iter;

use nlcount::block::DEFAULT_BLOCK_SIZE;
use nlcount::common::io::open_noatime;
use nlcount::common::{gnu_name, reset_sigpipe};
use nlcount::cpu::{self, CapabilityFlags};
use nlcount::{CountError, Engine, EngineConfig, Kernel};

#[derive(Parser)]
#[command(
    name = "nlcount",
    about = "Count newlines in FILE, optionally timing every counting kernel the CPU supports"
)]
struct Cli {
    /// Time every kernel this CPU can run
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Count with this kernel instead of the fastest available one
    #[arg(short = 'k', long = "kernel", value_name = "NAME")]
    kernel: Option<Kernel>,

    /// Bytes read per block
    #[arg(short = 'b', long = "block-size", value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Use the host memory page size as the block size
    #[arg(long = "page-size", conflicts_with = "block_size")]
    page_size: bool,

    /// Byte to count: a single character, \n, \t, \0 or 0xNN
    #[arg(short = 'd', long = "delimiter", value_name = "BYTE", default_value = "\\n", value_parser = parse_delimiter)]
    delimiter: u8,

    /// With --all, also time the whole-file memchr and byte-loop reference counters
    #[arg(long = "baselines", requires = "all")]
    baselines: bool,

    /// File to count
    file: PathBuf,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\n" => return Ok(b'\n'),
        "\\t" => return Ok(b'\t'),
        "\\r" => return Ok(b'\r'),
        "\\0" => return Ok(0),
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|e| format!("invalid byte '{}': {}", s, e));
    }
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(format!("delimiter must be a single byte, got '{}'", s)),
    }
}

/// "64-Bit|RELEASE" style description of this build.
fn build_mode() -> String {
    format!(
        "{}-Bit|{}",
        usize::BITS,
        if cfg!(debug_assertions) {
            "DEBUG"
        } else {
            "RELEASE"
        }
    )
}

fn print_timing(out: &mut impl Write, label: &str, elapsed: Duration, count: u64) -> io::Result<()> {
    writeln!(
        out,
        "{:<30} took {:03}ms to count {} lines.",
        label,
        elapsed.as_millis(),
        count
    )
}

/// Report each capability tier the CPU lacks.
fn print_missing(out: &mut impl Write, flags: CapabilityFlags) -> io::Result<()> {
    if !flags.has_hardware_popcount {
        writeln!(out, "CPU doesn't support POPCNT.")?;
    }
    if !flags.has_narrow_vector {
        writeln!(out, "CPU doesn't support SSE2.")?;
    }
    if !flags.has_wide_vector {
        writeln!(out, "CPU doesn't support AVX2.")?;
    }
    Ok(())
}

/// Reference counter: whole file in memory, memchr over it.
fn count_memchr(path: &Path, delimiter: u8) -> Result<u64, CountError> {
    let data = std::fs::read(path).map_err(|e| CountError::from_open(path, e))?;
    Ok(memchr_iter(delimiter, &data).count() as u64)
}

/// Reference counter: one buffered byte at a time.
fn count_byte_loop(path: &Path, delimiter: u8) -> Result<u64, CountError> {
    let file = open_noatime(path).map_err(|e| CountError::from_open(path, e))?;
    let mut reader = BufReader::new(file);
    let mut count = 0u64;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let n = buf.len();
        for &b in buf {
            count += (b == delimiter) as u64;
        }
        reader.consume(n);
    }
    Ok(count)
}

/// Count `path` with `engine`, naming the file in read errors.
/// Open errors already carry the path.
fn count_path(engine: &Engine, path: &Path) -> Result<u64> {
    match engine.count_path(path) {
        Err(e @ CountError::Io(_)) => Err(e).with_context(|| path.display().to_string()),
        other => Ok(other?),
    }
}

/// Time every admissible kernel, fastest tier first, then the references.
fn run_benchmarks(cli: &Cli, config: EngineConfig, out: &mut impl Write) -> Result<()> {
    let flags = cpu::probe();
    writeln!(out, "Running performance tests on {} mode.", build_mode())?;
    print_missing(out, flags)?;

    for kernel in cpu::admissible_kernels(flags) {
        let engine = match Engine::with_kernel(kernel, config) {
            Ok(engine) => engine,
            Err(e @ CountError::Configuration { .. }) => {
                log::warn!("skipping {}: {}", kernel, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let start = Instant::now();
        let count = count_path(&engine, &cli.file)?;
        print_timing(out, kernel.label(), start.elapsed(), count)?;
    }

    if cli.baselines {
        let start = Instant::now();
        let count = count_byte_loop(&cli.file, config.delimiter)?;
        print_timing(out, "buffered byte loop", start.elapsed(), count)?;

        let start = Instant::now();
        let count = count_memchr(&cli.file, config.delimiter)?;
        print_timing(out, "memchr whole file", start.elapsed(), count)?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = if cli.page_size {
        EngineConfig::page_sized()
    } else {
        EngineConfig::default().with_block_size(cli.block_size)
    }
    .with_delimiter(cli.delimiter);

    let mut out = BufWriter::new(io::stdout().lock());

    if cli.all {
        run_benchmarks(cli, config, &mut out)?;
    } else {
        let engine = match cli.kernel {
            Some(kernel) => Engine::with_kernel(kernel, config)?,
            None => Engine::new(config)?,
        };
        let count = count_path(&engine, &cli.file)?;
        writeln!(out, "{} {}", count, cli.file.display())?;
    }
    out.flush()?;
    Ok(())
}

fn main() {
    reset_sigpipe();
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{}: {:#}", gnu_name(env!("CARGO_BIN_NAME")), e);
        process::exit(1);
    }
}
