use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use xxhash_rust::xxh3::Xxh3;

use zstdio_codecs::{compress_stream, register_zstdio, DEFAULT_LEVEL};
use zstdio_core::format::{DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_LOG_MAX};
use zstdio_core::{BoxedFile, FilterRegistry, PlainFile, StreamConfig, VirtualFile};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "zstdio",
    about = "Read zstd files as seekable decompressed files, and produce them",
    version
)]
struct Cli {
    /// Size of each of the stream's input/output buffers in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
    /// Largest decoder window accepted, as a power of two (10–31)
    #[arg(long, global = true, default_value_t = DEFAULT_WINDOW_LOG_MAX)]
    window_log_max: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a zstd frame (with content checksum)
    Compress {
        /// Source file to compress ("-" reads stdin)
        input: PathBuf,
        /// Destination .zst file
        output: PathBuf,
        /// Zstd compression level (1–22)
        #[arg(short, long, default_value_t = DEFAULT_LEVEL)]
        level: i32,
    },
    /// Copy a range of a file's content, decompressing it if it is zstd
    Cat {
        /// File to read; zstd files are decompressed transparently
        file: PathBuf,
        /// Logical offset to start reading at
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Number of bytes to copy (default: to the end)
        #[arg(long)]
        length: Option<u64>,
        /// Bytes requested per read call
        #[arg(long, default_value_t = 64 * 1024)]
        chunk_size: usize,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report how the file opens and digest its content
    Inspect {
        /// File to inspect
        file: PathBuf,
    },
    /// Benchmark reads at random logical offsets
    Bench {
        /// File to read
        file: PathBuf,
        /// Number of random reads
        #[arg(short, long, default_value_t = 100)]
        count: u64,
        /// Bytes per read
        #[arg(short, long, default_value_t = 4096)]
        length: usize,
        /// Fixed random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn open_filtered(path: &Path, config: StreamConfig) -> anyhow::Result<BoxedFile> {
    let plain = PlainFile::open(path).with_context(|| format!("opening {:?}", path))?;
    let mut registry = FilterRegistry::new();
    register_zstdio(&mut registry, config);
    let name = path.display().to_string();
    let file = registry
        .open(Box::new(plain), &name)
        .with_context(|| format!("applying file filters to {:?}", path))?;
    Ok(file)
}

/// Read from `file` into `buf` until it is full or the file ends.
fn read_full(file: &mut BoxedFile, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, level: i32) -> anyhow::Result<()> {
    let dst = BufWriter::new(
        File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
    );

    let t0 = Instant::now();
    let raw_size = if input.to_str() == Some("-") {
        compress_stream(io::stdin().lock(), dst, level)?
    } else {
        let src = BufReader::new(
            File::open(&input).with_context(|| format!("opening input file {:?}", input))?,
        );
        compress_stream(src, dst, level)?
    };
    let elapsed = t0.elapsed();

    let compressed_size = std::fs::metadata(&output)?.len();
    let ratio = raw_size as f64 / compressed_size.max(1) as f64;

    eprintln!("  level       : {}", level);
    eprintln!("  raw size    : {}", human_bytes(raw_size));
    eprintln!("  compressed  : {}", human_bytes(compressed_size));
    eprintln!("  ratio       : {:.2}x", ratio);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_cat(
    config: StreamConfig,
    file: PathBuf,
    offset: u64,
    length: Option<u64>,
    chunk_size: usize,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if chunk_size == 0 {
        anyhow::bail!("--chunk-size must be non-zero");
    }
    let mut src = open_filtered(&file, config)?;
    src.seek(SeekFrom::Start(offset))
        .with_context(|| format!("seeking to offset {}", offset))?;

    let mut dst: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output file {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut remaining = length.unwrap_or(u64::MAX);
    let mut buf = vec![0u8; chunk_size];
    let mut copied = 0u64;
    while remaining > 0 {
        let want = remaining.min(chunk_size as u64) as usize;
        let n = src
            .read(&mut buf[..want])
            .with_context(|| format!("reading {:?} at offset {}", file, offset + copied))?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
        copied += n as u64;
        remaining -= n as u64;
    }
    dst.flush()?;

    info!("copied {} bytes from offset {}", copied, offset);
    if let Some(len) = length {
        if copied < len {
            eprintln!("  note: file ended after {} of {} requested bytes", copied, len);
        }
    }
    Ok(())
}

fn run_inspect(config: StreamConfig, file: PathBuf) -> anyhow::Result<()> {
    let on_disk = std::fs::metadata(&file)
        .with_context(|| format!("reading metadata of {:?}", file))?
        .len();
    let mut src = open_filtered(&file, config)?;
    let filtered = !src.is_easily_seekable();
    let reported_size = src.size();

    let t0 = Instant::now();
    let mut hasher = Xxh3::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut logical = 0u64;
    loop {
        let n = read_full(&mut src, &mut buf)
            .with_context(|| format!("decoding {:?} at offset {}", file, logical))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        logical += n as u64;
    }
    let elapsed = t0.elapsed();

    println!("=== {:?} ===", file);
    println!();
    println!("  zstd filter    : {}", if filtered { "applied" } else { "not applied" });
    match reported_size {
        Some(size) => println!("  reported size  : {}", human_bytes(size)),
        None => println!("  reported size  : unknown"),
    }
    println!("  easily seekable: {}", !filtered);
    println!("  file on disk   : {}", human_bytes(on_disk));
    println!("  content size   : {}", human_bytes(logical));
    if filtered {
        println!("  ratio          : {:.2}x", logical as f64 / on_disk.max(1) as f64);
        println!("  window limit   : {}", human_bytes(config.max_window_size()));
    }
    println!("  xxh3-64        : {:016x}", hasher.digest());
    println!("  read time      : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_bench(
    config: StreamConfig,
    file: PathBuf,
    count: u64,
    length: usize,
    seed: u64,
) -> anyhow::Result<()> {
    if count == 0 || length == 0 {
        anyhow::bail!("--count and --length must be non-zero");
    }

    // One pass to learn the logical size; the filter cannot report it.
    let mut src = open_filtered(&file, config)?;
    let logical_size = match src.size() {
        Some(size) => size,
        None => io::copy(&mut src, &mut io::sink())?,
    };
    if logical_size == 0 {
        anyhow::bail!("file has no content");
    }

    // Simple LCG for reproducible offsets (no external dep)
    let offsets: Vec<u64> = {
        let mut rng = seed;
        (0..count)
            .map(|_| {
                rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (rng >> 33) % logical_size
            })
            .collect()
    };

    eprintln!(
        "benchmarking {} random {}-byte reads across {}...",
        count,
        length,
        human_bytes(logical_size)
    );

    let mut buf = vec![0u8; length];
    let mut total = 0u64;
    let mut backward = 0u64;
    let mut cursor = src.stream_position()?;
    let mut latencies_us: Vec<u64> = Vec::with_capacity(count as usize);

    let t0 = Instant::now();
    for &offset in &offsets {
        if offset < cursor {
            backward += 1;
        }
        let t = Instant::now();
        src.seek(SeekFrom::Start(offset))?;
        let n = read_full(&mut src, &mut buf)?;
        latencies_us.push(t.elapsed().as_micros() as u64);
        total += n as u64;
        cursor = offset + n as u64;
    }
    let elapsed = t0.elapsed();
    latencies_us.sort_unstable();

    let pick = |q: f64| latencies_us[((latencies_us.len() - 1) as f64 * q) as usize];

    println!();
    println!("=== Random Offset Read Benchmark ===");
    println!("  reads       : {}", count);
    println!("  backward    : {} (each restarts decoding)", backward);
    println!("  total read  : {}", human_bytes(total));
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    println!(
        "  throughput  : {}/s",
        human_bytes((total as f64 / elapsed.as_secs_f64().max(1e-9)) as u64)
    );
    println!("  latency:");
    println!("    min  : {} µs", pick(0.0));
    println!("    p50  : {} µs", pick(0.50));
    println!("    p95  : {} µs", pick(0.95));
    println!("    p99  : {} µs", pick(0.99));
    println!("    max  : {} µs", pick(1.0));

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = StreamConfig::default()
        .with_buffer_size(cli.buffer_size)
        .with_window_log_max(cli.window_log_max);
    config.validate()?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            level,
        } => run_compress(input, output, level),
        Commands::Cat {
            file,
            offset,
            length,
            chunk_size,
            output,
        } => run_cat(config, file, offset, length, chunk_size, output),
        Commands::Inspect { file } => run_inspect(config, file),
        Commands::Bench {
            file,
            count,
            length,
            seed,
        } => run_bench(config, file, count, length, seed),
    }
}
